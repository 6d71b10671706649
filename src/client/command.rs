//! Terminal client command parsing

use crate::constants::DEFAULT_GIFT;
use crate::core::message::{ChatMessage, Event, GiftMessage};

/// What a line typed at the terminal asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Event),
    Quit,
    Invalid(String),
}

/// Parse one input line for `user` sitting in `room`
pub fn parse_command(line: &str, user: &str, room: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(Event::Chat(ChatMessage::new(room, user, line)));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "quit" => Command::Quit,
        "list" => Command::Send(Event::list_request()),
        "join" => Command::Send(Event::Join {
            room: arg.to_string(),
        }),
        "gift" => {
            let count = if arg.is_empty() { Ok(1) } else { arg.parse::<u32>() };
            match count {
                Ok(count) => Command::Send(Event::Gift(GiftMessage::new(room, user, DEFAULT_GIFT, count))),
                Err(_) => Command::Invalid(format!("gift count must be a whole number: {}", arg)),
            }
        }
        "live" => Command::Send(Event::BroadcastCreate {
            host: user.to_string(),
            title: arg.to_string(),
        }),
        "like" | "end" if arg.is_empty() => Command::Invalid(format!("usage: /{} <broadcast id>", name)),
        "like" => Command::Send(Event::BroadcastLike { id: arg.to_string() }),
        "end" => Command::Send(Event::BroadcastEnd {
            id: arg.to_string(),
            user: user.to_string(),
        }),
        other => Command::Invalid(format!("unknown command /{}", other)),
    }
}

/// Events the terminal client sends in reaction to a server event
pub fn follow_up(event: &Event) -> Vec<Event> {
    match event {
        // Hosts watch their own broadcast
        Event::BroadcastCreated { room, .. } => vec![
            Event::Join { room: room.clone() },
            Event::list_request(),
        ],
        _ => Vec::new(),
    }
}
