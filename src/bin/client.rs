//! Terminal chat client for a Live Socks hub
//!
//! Usage: live_socks_client [url] [user]

use log::error;
use tokio::io::{AsyncBufReadExt, BufReader};

use live_socks::client::{follow_up, parse_command, ClientDriver, ClientEvent, Command};
use live_socks::config::ClientConfig;
use live_socks::core::message::Event;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .or_else(|| std::env::var("LIVE_SOCKS_URL").ok())
        .unwrap_or_else(ClientConfig::default_url);
    let user = args
        .next()
        .or_else(|| std::env::var("LIVE_SOCKS_USER").ok())
        .unwrap_or_else(|| "guest".to_string());

    let config = match ClientConfig::new(&url, user) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    println!("Connecting to {} as {}", config.url, config.user);
    println!("Commands: /join <room>, /gift <count>, /live <title>, /like <id>, /end <id>, /list, /quit");

    let (driver, mut inbound) = ClientDriver::new(config);
    if let Err(e) = driver.send(Event::list_request()) {
        error!("Failed to queue directory request: {}", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    match parse_command(&line, &driver.config().user, &driver.current_room()) {
                        Command::Quit => break,
                        Command::Invalid(reason) => println!("! {}", reason),
                        Command::Send(event) => {
                            if let Err(e) = driver.send(event) {
                                println!("! {}", e);
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },

            event = inbound.recv() => match event {
                Some(event) => {
                    print_event(&event, &driver.current_room());
                    if let ClientEvent::Server(server_event) = &event {
                        for reply in follow_up(server_event) {
                            if let Err(e) = driver.send(reply) {
                                println!("! {}", e);
                            }
                        }
                    }
                }
                None => break,
            },
        }
    }
}

fn print_event(event: &ClientEvent, room: &str) {
    match event {
        ClientEvent::Server(Event::Chat(chat)) if chat.room == room => {
            println!("[{}] {}: {}", chat.room, chat.user, chat.message);
        }
        ClientEvent::Server(Event::Gift(gift)) if gift.room == room => {
            println!("[{}] {} sent {} x{}", gift.room, gift.user, gift.gift, gift.count);
        }
        ClientEvent::Server(Event::System { message, .. }) => println!("* {}", message),
        ClientEvent::Server(Event::BroadcastCreated { id, room }) => {
            println!("* Broadcast {} is live, joining {}", id, room);
        }
        ClientEvent::Server(Event::BroadcastList { items, .. }) => {
            println!("* {} live broadcast(s)", items.len());
            for (rank, item) in items.iter().enumerate() {
                println!(
                    "  {}. {} by {} [{}] viewers={} likes={} gifts={} score={:.1}",
                    rank + 1,
                    item.title,
                    item.host,
                    item.id,
                    item.viewers,
                    item.likes,
                    item.gifts,
                    item.score
                );
            }
        }
        ClientEvent::Server(_) => {}
        ClientEvent::Unreadable(text) => println!("? {}", text),
        ClientEvent::Disconnected { reason } => {
            println!("* Disconnected ({}); send anything to reconnect", reason);
        }
    }
}
