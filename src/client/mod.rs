//! Client side of the wire protocol

pub mod command;
pub mod driver;

pub use command::{follow_up, parse_command, Command};
pub use driver::{ClientDriver, ClientEvent, ConnectionState, Inbound};
