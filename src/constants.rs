// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8765;
pub const WS_PATH: &str = "ws";

/// Room every new connection is placed in
pub const LOBBY_ROOM: &str = "lobby";
/// Prefix of the room bound to a live broadcast
pub const BROADCAST_ROOM_PREFIX: &str = "bcast:";

// Liveness and throttling reference values
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_CHAT_COOLDOWN_MS: u64 = 2000;

// Persistence queue and in-memory history
pub const DEFAULT_PERSIST_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_HISTORY_SIZE: usize = 100;

// Identity and payload bounds (in characters)
pub const UNKNOWN_USER: &str = "unknown";
pub const MAX_USER_LEN: usize = 40;
pub const MAX_MESSAGE_LEN: usize = 500;
pub const MAX_GIFT_LEN: usize = 20;
pub const MAX_TITLE_LEN: usize = 80;
pub const DEFAULT_GIFT: &str = "🎁";
pub const DEFAULT_TITLE: &str = "Untitled";
