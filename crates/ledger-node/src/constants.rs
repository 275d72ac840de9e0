pub(crate) const DEFAULT_HTTP_PORT: u16 = 3001;
pub(crate) const DEFAULT_P2P_PORT: u16 = 6001;
pub(crate) const COMMAND_CHANNEL_CAPACITY: usize = 256;
pub const PEER_QUEUE_CAPACITY: usize = 64;
