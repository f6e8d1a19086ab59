#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub connection_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            connection_timeout_ms: 10_000,
            heartbeat_interval_ms: 30_000,
            auto_reconnect: true,
            max_reconnect_attempts: 10,
            reconnect_base_delay_ms: 1_000,
            max_reconnect_delay_ms: 30_000,
        }
    }
}
