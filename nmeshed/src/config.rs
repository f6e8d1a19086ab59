// Every recognized configuration option, its documented default, and the
// constructor-time validation that turns a bad value into a `Configuration`
// error rather than a panic later on.

use nmeshed_base::{config_err, Error};

pub const DEFAULT_SERVER_URL: &str = "wss://api.nmeshed.com";

/// Conflict-resolution mode. `Lww` is accepted on input as an alias for
/// `Collaborative` (both resolve conflicts by hybrid-logical-clock order;
/// there is no separate code path for it) and is never produced by
/// `Display`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncMode {
    Collaborative,
    Realtime,
}

impl SyncMode {
    fn parse(raw: &str) -> Result<Self, Error> {
        match raw {
            "collaborative" | "lww" => Ok(SyncMode::Collaborative),
            "realtime" => Ok(SyncMode::Realtime),
            other => Err(config_err(format!("unrecognized sync_mode '{other}'"))),
        }
    }

    pub(crate) fn to_core(self) -> nmeshed_core::SyncMode {
        match self {
            SyncMode::Collaborative => nmeshed_core::SyncMode::Collaborative,
            SyncMode::Realtime => nmeshed_core::SyncMode::Realtime,
        }
    }

    pub(crate) fn wire_str(self) -> &'static str {
        match self {
            SyncMode::Collaborative => "collaborative",
            SyncMode::Realtime => "realtime",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub workspace_id: String,
    pub token: String,
    pub participant_id: Option<String>,
    pub server_url: String,
    pub sync_mode: String,
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    pub connection_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub max_queue_size: usize,
    pub debug: bool,
}

impl Config {
    pub fn new(workspace_id: impl Into<String>, token: impl Into<String>) -> Self {
        Config {
            workspace_id: workspace_id.into(),
            token: token.into(),
            participant_id: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            sync_mode: "collaborative".to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: 10,
            reconnect_base_delay_ms: 1_000,
            max_reconnect_delay_ms: 30_000,
            connection_timeout_ms: 10_000,
            heartbeat_interval_ms: 30_000,
            max_queue_size: 1_000,
            debug: false,
        }
    }

    pub fn with_participant_id(mut self, id: impl Into<String>) -> Self {
        self.participant_id = Some(id.into());
        self
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn with_sync_mode(mut self, mode: impl Into<String>) -> Self {
        self.sync_mode = mode.into();
        self
    }

    pub fn with_max_queue_size(mut self, max: usize) -> Self {
        self.max_queue_size = max;
        self
    }

    pub fn with_heartbeat_interval_ms(mut self, ms: u64) -> Self {
        self.heartbeat_interval_ms = ms;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn parsed_sync_mode(&self) -> Result<SyncMode, Error> {
        SyncMode::parse(&self.sync_mode)
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.workspace_id.is_empty() {
            return Err(config_err("workspace_id must not be empty"));
        }
        if self.token.is_empty() {
            return Err(config_err("token must not be empty"));
        }
        self.parsed_sync_mode()?;
        if self.max_reconnect_delay_ms < self.reconnect_base_delay_ms {
            return Err(config_err(
                "max_reconnect_delay_ms must be >= reconnect_base_delay_ms",
            ));
        }
        Ok(())
    }
}
