// Tick-driven transport state machine. Owns a `RawChannel` and layers
// status tracking, a connection watchdog, heartbeating and capped
// exponential backoff reconnection on top. Every decision point takes an
// externally-supplied `now`, so the whole thing is deterministic under test
// -- there is no internal timer or background task.

use nmeshed_base::{Error, EventBus};
use tracing::{info, warn};

use crate::backoff::{compute_backoff_ms, JitterSource};
use crate::channel::{RawChannel, RawEvent};
use crate::config::TransportConfig;
use crate::status::{TransportEvent, TransportStatus};

const HEARTBEAT_BYTE: u8 = 0x00;
const AUTH_CLOSE_RANGE: std::ops::Range<u16> = 4000..4100;

pub struct TransportDriver<C, J> {
    config: TransportConfig,
    channel: C,
    jitter: J,
    status: TransportStatus,
    events: EventBus<TransportEvent>,
    url: Option<String>,
    connecting_since: Option<u64>,
    last_heartbeat_sent: Option<u64>,
    last_heartbeat_seen: Option<u64>,
    reconnect_attempts: u32,
    reconnect_at: Option<u64>,
}

impl<C: RawChannel, J: JitterSource> TransportDriver<C, J> {
    pub fn new(config: TransportConfig, channel: C, jitter: J) -> Self {
        TransportDriver {
            config,
            channel,
            jitter,
            status: TransportStatus::Idle,
            events: EventBus::new(),
            url: None,
            connecting_since: None,
            last_heartbeat_sent: None,
            last_heartbeat_seen: None,
            reconnect_attempts: 0,
            reconnect_at: None,
        }
    }

    pub fn status(&self) -> TransportStatus {
        self.status
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TransportEvent) + 'static) -> nmeshed_base::SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: nmeshed_base::SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn set_status(&mut self, status: TransportStatus) {
        if self.status != status {
            self.status = status;
            self.events.emit(&TransportEvent::Status(status));
        }
    }

    pub fn connect(&mut self, url: String, now: u64) -> Result<(), Error> {
        self.url = Some(url.clone());
        self.set_status(TransportStatus::Connecting);
        self.connecting_since = Some(now);
        if let Err(e) = self.channel.open(&url) {
            warn!(target: "nmeshed", error = %e, "transport open failed");
            self.schedule_reconnect(now);
            return Err(e);
        }
        Ok(())
    }

    pub fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.status != TransportStatus::Connected {
            return Err(nmeshed_base::err("send while not connected"));
        }
        self.channel.send(bytes)
    }

    /// Closes the channel and returns the driver to IDLE; cancels any
    /// pending reconnect.
    pub fn stop(&mut self) {
        self.channel.close(1000);
        self.reconnect_at = None;
        self.set_status(TransportStatus::Idle);
    }

    fn schedule_reconnect(&mut self, now: u64) {
        if !self.config.auto_reconnect {
            self.set_status(TransportStatus::Error);
            return;
        }
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            self.set_status(TransportStatus::Error);
            return;
        }
        let delay = compute_backoff_ms(
            self.reconnect_attempts,
            self.config.reconnect_base_delay_ms,
            self.config.max_reconnect_delay_ms,
            &self.jitter,
        );
        self.reconnect_attempts += 1;
        self.reconnect_at = Some(now + delay);
        self.set_status(TransportStatus::Reconnecting);
    }

    fn handle_close(&mut self, code: u16, now: u64) {
        if AUTH_CLOSE_RANGE.contains(&code) {
            self.events
                .emit(&TransportEvent::Error(format!("auth failure, close code {code}")));
            self.set_status(TransportStatus::Error);
            return;
        }
        self.schedule_reconnect(now);
    }

    fn handle_raw_event(&mut self, event: RawEvent, now: u64) {
        match event {
            RawEvent::Opened => {
                if self.status == TransportStatus::Connecting {
                    self.reconnect_attempts = 0;
                    self.last_heartbeat_sent = Some(now);
                    self.last_heartbeat_seen = Some(now);
                    self.set_status(TransportStatus::Connected);
                    info!(target: "nmeshed", "transport connected");
                }
            }
            RawEvent::Bytes(bytes) => {
                self.last_heartbeat_seen = Some(now);
                if bytes.as_slice() != [HEARTBEAT_BYTE] {
                    self.events.emit(&TransportEvent::Message(bytes));
                }
            }
            RawEvent::Closed { code } => self.handle_close(code, now),
        }
    }

    /// Drains channel events, runs the connection watchdog, heartbeat and
    /// reconnect scheduling for the given instant.
    pub fn tick(&mut self, now: u64) {
        while let Some(event) = self.channel.poll() {
            self.handle_raw_event(event, now);
        }

        if self.status == TransportStatus::Connecting {
            if let Some(since) = self.connecting_since {
                if now.saturating_sub(since) >= self.config.connection_timeout_ms {
                    warn!(target: "nmeshed", "connection attempt timed out");
                    self.schedule_reconnect(now);
                }
            }
        }

        if self.status == TransportStatus::Connected {
            self.run_heartbeat(now);
        }

        if self.status == TransportStatus::Reconnecting {
            if let Some(at) = self.reconnect_at {
                if now >= at {
                    let url = self.url.clone();
                    if let Some(url) = url {
                        let _ = self.connect(url, now);
                    }
                }
            }
        }
    }

    fn run_heartbeat(&mut self, now: u64) {
        let interval = self.config.heartbeat_interval_ms;
        if interval == 0 {
            return;
        }
        if let Some(last_sent) = self.last_heartbeat_sent {
            if now.saturating_sub(last_sent) >= interval {
                if self.channel.send(&[HEARTBEAT_BYTE]).is_ok() {
                    self.last_heartbeat_sent = Some(now);
                }
            }
        }
        if let Some(last_seen) = self.last_heartbeat_seen {
            if now.saturating_sub(last_seen) >= interval * 2 {
                warn!(target: "nmeshed", "heartbeat timeout, disconnecting");
                self.channel.close(1000);
                self.schedule_reconnect(now);
            }
        }
    }
}
