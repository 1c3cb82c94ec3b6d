use serde::{Deserialize, Serialize};

use crate::net::DEFAULT_PORT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// `host:port` of the relay server.
    pub server_addr: String,
    pub tick_ms: u64,
    pub sub_tick_ms: u64,
    /// Ticks between login re-sends while no acknowledgement has arrived.
    pub login_retry_ticks: u32,
    pub reconnect_attempts: u32,
    /// Render the server's view of the local player as an extra ghost.
    pub show_self_ghost: bool,
    pub hiscores_skill: u8,
    pub hiscores_start_rank: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            tick_ms: 600,
            sub_tick_ms: 20,
            login_retry_ticks: 4,
            reconnect_attempts: 3,
            show_self_ghost: false,
            hiscores_skill: 0,
            hiscores_start_rank: 1,
        }
    }
}

impl SyncConfig {
    pub fn sub_ticks_per_tick(&self) -> u64 {
        (self.tick_ms / self.sub_tick_ms.max(1)).max(1)
    }
}
