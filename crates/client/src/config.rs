use anyhow::{Context, Result};
use ghostsync::{Credentials, PlayerName, SyncConfig};
use glam::IVec2;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub sync: SyncConfig,
    pub name: String,
    pub account_hash: u64,
    pub account_key: u64,
    /// XOR mask the stored account key is kept under.
    pub pin_salt: u64,
    pub use_key: bool,
    pub world: u16,
    pub tile: IVec2,
    /// Stop after this many ticks. Runs until killed when `None`.
    pub max_ticks: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            name: String::from("Ghost"),
            account_hash: 1,
            account_key: 0,
            pin_salt: 0,
            use_key: false,
            world: 301,
            tile: IVec2::new(3222, 3218),
            max_ticks: None,
        }
    }
}

impl ClientConfig {
    pub fn player_name(&self) -> Result<PlayerName> {
        PlayerName::new(&self.name).with_context(|| format!("invalid display name {:?}", self.name))
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let name = self.player_name()?;
        if name.is_empty() {
            anyhow::bail!("display name must not be empty");
        }
        if self.account_hash == 0 {
            anyhow::bail!("account hash must be non-zero");
        }

        Ok(if self.use_key {
            Credentials::with_key(self.account_hash, self.account_key ^ self.pin_salt, name)
        } else {
            Credentials::guest(self.account_hash, name)
        })
    }
}
