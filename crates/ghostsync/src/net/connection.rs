use super::protocol::PlayerName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingLoginAck,
    Guest,
    Authenticated,
}

impl ConnectionState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::Guest | Self::Authenticated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingLoginAck => "awaiting login",
            Self::Guest => "guest",
            Self::Authenticated => "authenticated",
        }
    }
}

/// Account identity transported with every login. The key is opaque here;
/// callers mix in their own salt before handing it over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_hash: u64,
    pub account_key: u64,
    pub name: PlayerName,
    pub use_key: bool,
}

impl Credentials {
    pub fn guest(account_hash: u64, name: PlayerName) -> Self {
        Self {
            account_hash,
            account_key: 0,
            name,
            use_key: false,
        }
    }

    pub fn with_key(account_hash: u64, account_key: u64, name: PlayerName) -> Self {
        Self {
            account_hash,
            account_key,
            name,
            use_key: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.account_hash != 0 && !self.name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logged_in_states() {
        assert!(ConnectionState::Guest.is_logged_in());
        assert!(ConnectionState::Authenticated.is_logged_in());
        assert!(!ConnectionState::AwaitingLoginAck.is_logged_in());
        assert!(!ConnectionState::Disconnected.is_logged_in());
    }

    #[test]
    fn credentials_need_hash_and_name() {
        let name = PlayerName::new("Durial321").unwrap();
        assert!(Credentials::guest(7, name).is_valid());
        assert!(!Credentials::guest(0, name).is_valid());
        assert!(!Credentials::with_key(7, 9, PlayerName::default()).is_valid());
    }
}
