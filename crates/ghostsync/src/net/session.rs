use super::connection::{ConnectionState, Credentials};
use super::endpoint::NetworkEndpoint;
use super::protocol::{
    ClientPacket, EXTRA_DATA_LEN, LoginAck, LoginHeader, LoginRequest, NO_SESSION,
    PROTOCOL_VERSION, ServerPacket, StateHeader, StateUpdate,
};
use super::stats::NetworkStats;
use super::tick_ring::TickRing;
use crate::config::SyncConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { session_id: u32, guest: bool },
    /// A key login was admitted as a guest.
    KeyRejected,
    TimedOut,
    Reconnected,
    LoggedOut,
}

/// Client side of the relay session: login handshake, per-tick receive into
/// the tick ring and the outgoing state update.
pub struct Session {
    server_addr: String,
    endpoint: Option<NetworkEndpoint>,
    state: ConnectionState,
    ring: TickRing,
    credentials: Option<Credentials>,
    session_id: u32,
    using_key: bool,
    account_key: u64,
    online_count: u32,
    ticks_since_login: u32,
    login_retry_ticks: u32,
    reconnect_attempts: u32,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            server_addr: config.server_addr.clone(),
            endpoint: None,
            state: ConnectionState::Disconnected,
            ring: TickRing::new(),
            credentials: None,
            session_id: NO_SESSION,
            using_key: false,
            account_key: 0,
            online_count: 0,
            ticks_since_login: 0,
            login_retry_ticks: config.login_retry_ticks.max(1),
            reconnect_attempts: config.reconnect_attempts,
            events: Vec::new(),
        }
    }

    /// Opens the socket. A failure leaves the session disconnected and is
    /// retried by the next `login`.
    pub fn connect(&mut self) -> bool {
        if self.endpoint.is_some() {
            return true;
        }

        self.state = ConnectionState::Connecting;
        match NetworkEndpoint::connect(self.server_addr.as_str()) {
            Ok(mut endpoint) => {
                endpoint.set_reconnect_attempts(self.reconnect_attempts);
                self.endpoint = Some(endpoint);
                true
            }
            Err(e) => {
                log::warn!("Could not open socket to {}: {}", self.server_addr, e);
                self.state = ConnectionState::Disconnected;
                false
            }
        }
    }

    /// Sends a login request without waiting for the reply.
    pub fn login(&mut self, credentials: Credentials) -> bool {
        if !credentials.is_valid() {
            log::warn!("Refusing to log in without an account hash and name");
            return false;
        }
        if self.state.is_logged_in() {
            return true;
        }
        if !self.connect() {
            return false;
        }

        self.credentials = Some(credentials);
        self.state = ConnectionState::AwaitingLoginAck;
        self.ticks_since_login = 0;
        self.send_login()
    }

    /// Re-sends the login every few ticks until it is acknowledged.
    pub fn maintain_login(&mut self) {
        if self.state != ConnectionState::AwaitingLoginAck {
            return;
        }

        self.ticks_since_login += 1;
        if self.ticks_since_login >= self.login_retry_ticks {
            self.ticks_since_login = 0;
            self.send_login();
        }
    }

    fn send_login(&mut self) -> bool {
        let Some(credentials) = &self.credentials else {
            return false;
        };

        let packet = ClientPacket::Login(LoginRequest {
            header: LoginHeader {
                session_id: NO_SESSION,
                using_key: credentials.use_key,
                protocol_version: PROTOCOL_VERSION,
            },
            account_hash: credentials.account_hash,
            account_key: if credentials.use_key {
                credentials.account_key
            } else {
                0
            },
            name: credentials.name,
        });

        log::debug!("Sending login for {}", credentials.name);
        self.send_packet(&packet)
    }

    /// Sends this tick's state update. Only valid once logged in.
    pub fn send_state(&mut self, core: [u32; 3], extra: &[u8]) -> bool {
        if !self.state.is_logged_in() {
            return false;
        }
        let Some(credentials) = &self.credentials else {
            return false;
        };

        let mut payload = [0u8; EXTRA_DATA_LEN];
        let len = extra.len().min(EXTRA_DATA_LEN);
        payload[..len].copy_from_slice(&extra[..len]);

        let packet = ClientPacket::State(StateUpdate {
            header: StateHeader::client_update(
                self.session_id,
                self.using_key,
                self.ring.current_tick(),
            ),
            account_hash: credentials.account_hash,
            account_key: self.account_key,
            core,
            extra: payload,
        });

        self.send_packet(&packet)
    }

    fn send_packet(&mut self, packet: &ClientPacket) -> bool {
        let Some(endpoint) = self.endpoint.as_mut() else {
            return false;
        };

        let reconnects = endpoint.stats().reconnects;
        let sent = endpoint.send_with_recovery(&packet.encode());
        if endpoint.stats().reconnects != reconnects {
            self.events.push(SessionEvent::Reconnected);
        }
        sent
    }

    /// Per-tick receive pass. Clears the ring, drains the socket into it and
    /// advances the read position, logging out once the server goes silent
    /// for a full tick cycle.
    pub fn poll(&mut self) {
        if self.endpoint.is_none() {
            return;
        }

        self.ring.reset_slots();
        self.drain_socket();

        if self.state.is_logged_in() && self.ring.advance() {
            log::warn!(
                "No data from {} for a full tick cycle, logging out",
                self.server_addr
            );
            self.events.push(SessionEvent::TimedOut);
            self.logout();
        }
    }

    fn drain_socket(&mut self) {
        loop {
            let Some(endpoint) = self.endpoint.as_mut() else {
                return;
            };

            let reconnects = endpoint.stats().reconnects;
            let received = endpoint
                .recv_with_recovery()
                .map(|data| data.map(ServerPacket::decode));
            if endpoint.stats().reconnects != reconnects {
                self.events.push(SessionEvent::Reconnected);
            }

            let decoded = match received {
                Ok(Some(decoded)) => decoded,
                Ok(None) => return,
                Err(e) => {
                    log::warn!("Receive from {} failed after reconnecting: {}", self.server_addr, e);
                    return;
                }
            };

            let accepted = match decoded {
                Ok(packet) => self.handle_packet(packet),
                Err(e) => {
                    log::debug!("Dropping datagram: {}", e);
                    false
                }
            };

            if !accepted {
                self.record_dropped();
            }
        }
    }

    fn record_dropped(&mut self) {
        if let Some(endpoint) = self.endpoint.as_mut() {
            endpoint.record_dropped();
        }
    }

    fn handle_packet(&mut self, packet: ServerPacket) -> bool {
        match packet {
            ServerPacket::LoginAck(ack) => self.handle_login_ack(&ack),
            ServerPacket::Game { header, frame } | ServerPacket::Chat { header, frame } => {
                if !self.state.is_logged_in() || header.session_id != self.session_id {
                    return false;
                }
                self.ring.store(&header, frame)
            }
        }
    }

    fn handle_login_ack(&mut self, ack: &LoginAck) -> bool {
        if self.state.is_logged_in() {
            if ack.header.session_id != self.session_id {
                return false;
            }
            self.online_count = ack.online_count;
            return true;
        }
        if self.state != ConnectionState::AwaitingLoginAck {
            return false;
        }

        let requested_key = self.credentials.as_ref().is_some_and(|c| c.use_key);

        self.session_id = ack.header.session_id;
        self.using_key = ack.header.using_key;
        self.account_key = if self.using_key { ack.account_key } else { 0 };
        self.online_count = ack.online_count;
        self.ring.seed(ack.header.tick);
        self.state = if self.using_key {
            ConnectionState::Authenticated
        } else {
            ConnectionState::Guest
        };

        log::info!(
            "Logged in as {} with session {} ({} online)",
            self.state.as_str(),
            self.session_id,
            self.online_count
        );
        self.events.push(SessionEvent::LoggedIn {
            session_id: self.session_id,
            guest: !self.using_key,
        });

        if requested_key && !self.using_key {
            log::warn!("Invalid account key, logged in as guest");
            self.events.push(SessionEvent::KeyRejected);
        }

        true
    }

    /// Forgets the session but keeps the socket open.
    pub fn logout(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        if self.state.is_logged_in() {
            log::info!("Logged out of session {}", self.session_id);
        }

        self.state = ConnectionState::Disconnected;
        self.session_id = NO_SESSION;
        self.using_key = false;
        self.account_key = 0;
        self.online_count = 0;
        self.ticks_since_login = 0;
        self.ring.clear();
        self.events.push(SessionEvent::LoggedOut);
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in()
    }

    pub fn is_guest(&self) -> bool {
        self.state == ConnectionState::Guest
    }

    pub fn session_id(&self) -> Option<u32> {
        self.state.is_logged_in().then_some(self.session_id)
    }

    pub fn online_count(&self) -> u32 {
        self.online_count
    }

    pub fn current_tick(&self) -> u8 {
        self.ring.current_tick()
    }

    pub fn ring(&self) -> &TickRing {
        &self.ring
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn stats(&self) -> Option<&NetworkStats> {
        self.endpoint.as_ref().map(NetworkEndpoint::stats)
    }

    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.endpoint.as_ref().map(NetworkEndpoint::local_addr)
    }
}
