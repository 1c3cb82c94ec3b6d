use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU16, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use ghostsync::net::{
    ClientPacket, CommandFlags, CoreState, GhostDelta, GhostUpdate, LoginAck, NO_SESSION,
    PROTOCOL_VERSION, PacketKind, ServerPacket, StateHeader,
};
use ghostsync::{
    AppearanceProvider, CollisionFlags, ConnectionState, Credentials, GhostSync, LocalPlayer,
    PacketFrame, PlayerName, Scene, Session, SessionEvent, SyncConfig,
};
use glam::IVec2;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(41000);

const ACCOUNT_HASH: u64 = 0x0123_4567_89AB_CDEF;
const ACCOUNT_KEY: u64 = 0x1111_2222_3333_4444;
const SESSION_ID: u32 = 77;

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(10, Ordering::SeqCst)
}

struct FakeServer {
    socket: UdpSocket,
    client: Option<SocketAddr>,
}

impl FakeServer {
    fn bind() -> (Self, SyncConfig) {
        let port = next_port();
        let socket = UdpSocket::bind(("127.0.0.1", port)).unwrap();
        socket.set_nonblocking(true).unwrap();

        let config = SyncConfig {
            server_addr: format!("127.0.0.1:{}", port),
            ..SyncConfig::default()
        };
        (Self { socket, client: None }, config)
    }

    fn wait_for_datagram(&mut self, timeout_ms: u64) -> Option<Vec<u8>> {
        let mut buf = [0u8; 2048];
        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(timeout_ms) {
            if let Ok((size, from)) = self.socket.recv_from(&mut buf) {
                self.client = Some(from);
                return Some(buf[..size].to_vec());
            }
            thread::sleep(Duration::from_millis(1));
        }
        None
    }

    fn wait_for_packet(&mut self, timeout_ms: u64) -> Option<ClientPacket> {
        self.wait_for_datagram(timeout_ms)
            .map(|data| ClientPacket::decode(&data).unwrap())
    }

    fn send_raw(&self, data: &[u8]) {
        let client = self.client.expect("client address not yet known");
        self.socket.send_to(data, client).unwrap();
    }

    fn send(&self, packet: &ServerPacket) {
        self.send_raw(&packet.encode());
    }

    fn ack(&self, tick: u8, using_key: bool) {
        self.send(&ServerPacket::LoginAck(LoginAck {
            header: StateHeader {
                kind: PacketKind::Login,
                session_id: SESSION_ID,
                using_key,
                tick,
                packets_sent: 1,
                sub_packet_id: 0,
            },
            account_key: if using_key { ACCOUNT_KEY } else { 0 },
            online_count: 12,
        }));
    }

    fn send_game(&self, tick: u8, packets_sent: u8, sub_packet_id: u8, frame: PacketFrame) {
        self.send(&ServerPacket::Game {
            header: game_header(SESSION_ID, tick, packets_sent, sub_packet_id),
            frame,
        });
    }
}

fn game_header(session_id: u32, tick: u8, packets_sent: u8, sub_packet_id: u8) -> StateHeader {
    StateHeader {
        kind: PacketKind::Game,
        session_id,
        using_key: false,
        tick,
        packets_sent,
        sub_packet_id,
    }
}

fn name() -> PlayerName {
    PlayerName::new("Durial321").unwrap()
}

/// Lets loopback delivery finish before a single receive pass.
fn settle() {
    thread::sleep(Duration::from_millis(20));
}

fn wait_for_login(session: &mut Session, timeout_ms: u64) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        session.poll();
        if session.is_logged_in() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn logged_in_session(tick: u8, use_key: bool) -> (FakeServer, Session) {
    let (mut server, config) = FakeServer::bind();
    let mut session = Session::new(&config);
    let credentials = if use_key {
        Credentials::with_key(ACCOUNT_HASH, ACCOUNT_KEY, name())
    } else {
        Credentials::guest(ACCOUNT_HASH, name())
    };

    assert!(session.login(credentials));
    server.wait_for_datagram(200).expect("No login received");
    server.ack(tick, use_key);
    assert!(wait_for_login(&mut session, 200), "Login was never acknowledged");
    session.drain_events();

    (server, session)
}

#[test]
fn test_login_request_layout() {
    let (mut server, config) = FakeServer::bind();
    let mut session = Session::new(&config);

    assert!(session.login(Credentials::with_key(ACCOUNT_HASH, ACCOUNT_KEY, name())));
    assert_eq!(session.state(), ConnectionState::AwaitingLoginAck);

    let data = server.wait_for_datagram(200).expect("No login received");
    assert_eq!(data.len(), 128);
    assert!(data[32..].iter().all(|&b| b == 0xFF));

    match ClientPacket::decode(&data).unwrap() {
        ClientPacket::Login(login) => {
            assert_eq!(login.header.session_id, NO_SESSION);
            assert!(login.header.using_key);
            assert_eq!(login.header.protocol_version, PROTOCOL_VERSION);
            assert_eq!(login.account_hash, ACCOUNT_HASH);
            assert_eq!(login.account_key, ACCOUNT_KEY);
            assert_eq!(login.name, name());
        }
        other => panic!("Expected login, got {:?}", other),
    }
}

#[test]
fn test_login_ack_seeds_session() {
    let (mut server, config) = FakeServer::bind();
    let mut session = Session::new(&config);

    assert!(session.login(Credentials::with_key(ACCOUNT_HASH, ACCOUNT_KEY, name())));
    server.wait_for_datagram(200).expect("No login received");
    server.ack(5, true);

    assert!(wait_for_login(&mut session, 200));
    assert_eq!(session.state(), ConnectionState::Authenticated);
    assert_eq!(session.session_id(), Some(SESSION_ID));
    assert_eq!(session.online_count(), 12);
    // The receive pass that saw the ack already moved one tick on.
    assert_eq!(session.current_tick(), 6);
    assert_eq!(
        session.drain_events(),
        vec![SessionEvent::LoggedIn {
            session_id: SESSION_ID,
            guest: false
        }]
    );
}

#[test]
fn test_rejected_key_logs_in_as_guest() {
    let (mut server, config) = FakeServer::bind();
    let mut session = Session::new(&config);

    assert!(session.login(Credentials::with_key(ACCOUNT_HASH, ACCOUNT_KEY, name())));
    server.wait_for_datagram(200).expect("No login received");
    server.ack(0, false);

    assert!(wait_for_login(&mut session, 200));
    assert!(session.is_guest());
    assert_eq!(
        session.drain_events(),
        vec![
            SessionEvent::LoggedIn {
                session_id: SESSION_ID,
                guest: true
            },
            SessionEvent::KeyRejected,
        ]
    );
}

#[test]
fn test_login_resent_until_acknowledged() {
    let (mut server, config) = FakeServer::bind();
    let mut session = Session::new(&config);

    assert!(session.login(Credentials::guest(ACCOUNT_HASH, name())));
    server.wait_for_datagram(200).expect("No login received");

    for _ in 0..config.login_retry_ticks - 1 {
        session.maintain_login();
    }
    assert!(server.wait_for_datagram(30).is_none());

    session.maintain_login();
    match server.wait_for_packet(200) {
        Some(ClientPacket::Login(login)) => assert_eq!(login.name, name()),
        other => panic!("Expected a second login, got {:?}", other),
    }
}

#[test]
fn test_state_frames_stored_by_tick() {
    let (server, mut session) = logged_in_session(5, false);

    let mut frame = PacketFrame::EMPTY;
    frame.core = [0x0012_0001, 0x0C80_0C80, 0];
    frame.sub_blocks[0] = [1, 2, 3, 4];
    server.send_game(6, 2, 1, frame);

    settle();
    session.poll();

    let slot = session.ring().slot(6);
    assert_eq!(slot.game_packets_sent(), 2);
    assert_eq!(slot.game_frames()[1], frame);
    assert!(slot.game_frames()[0].is_empty());
    assert_eq!(session.current_tick(), 7);
}

#[test]
fn test_stale_slots_cleared_each_pass() {
    let (server, mut session) = logged_in_session(5, false);

    let mut frame = PacketFrame::EMPTY;
    frame.core[0] = 0x1;
    server.send_game(6, 1, 0, frame);

    settle();
    session.poll();
    assert!(session.ring().slot(6).has_data());

    session.poll();
    assert!(!session.ring().slot(6).has_data());
}

#[test]
fn test_malformed_datagrams_dropped() {
    let (server, mut session) = logged_in_session(0, false);

    server.send_raw(&[0u8; 100]);
    server.send_raw(&[0u8; 600]);
    server.send(&ServerPacket::Game {
        header: game_header(SESSION_ID + 1, 1, 1, 0),
        frame: PacketFrame::EMPTY,
    });

    settle();
    session.poll();

    assert!(session.is_logged_in());
    assert_eq!(session.stats().map(|s| s.packets_dropped), Some(3));
    assert!(!session.ring().slot(1).has_data());
}

#[test]
fn test_silence_times_out_once() {
    let (_server, mut session) = logged_in_session(5, false);

    for _ in 0..14 {
        session.poll();
        assert!(session.drain_events().is_empty());
    }

    session.poll();
    assert_eq!(
        session.drain_events(),
        vec![SessionEvent::TimedOut, SessionEvent::LoggedOut]
    );
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(session.session_id(), None);

    for _ in 0..20 {
        session.poll();
    }
    assert!(session.drain_events().is_empty());
}

#[test]
fn test_timeout_clears_outgoing_state() {
    let (_server, mut session) = logged_in_session(5, false);
    let mut sync = GhostSync::new(&SyncConfig::default());
    sync.outgoing_mut().record_fake_xp_drop(3, 1_500);
    sync.outgoing_mut().queue_chat("left over");

    let mut events = Vec::new();
    for _ in 0..15 {
        session.poll();
        events.extend(session.drain_events());
    }
    assert!(events.contains(&SessionEvent::LoggedOut));

    for event in events {
        if event == SessionEvent::LoggedOut {
            sync.clear();
        }
    }

    assert_eq!(sync.outgoing().xp_accumulator(3), 0);
    assert!(!sync.outgoing().has_pending());
    assert_eq!(sync.cape_id(), ghostsync::sync::NO_CAPE);
}

#[test]
fn test_state_update_layout() {
    let (mut server, mut session) = logged_in_session(3, true);

    let core = [0xAABB_0001, 0x0C80_0C80, 0x8000_0000];
    let mut extra = [0u8; 96];
    extra[..5].copy_from_slice(b"hello");

    assert!(session.send_state(core, &extra));
    let data = server.wait_for_datagram(200).expect("No state update received");
    assert_eq!(data.len(), 128);
    assert_eq!(data[3], 0xFF);

    match ClientPacket::decode(&data).unwrap() {
        ClientPacket::State(update) => {
            assert_eq!(update.header.kind, PacketKind::Chat);
            assert_eq!(update.header.session_id, SESSION_ID);
            assert!(update.header.using_key);
            assert_eq!(update.header.tick, session.current_tick());
            assert_eq!(update.account_hash, ACCOUNT_HASH);
            assert_eq!(update.account_key, ACCOUNT_KEY);
            assert_eq!(update.core, core);
            assert_eq!(update.extra, extra);
        }
        other => panic!("Expected state update, got {:?}", other),
    }
}

#[test]
fn test_logout_keeps_socket() {
    let (mut server, mut session) = logged_in_session(0, false);

    session.logout();
    assert_eq!(session.drain_events(), vec![SessionEvent::LoggedOut]);
    assert!(!session.send_state([0; 3], &[]));
    assert!(session.local_addr().is_some());

    assert!(session.login(Credentials::guest(ACCOUNT_HASH, name())));
    assert!(matches!(server.wait_for_packet(200), Some(ClientPacket::Login(_))));
}

#[test]
fn test_refused_receive_reconnects_and_stays_logged_in() {
    let (server, mut session) = logged_in_session(0, false);
    let first_addr = session.local_addr();
    drop(server);

    assert!(session.send_state([0; 3], &[]));
    settle();
    session.poll();

    assert_eq!(session.drain_events(), vec![SessionEvent::Reconnected]);
    assert!(session.is_logged_in());
    assert_eq!(session.stats().map(|s| s.reconnects), Some(1));
    assert_ne!(session.local_addr(), first_addr);
}

struct Flat;

impl Scene for Flat {
    fn plane(&self) -> u8 {
        0
    }

    fn base(&self) -> IVec2 {
        IVec2::new(3150, 3150)
    }

    fn collision_flags(&self, _plane: u8, _tile: IVec2) -> CollisionFlags {
        CollisionFlags::empty()
    }
}

struct NoModels;

impl AppearanceProvider for NoModels {
    fn apply(
        &mut self,
        _slot: usize,
        _appearance: &ghostsync::net::Appearance,
        _body_parts: ghostsync::scene::BodyParts,
        _cape_id: u8,
    ) {
    }
}

#[test]
fn test_received_ghost_walks() {
    let (server, mut session) = logged_in_session(5, false);
    let config = SyncConfig::default();
    let mut sync = GhostSync::new(&config);
    let local = LocalPlayer {
        name: name(),
        world: 302,
        tile: IVec2::new(3200, 3200),
        ..Default::default()
    };

    let ghost_frame = |dx: u8| {
        let mut frame = PacketFrame::EMPTY;
        frame.core = CoreState {
            commands: CommandFlags::MOVEMENT_UPDATE,
            world: 302,
            x: 3200,
            y: 3200,
            ..Default::default()
        }
        .pack();
        frame.sub_blocks[0][0] = GhostUpdate::Move(GhostDelta {
            dx,
            dy: 15,
            packed_orientation: 48,
            animation_id: 808,
            is_interacting: false,
            is_pose_animation: true,
        })
        .pack();
        frame
    };

    server.send_game(6, 1, 0, ghost_frame(15));
    settle();
    session.poll();
    sync.ingest(session.ring(), &Flat, &local, &mut NoModels);

    let ghost = sync.ghost(0).unwrap();
    assert!(ghost.is_active());
    assert_eq!(ghost.world_tile(&Flat), IVec2::new(3200, 3200));

    server.send_game(7, 1, 0, ghost_frame(16));
    settle();
    session.poll();
    sync.ingest(session.ring(), &Flat, &local, &mut NoModels);

    // Ghosts trail the server by a tick, so give them two to arrive.
    for _ in 0..2 * config.sub_ticks_per_tick() {
        sync.advance(&Flat);
    }
    assert_eq!(sync.ghost(0).map(|g| g.world_tile(&Flat)), Some(IVec2::new(3201, 3200)));
    assert!(sync.ghost(0).unwrap().queue().is_empty());
}
