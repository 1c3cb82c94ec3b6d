use std::fmt;

use bytes::{Buf, BufMut};

pub const PROTOCOL_VERSION: u8 = 4;
pub const DEFAULT_PORT: u16 = 43597;

pub const TICKS_PER_CYCLE: usize = 16;
pub const GAME_PACKETS_PER_TICK: usize = 16;
pub const CHAT_PACKETS_PER_TICK: usize = 4;

pub const CLIENT_PACKET_SIZE: usize = 128;
pub const SERVER_PACKET_SIZE: usize = 544;

pub const CORE_WORDS: usize = 3;
pub const SUB_BLOCKS: usize = 7;
pub const SUB_BLOCK_WORDS: usize = 4;
pub const NAME_LEN: usize = 12;
pub const EXTRA_DATA_LEN: usize = 96;

/// Session id carried on the wire while no session has been assigned.
pub const NO_SESSION: u32 = 0x1FFFF;

const KIND_MASK: u32 = 0x3;
const SESSION_SHIFT: u32 = 2;
const SESSION_MASK: u32 = 0x1FFFF;
const USING_KEY_SHIFT: u32 = 19;
const TICK_SHIFT: u32 = 20;
const TICK_MASK: u32 = 0xF;
const PACKETS_SENT_SHIFT: u32 = 24;
const PACKETS_SENT_MASK: u32 = 0xF;
const SUB_PACKET_SHIFT: u32 = 28;
const SUB_PACKET_MASK: u32 = 0xF;
const VERSION_SHIFT: u32 = 20;
const VERSION_MASK: u32 = 0xFF;
const LOGIN_RESERVED_BITS: u32 = 0xF << 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    Empty = 0,
    Login = 1,
    Game = 2,
    Chat = 3,
}

impl PacketKind {
    pub fn from_bits(bits: u32) -> Self {
        match bits & KIND_MASK {
            1 => Self::Login,
            2 => Self::Game,
            3 => Self::Chat,
            _ => Self::Empty,
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("expected a {expected} byte datagram, got {actual} bytes")]
    WrongSize { expected: usize, actual: usize },
    #[error("datagram carries no packet")]
    Empty,
    #[error("unexpected {0:?} packet")]
    UnexpectedKind(PacketKind),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u32),
    #[error("name is {0} bytes long, at most {NAME_LEN} fit")]
    NameTooLong(usize),
}

/// Header shared by every state-carrying datagram.
///
/// `packets_sent` is stored on the wire as `count - 1` so the 4-bit field
/// covers 1..=16 packets per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHeader {
    pub kind: PacketKind,
    pub session_id: u32,
    pub using_key: bool,
    pub tick: u8,
    pub packets_sent: u8,
    pub sub_packet_id: u8,
}

impl StateHeader {
    /// Header for the single update a client sends per tick. The trailing
    /// byte is left all ones.
    pub fn client_update(session_id: u32, using_key: bool, tick: u8) -> Self {
        Self {
            kind: PacketKind::Chat,
            session_id,
            using_key,
            tick,
            packets_sent: 16,
            sub_packet_id: 15,
        }
    }

    pub fn encode(&self) -> u32 {
        let mut word = self.kind as u32 & KIND_MASK;
        word |= (self.session_id & SESSION_MASK) << SESSION_SHIFT;
        word |= (self.using_key as u32) << USING_KEY_SHIFT;
        word |= (self.tick as u32 & TICK_MASK) << TICK_SHIFT;
        word |= (self.packets_sent.saturating_sub(1) as u32 & PACKETS_SENT_MASK)
            << PACKETS_SENT_SHIFT;
        word |= (self.sub_packet_id as u32 & SUB_PACKET_MASK) << SUB_PACKET_SHIFT;
        word
    }

    pub fn decode(word: u32) -> Self {
        Self {
            kind: PacketKind::from_bits(word),
            session_id: (word >> SESSION_SHIFT) & SESSION_MASK,
            using_key: (word >> USING_KEY_SHIFT) & 0x1 == 0x1,
            tick: ((word >> TICK_SHIFT) & TICK_MASK) as u8,
            packets_sent: ((word >> PACKETS_SENT_SHIFT) & PACKETS_SENT_MASK) as u8 + 1,
            sub_packet_id: ((word >> SUB_PACKET_SHIFT) & SUB_PACKET_MASK) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginHeader {
    pub session_id: u32,
    pub using_key: bool,
    pub protocol_version: u8,
}

impl LoginHeader {
    pub fn encode(&self) -> u32 {
        let mut word = PacketKind::Login as u32;
        word |= (self.session_id & SESSION_MASK) << SESSION_SHIFT;
        word |= (self.using_key as u32) << USING_KEY_SHIFT;
        word |= (self.protocol_version as u32 & VERSION_MASK) << VERSION_SHIFT;
        word |= LOGIN_RESERVED_BITS;
        word
    }

    pub fn decode(word: u32) -> Self {
        Self {
            session_id: (word >> SESSION_SHIFT) & SESSION_MASK,
            using_key: (word >> USING_KEY_SHIFT) & 0x1 == 0x1,
            protocol_version: ((word >> VERSION_SHIFT) & VERSION_MASK) as u8,
        }
    }
}

/// Fixed 12 byte display name, zero padded.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PlayerName([u8; NAME_LEN]);

impl PlayerName {
    pub fn new(name: &str) -> Result<Self, PacketError> {
        let bytes = name.as_bytes();
        if bytes.len() > NAME_LEN {
            return Err(PacketError::NameTooLong(bytes.len()));
        }
        let mut raw = [0u8; NAME_LEN];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    pub fn from_bytes(raw: [u8; NAME_LEN]) -> Self {
        Self(raw)
    }

    pub fn from_words(words: &[u32]) -> Self {
        let mut raw = [0u8; NAME_LEN];
        for (chunk, word) in raw.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Self(raw)
    }

    pub fn to_words(&self) -> [u32; 3] {
        let mut words = [0u32; 3];
        for (word, chunk) in words.iter_mut().zip(self.0.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words
    }

    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.as_string().is_empty()
    }

    pub fn as_string(&self) -> String {
        trim_text(&self.0)
    }
}

impl fmt::Debug for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerName({:?})", self.as_string())
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

pub(crate) fn trim_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Decoded payload of one server datagram: 3 core words followed by 7 blocks
/// of 4 words. A zero first core word marks the frame as empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFrame {
    pub core: [u32; CORE_WORDS],
    pub sub_blocks: [[u32; SUB_BLOCK_WORDS]; SUB_BLOCKS],
}

impl PacketFrame {
    pub const EMPTY: Self = Self {
        core: [0; CORE_WORDS],
        sub_blocks: [[0; SUB_BLOCK_WORDS]; SUB_BLOCKS],
    };

    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.core[0] == 0
    }

    fn read<B: Buf>(buf: &mut B) -> Self {
        let mut frame = Self::EMPTY;
        for word in &mut frame.core {
            *word = buf.get_u32_le();
        }
        for block in &mut frame.sub_blocks {
            for word in block.iter_mut() {
                *word = buf.get_u32_le();
            }
        }
        frame
    }

    fn write<B: BufMut>(&self, buf: &mut B) {
        for word in &self.core {
            buf.put_u32_le(*word);
        }
        for block in &self.sub_blocks {
            for word in block {
                buf.put_u32_le(*word);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginAck {
    pub header: StateHeader,
    pub account_key: u64,
    pub online_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPacket {
    LoginAck(LoginAck),
    Game {
        header: StateHeader,
        frame: PacketFrame,
    },
    Chat {
        header: StateHeader,
        frame: PacketFrame,
    },
}

impl ServerPacket {
    pub fn header(&self) -> &StateHeader {
        match self {
            Self::LoginAck(ack) => &ack.header,
            Self::Game { header, .. } | Self::Chat { header, .. } => header,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SERVER_PACKET_SIZE);
        buf.put_u32_le(self.header().encode());

        match self {
            Self::LoginAck(ack) => {
                buf.put_u64_le(ack.account_key);
                buf.put_u32_le(PROTOCOL_VERSION as u32);
                buf.resize(SERVER_PACKET_SIZE - 4, 0);
                buf.put_u32_le(ack.online_count);
            }
            Self::Game { frame, .. } | Self::Chat { frame, .. } => {
                frame.write(&mut buf);
                buf.resize(SERVER_PACKET_SIZE, 0);
            }
        }

        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() != SERVER_PACKET_SIZE {
            return Err(PacketError::WrongSize {
                expected: SERVER_PACKET_SIZE,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let header = StateHeader::decode(buf.get_u32_le());

        match header.kind {
            PacketKind::Login => {
                let account_key = buf.get_u64_le();
                let version = buf.get_u32_le();
                if version != PROTOCOL_VERSION as u32 {
                    return Err(PacketError::UnsupportedVersion(version));
                }
                let mut tail = &data[SERVER_PACKET_SIZE - 4..];
                Ok(Self::LoginAck(LoginAck {
                    header,
                    account_key,
                    online_count: tail.get_u32_le(),
                }))
            }
            PacketKind::Game => Ok(Self::Game {
                header,
                frame: PacketFrame::read(&mut buf),
            }),
            PacketKind::Chat => Ok(Self::Chat {
                header,
                frame: PacketFrame::read(&mut buf),
            }),
            PacketKind::Empty => Err(PacketError::Empty),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginRequest {
    pub header: LoginHeader,
    pub account_hash: u64,
    pub account_key: u64,
    pub name: PlayerName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateUpdate {
    pub header: StateHeader,
    pub account_hash: u64,
    pub account_key: u64,
    pub core: [u32; CORE_WORDS],
    pub extra: [u8; EXTRA_DATA_LEN],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPacket {
    Login(LoginRequest),
    State(StateUpdate),
}

impl ClientPacket {
    pub fn encode(&self) -> [u8; CLIENT_PACKET_SIZE] {
        let mut out = [0u8; CLIENT_PACKET_SIZE];
        let mut buf = &mut out[..];

        match self {
            Self::Login(login) => {
                buf.put_u32_le(login.header.encode());
                buf.put_u64_le(login.account_hash);
                buf.put_u64_le(login.account_key);
                buf.put_slice(login.name.as_bytes());
                let reserved = buf.remaining_mut();
                buf.put_bytes(0xFF, reserved);
            }
            Self::State(state) => {
                buf.put_u32_le(state.header.encode());
                buf.put_u64_le(state.account_hash);
                buf.put_u64_le(state.account_key);
                for word in &state.core {
                    buf.put_u32_le(*word);
                }
                buf.put_slice(&state.extra);
            }
        }

        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() != CLIENT_PACKET_SIZE {
            return Err(PacketError::WrongSize {
                expected: CLIENT_PACKET_SIZE,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let word = buf.get_u32_le();

        match PacketKind::from_bits(word) {
            PacketKind::Login => {
                let header = LoginHeader::decode(word);
                let account_hash = buf.get_u64_le();
                let account_key = buf.get_u64_le();
                let mut name = [0u8; NAME_LEN];
                buf.copy_to_slice(&mut name);
                Ok(Self::Login(LoginRequest {
                    header,
                    account_hash,
                    account_key,
                    name: PlayerName::from_bytes(name),
                }))
            }
            PacketKind::Chat => {
                let header = StateHeader::decode(word);
                let account_hash = buf.get_u64_le();
                let account_key = buf.get_u64_le();
                let mut core = [0u32; CORE_WORDS];
                for word in &mut core {
                    *word = buf.get_u32_le();
                }
                let mut extra = [0u8; EXTRA_DATA_LEN];
                buf.copy_to_slice(&mut extra);
                Ok(Self::State(StateUpdate {
                    header,
                    account_hash,
                    account_key,
                    core,
                    extra,
                }))
            }
            PacketKind::Empty => Err(PacketError::Empty),
            kind => Err(PacketError::UnexpectedKind(kind)),
        }
    }
}
