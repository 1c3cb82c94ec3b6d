mod connection;
mod endpoint;
mod payload;
mod protocol;
mod session;
mod stats;
mod tick_ring;

pub use connection::{ConnectionState, Credentials};
pub use endpoint::NetworkEndpoint;
pub use payload::{
    Appearance, CHAT_MESSAGE_LEN, ChatLine, CommandFlags, CoreState, DESPAWN_SENTINEL,
    EQUIPMENT_SLOTS, GHOST_ANCHOR_OFFSET, GHOSTS_PER_PACKET, GhostDelta, GhostUpdate,
    HISCORES_RANKS, HiscoresEntry, HiscoresPage, Identity, JAU_PACKING_RATIO, MetadataKind,
    WorldFlags, truncate_utf8,
};
pub use protocol::{
    CHAT_PACKETS_PER_TICK, CLIENT_PACKET_SIZE, CORE_WORDS, ClientPacket, DEFAULT_PORT,
    EXTRA_DATA_LEN, GAME_PACKETS_PER_TICK, LoginAck, LoginHeader, LoginRequest, NAME_LEN,
    NO_SESSION, PROTOCOL_VERSION, PacketError, PacketFrame, PacketKind, PlayerName,
    SERVER_PACKET_SIZE, SUB_BLOCK_WORDS, SUB_BLOCKS, ServerPacket, StateHeader, StateUpdate,
    TICKS_PER_CYCLE,
};
pub use session::{Session, SessionEvent};
pub use stats::NetworkStats;
pub use tick_ring::{TickRing, TickSlot};
