use bitflags::bitflags;

use super::protocol::{PacketFrame, PlayerName, SUB_BLOCK_WORDS, trim_text};

/// Orientation travels as `jau / 32` in a 6-bit field.
pub const JAU_PACKING_RATIO: u16 = 32;

/// Ghost word whose low 10 bits are all set marks a departed participant.
pub const DESPAWN_SENTINEL: u32 = 0x3FF;

/// Ghost deltas are relative to the sender's tile minus this offset.
pub const GHOST_ANCHOR_OFFSET: i32 = 15;

pub const GHOSTS_PER_PACKET: usize = 4;
pub const EQUIPMENT_SLOTS: usize = 7;
pub const CHAT_MESSAGE_LEN: usize = 80;
pub const HISCORES_RANKS: usize = 5;

const WORLD_MASK: u32 = 0x3FFF;
const ANIMATION_MASK: u32 = 0x3FFF;
const CAPE_MASK: u32 = 0x1F;
const ORIENTATION_MASK: u32 = 0x3F;
const DELTA_MASK: u32 = 0x1F;
const BODY_PARTS_MASK: u32 = 0x7FFF;
const LEVEL_MASK: u32 = 0xFFF;
const RANK_MASK: u32 = 0x1FFFF;
const SKILL_MASK: u32 = 0x1F;
const XP_LOW_MASK: u64 = 0x7FFF_FFFF;
const XP_HIGH_MASK: u32 = 0x1F;
const NO_MONITORED_RANK: u32 = 0x7;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandFlags: u8 {
        const MOVEMENT_UPDATE = 0x1;
        const LIVE_HISCORES = 0x2;
        const ADMIN_CONTROL = 0x4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WorldFlags: u8 {
        const PVP = 0x1;
        const INSTANCED = 0x2;
    }
}

/// The three core words every state frame starts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreState {
    pub commands: CommandFlags,
    pub world_flags: WorldFlags,
    pub world: u16,
    pub plane: u8,
    pub x: u16,
    pub y: u16,
    pub cape_id: u8,
    pub packed_orientation: u8,
    pub animation_id: u16,
    pub is_interacting: bool,
    pub is_pose_animation: bool,
}

impl CoreState {
    pub fn pack(&self) -> [u32; 3] {
        let mut word0 = self.commands.bits() as u32;
        word0 |= (self.world_flags.bits() as u32) << 8;
        word0 |= (self.world as u32 & WORLD_MASK) << 16;
        word0 |= (self.plane as u32 & 0x3) << 30;

        let word1 = self.x as u32 | (self.y as u32) << 16;

        let mut word2 = (self.cape_id as u32 & CAPE_MASK) << 5;
        word2 |= (self.packed_orientation as u32 & ORIENTATION_MASK) << 10;
        word2 |= (self.animation_id as u32 & ANIMATION_MASK) << 16;
        word2 |= (self.is_interacting as u32) << 30;
        word2 |= (self.is_pose_animation as u32) << 31;

        [word0, word1, word2]
    }

    pub fn unpack(words: &[u32; 3]) -> Self {
        let [word0, word1, word2] = *words;
        Self {
            commands: CommandFlags::from_bits_retain((word0 & 0xFF) as u8),
            world_flags: WorldFlags::from_bits_retain(((word0 >> 8) & 0xFF) as u8),
            world: ((word0 >> 16) & WORLD_MASK) as u16,
            plane: (word0 >> 30) as u8,
            x: (word1 & 0xFFFF) as u16,
            y: (word1 >> 16) as u16,
            cape_id: ((word2 >> 5) & CAPE_MASK) as u8,
            packed_orientation: ((word2 >> 10) & ORIENTATION_MASK) as u8,
            animation_id: ((word2 >> 16) & ANIMATION_MASK) as u16,
            is_interacting: (word2 >> 30) & 0x1 == 0x1,
            is_pose_animation: word2 >> 31 == 0x1,
        }
    }

    pub fn orientation(&self) -> u16 {
        self.packed_orientation as u16 * JAU_PACKING_RATIO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostDelta {
    pub dx: u8,
    pub dy: u8,
    pub packed_orientation: u8,
    pub animation_id: u16,
    pub is_interacting: bool,
    pub is_pose_animation: bool,
}

impl GhostDelta {
    pub fn orientation(&self) -> u16 {
        self.packed_orientation as u16 * JAU_PACKING_RATIO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostUpdate {
    Despawn,
    Move(GhostDelta),
}

impl GhostUpdate {
    pub fn unpack(word: u32) -> Self {
        if word & DESPAWN_SENTINEL == DESPAWN_SENTINEL {
            return Self::Despawn;
        }

        Self::Move(GhostDelta {
            dx: (word & DELTA_MASK) as u8,
            dy: ((word >> 5) & DELTA_MASK) as u8,
            packed_orientation: ((word >> 10) & ORIENTATION_MASK) as u8,
            animation_id: ((word >> 16) & ANIMATION_MASK) as u16,
            is_interacting: (word >> 30) & 0x1 == 0x1,
            is_pose_animation: word >> 31 == 0x1,
        })
    }

    pub fn pack(&self) -> u32 {
        match self {
            Self::Despawn => DESPAWN_SENTINEL,
            Self::Move(delta) => {
                let mut word = delta.dx as u32 & DELTA_MASK;
                word |= (delta.dy as u32 & DELTA_MASK) << 5;
                word |= (delta.packed_orientation as u32 & ORIENTATION_MASK) << 10;
                word |= (delta.animation_id as u32 & ANIMATION_MASK) << 16;
                word |= (delta.is_interacting as u32) << 30;
                word |= (delta.is_pose_animation as u32) << 31;
                word
            }
        }
    }
}

/// Which record a game frame's metadata blocks carry this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Identity,
    Appearance,
}

impl MetadataKind {
    pub fn for_tick(tick: u8) -> Self {
        if tick & 1 == 1 {
            Self::Appearance
        } else {
            Self::Identity
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Appearance {
    pub equipment: [u16; EQUIPMENT_SLOTS],
    /// Kit selections packed by `BodyPartKits::pack`.
    pub body_parts: u16,
    pub is_female: bool,
}

impl Appearance {
    pub fn pack(&self) -> [u32; SUB_BLOCK_WORDS] {
        let eq = self.equipment.map(u32::from);
        [
            eq[0] | eq[1] << 16,
            eq[2] | eq[3] << 16,
            eq[4] | eq[5] << 16,
            eq[6] | (self.body_parts as u32 & BODY_PARTS_MASK) << 16 | (self.is_female as u32) << 31,
        ]
    }

    pub fn unpack(words: &[u32; SUB_BLOCK_WORDS]) -> Self {
        let low = |word: u32| (word & 0xFFFF) as u16;
        let high = |word: u32| (word >> 16) as u16;
        Self {
            equipment: [
                low(words[0]),
                high(words[0]),
                low(words[1]),
                high(words[1]),
                low(words[2]),
                high(words[2]),
                low(words[3]),
            ],
            body_parts: ((words[3] >> 16) & BODY_PARTS_MASK) as u16,
            is_female: words[3] >> 31 == 0x1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    pub world: u16,
    pub cape_id: u8,
    pub name: PlayerName,
}

impl Identity {
    pub fn pack(&self) -> [u32; SUB_BLOCK_WORDS] {
        let [a, b, c] = self.name.to_words();
        let word0 = (self.world as u32 & WORLD_MASK) | (self.cape_id as u32 & CAPE_MASK) << 14;
        [word0, a, b, c]
    }

    pub fn unpack(words: &[u32; SUB_BLOCK_WORDS]) -> Self {
        Self {
            world: (words[0] & WORLD_MASK) as u16,
            cape_id: ((words[0] >> 14) & CAPE_MASK) as u8,
            name: PlayerName::from_words(&words[1..]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub world: u32,
    pub sender: PlayerName,
    pub message: String,
}

impl ChatLine {
    /// Frames whose sender world is zero carry no chat.
    pub fn unpack(frame: &PacketFrame) -> Option<Self> {
        let header = &frame.sub_blocks[0];
        if header[0] == 0 {
            return None;
        }

        let mut raw = [0u8; CHAT_MESSAGE_LEN];
        let words = frame.sub_blocks[1..6].iter().flatten();
        for (chunk, word) in raw.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }

        Some(Self {
            world: header[0],
            sender: PlayerName::from_words(&header[1..]),
            message: trim_text(&raw),
        })
    }

    pub fn pack(&self, frame: &mut PacketFrame) {
        let [a, b, c] = self.sender.to_words();
        frame.sub_blocks[0] = [self.world, a, b, c];

        let mut raw = [0u8; CHAT_MESSAGE_LEN];
        let bytes = truncate_utf8(&self.message, CHAT_MESSAGE_LEN);
        raw[..bytes.len()].copy_from_slice(bytes);

        let words = frame.sub_blocks[1..6].iter_mut().flatten();
        for (word, chunk) in words.zip(raw.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a
/// character.
pub fn truncate_utf8(text: &str, max: usize) -> &[u8] {
    let mut end = text.len().min(max);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text.as_bytes()[..end]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HiscoresEntry {
    pub name: PlayerName,
    pub level: u16,
    pub xp: u64,
    pub is_online: bool,
}

/// Five consecutive ranks of one skill's live leaderboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HiscoresPage {
    pub skill_id: u8,
    pub start_rank: u32,
    /// Offset of the rank the local player asked to monitor, if on this page.
    pub monitored_offset: Option<u8>,
    pub entries: [HiscoresEntry; HISCORES_RANKS],
}

impl HiscoresPage {
    pub fn unpack(frame: &PacketFrame) -> Self {
        let head = &frame.sub_blocks[0];
        let offset = head[0] & 0x7;

        let levels = [
            head[0] >> 20,
            head[1] & LEVEL_MASK,
            (head[1] >> 12) & LEVEL_MASK,
            head[2] & LEVEL_MASK,
            (head[2] >> 12) & LEVEL_MASK,
        ];

        let mut entries = [HiscoresEntry::default(); HISCORES_RANKS];
        for (rank, entry) in entries.iter_mut().enumerate() {
            let block = &frame.sub_blocks[rank + 1];
            let high = (head[3] >> (7 + 5 * rank as u32)) & XP_HIGH_MASK;
            *entry = HiscoresEntry {
                name: PlayerName::from_words(&block[1..]),
                level: (levels[rank] & LEVEL_MASK) as u16,
                xp: (high as u64) << 31 | (block[0] as u64 & XP_LOW_MASK),
                is_online: block[0] >> 31 == 0x1,
            };
        }

        Self {
            skill_id: (head[3] & SKILL_MASK) as u8,
            start_rank: (head[0] >> 3) & RANK_MASK,
            monitored_offset: (offset != NO_MONITORED_RANK).then_some(offset as u8),
            entries,
        }
    }

    pub fn pack(&self, frame: &mut PacketFrame) {
        let level = |rank: usize| self.entries[rank].level as u32 & LEVEL_MASK;
        let offset = self
            .monitored_offset
            .map_or(NO_MONITORED_RANK, |offset| offset as u32 & 0x7);

        let mut head3 = self.skill_id as u32 & SKILL_MASK;
        for (rank, entry) in self.entries.iter().enumerate() {
            let high = (entry.xp >> 31) as u32 & XP_HIGH_MASK;
            head3 |= high << (7 + 5 * rank as u32);

            let [a, b, c] = entry.name.to_words();
            let low = (entry.xp & XP_LOW_MASK) as u32 | (entry.is_online as u32) << 31;
            frame.sub_blocks[rank + 1] = [low, a, b, c];
        }

        frame.sub_blocks[0] = [
            offset | (self.start_rank & RANK_MASK) << 3 | level(0) << 20,
            level(1) | level(2) << 12,
            level(3) | level(4) << 12,
            head3,
        ];
    }
}
