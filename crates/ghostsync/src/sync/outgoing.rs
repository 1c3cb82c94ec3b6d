use bytes::BufMut;

use crate::net::{CHAT_MESSAGE_LEN, CommandFlags, EXTRA_DATA_LEN, truncate_utf8};
use crate::scene::{LocalPlayer, SKILL_COUNT};

pub const MAX_SKILL_XP: u32 = 200_000_000;

/// Largest accumulator that still fits 29 bits on top of a maxed skill.
pub const MAX_XP_ACCUMULATOR: u32 = 336_870_911;

/// Accumulated XP past which every accumulator starts over.
pub const XP_ACCUMULATOR_RESET: u32 = 300_000_000;

const XP_MASK: u32 = 0x1FFF_FFFF;
const START_RANK_MASK: u32 = 0x1FFFF;
const SKILL_SELECT_MASK: u32 = 0x7F;
const COMMAND_TYPE_OFFSET: usize = 91;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCommand {
    pub kind: u8,
    pub arg: u32,
}

/// What the local participant still has to tell the server, and the
/// leaderboard it is watching.
#[derive(Debug, Clone)]
pub struct OutgoingState {
    pending_chat: Option<String>,
    pending_command: Option<AdminCommand>,
    xp_accumulators: [u32; SKILL_COUNT],
    hiscores_skill: u8,
    hiscores_start_rank: u32,
}

impl Default for OutgoingState {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl OutgoingState {
    pub fn new(hiscores_skill: u8, hiscores_start_rank: u32) -> Self {
        Self {
            pending_chat: None,
            pending_command: None,
            xp_accumulators: [0; SKILL_COUNT],
            hiscores_skill,
            hiscores_start_rank,
        }
    }

    /// Replaces any chat line not yet sent.
    pub fn queue_chat(&mut self, message: &str) {
        if !message.is_empty() {
            self.pending_chat = Some(message.to_string());
        }
    }

    pub fn queue_command(&mut self, kind: u8, arg: u32) {
        if kind != 0 {
            self.pending_command = Some(AdminCommand { kind, arg });
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_chat.is_some() || self.pending_command.is_some()
    }

    /// XP gained past the skill cap, which the game itself stops counting.
    pub fn record_fake_xp_drop(&mut self, skill: usize, xp: u32) {
        if let Some(accumulator) = self.xp_accumulators.get_mut(skill) {
            *accumulator = accumulator.saturating_add(xp);
        }
    }

    pub fn xp_accumulator(&self, skill: usize) -> u32 {
        self.xp_accumulators.get(skill).copied().unwrap_or(0)
    }

    pub fn reset_xp_accumulators(&mut self) {
        self.xp_accumulators = [0; SKILL_COUNT];
    }

    /// Drops anything queued and every accumulator. The hiscores selection
    /// is kept.
    pub fn reset(&mut self) {
        self.pending_chat = None;
        self.pending_command = None;
        self.reset_xp_accumulators();
    }

    pub fn set_hiscores_selection(&mut self, skill: u8, start_rank: u32) {
        self.hiscores_skill = skill;
        self.hiscores_start_rank = start_rank;
    }

    pub fn hiscores_selection(&self) -> (u8, u32) {
        (self.hiscores_skill, self.hiscores_start_rank)
    }

    /// Fills the trailing bytes of this tick's update with exactly one of a
    /// chat line, an admin command or a stats snapshot, in that order of
    /// preference. Returns the command flags announcing what was sent.
    pub fn take_payload(
        &mut self,
        local: &LocalPlayer,
        guest: bool,
    ) -> (CommandFlags, [u8; EXTRA_DATA_LEN]) {
        let mut extra = [0u8; EXTRA_DATA_LEN];

        if let Some(message) = self.pending_chat.take() {
            let bytes = truncate_utf8(&message, CHAT_MESSAGE_LEN);
            extra[..bytes.len()].copy_from_slice(bytes);
            return (CommandFlags::empty(), extra);
        }

        if let Some(command) = self.pending_command.take() {
            extra[COMMAND_TYPE_OFFSET] = command.kind;
            let mut tail = &mut extra[COMMAND_TYPE_OFFSET + 1..];
            tail.put_u32_le(command.arg);
            return (CommandFlags::ADMIN_CONTROL, extra);
        }

        self.write_stats(local, guest, &mut extra);
        (CommandFlags::LIVE_HISCORES, extra)
    }

    fn write_stats(&mut self, local: &LocalPlayer, guest: bool, extra: &mut [u8; EXTRA_DATA_LEN]) {
        // Three spare bits per skill word spell out three 24-bit inputs.
        let input_a = 0u32;
        let input_b = 0u32;
        let input_c = (self.hiscores_start_rank & START_RANK_MASK)
            | (self.hiscores_skill as u32 & SKILL_SELECT_MASK) << 17;

        let mut buf = &mut extra[..];
        for skill in 0..SKILL_COUNT {
            let xp = if guest { 0 } else { self.reported_xp(skill, local.skill_xp[skill]) };

            let mut word = xp & XP_MASK;
            word |= ((input_a >> skill) & 0x1) << 29;
            word |= ((input_b >> skill) & 0x1) << 30;
            word |= ((input_c >> skill) & 0x1) << 31;
            buf.put_u32_le(word);
        }
    }

    fn reported_xp(&mut self, skill: usize, xp: u32) -> u32 {
        if xp != MAX_SKILL_XP {
            return xp;
        }

        let accumulator = self.xp_accumulators[skill].min(MAX_XP_ACCUMULATOR);
        self.xp_accumulators[skill] = accumulator;
        if accumulator > XP_ACCUMULATOR_RESET {
            log::debug!("XP accumulator for skill {skill} passed {XP_ACCUMULATOR_RESET}, resetting");
            self.reset_xp_accumulators();
        }
        xp + accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(extra: &[u8; EXTRA_DATA_LEN], skill: usize) -> u32 {
        let offset = skill * 4;
        u32::from_le_bytes([extra[offset], extra[offset + 1], extra[offset + 2], extra[offset + 3]])
    }

    fn player_with_xp(xp: [u32; SKILL_COUNT]) -> LocalPlayer {
        LocalPlayer {
            skill_xp: xp,
            ..Default::default()
        }
    }

    #[test]
    fn chat_beats_command_beats_stats() {
        let local = LocalPlayer::default();
        let mut outgoing = OutgoingState::default();
        outgoing.queue_command(3, 0xDEAD_BEEF);
        outgoing.queue_chat("hello");

        let (flags, extra) = outgoing.take_payload(&local, false);
        assert_eq!(flags, CommandFlags::empty());
        assert_eq!(&extra[..5], b"hello");
        assert!(extra[5..].iter().all(|&b| b == 0));

        let (flags, extra) = outgoing.take_payload(&local, false);
        assert_eq!(flags, CommandFlags::ADMIN_CONTROL);
        assert_eq!(extra[91], 3);
        assert_eq!(&extra[92..], &0xDEAD_BEEFu32.to_le_bytes());

        let (flags, _) = outgoing.take_payload(&local, false);
        assert_eq!(flags, CommandFlags::LIVE_HISCORES);
        assert!(!outgoing.has_pending());
    }

    #[test]
    fn long_chat_is_truncated() {
        let mut outgoing = OutgoingState::default();
        outgoing.queue_chat(&"x".repeat(120));

        let (_, extra) = outgoing.take_payload(&LocalPlayer::default(), false);
        assert!(extra[..CHAT_MESSAGE_LEN].iter().all(|&b| b == b'x'));
        assert!(extra[CHAT_MESSAGE_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn stats_carry_selection_bits() {
        let mut xp = [0; SKILL_COUNT];
        xp[0] = 13_034_431;
        xp[5] = 0x3FFF_FFFF;
        let local = player_with_xp(xp);
        let mut outgoing = OutgoingState::new(7, 0b101);

        let (_, extra) = outgoing.take_payload(&local, false);

        assert_eq!(word(&extra, 0) & XP_MASK, 13_034_431);
        assert_eq!(word(&extra, 5) & XP_MASK, 0x1FFF_FFFF);

        // start rank 0b101 sets bits 0 and 2; skill 7 sets bits 17..20.
        let c_bits: Vec<usize> = (0..SKILL_COUNT).filter(|&i| word(&extra, i) >> 31 == 1).collect();
        assert_eq!(c_bits, vec![0, 2, 17, 18, 19]);
        assert!((0..SKILL_COUNT).all(|i| word(&extra, i) & (0x3 << 29) == 0));
    }

    #[test]
    fn guests_send_zero_xp() {
        let local = player_with_xp([1_000_000; SKILL_COUNT]);
        let mut outgoing = OutgoingState::new(1, 1);

        let (flags, extra) = outgoing.take_payload(&local, true);

        assert_eq!(flags, CommandFlags::LIVE_HISCORES);
        assert!((0..SKILL_COUNT).all(|i| word(&extra, i) & XP_MASK == 0));
        assert_eq!(word(&extra, 0) >> 31, 1);
        assert_eq!(word(&extra, 17) >> 31, 1);
    }

    #[test]
    fn accumulator_adds_past_cap() {
        let mut xp = [0; SKILL_COUNT];
        xp[3] = MAX_SKILL_XP;
        xp[4] = 150_000_000;
        let local = player_with_xp(xp);
        let mut outgoing = OutgoingState::default();
        outgoing.record_fake_xp_drop(3, 1_500);
        outgoing.record_fake_xp_drop(4, 900);

        let (_, extra) = outgoing.take_payload(&local, false);

        assert_eq!(word(&extra, 3) & XP_MASK, MAX_SKILL_XP + 1_500);
        assert_eq!(word(&extra, 4) & XP_MASK, 150_000_000);
        assert_eq!(outgoing.xp_accumulator(3), 1_500);
    }

    #[test]
    fn accumulator_clamps_then_resets() {
        let mut xp = [0; SKILL_COUNT];
        xp[2] = MAX_SKILL_XP;
        xp[9] = MAX_SKILL_XP;
        let local = player_with_xp(xp);
        let mut outgoing = OutgoingState::default();
        outgoing.record_fake_xp_drop(2, u32::MAX);
        outgoing.record_fake_xp_drop(9, 5_000);

        let (_, extra) = outgoing.take_payload(&local, false);

        assert_eq!(word(&extra, 2) & XP_MASK, MAX_SKILL_XP + MAX_XP_ACCUMULATOR);
        // The reset happened mid-snapshot, so later skills already report zero extra.
        assert_eq!(word(&extra, 9) & XP_MASK, MAX_SKILL_XP);
        assert_eq!(outgoing.xp_accumulator(2), 0);
        assert_eq!(outgoing.xp_accumulator(9), 0);
    }

    #[test]
    fn reset_keeps_selection() {
        let mut outgoing = OutgoingState::new(4, 50);
        outgoing.queue_chat("bye");
        outgoing.queue_command(2, 9);
        outgoing.record_fake_xp_drop(1, 700);

        outgoing.reset();

        assert!(!outgoing.has_pending());
        assert_eq!(outgoing.xp_accumulator(1), 0);
        assert_eq!(outgoing.hiscores_selection(), (4, 50));
    }

    #[test]
    fn out_of_range_skill_is_ignored() {
        let mut outgoing = OutgoingState::default();
        outgoing.record_fake_xp_drop(SKILL_COUNT, 10);
        assert_eq!(outgoing.xp_accumulator(SKILL_COUNT), 0);
    }
}
