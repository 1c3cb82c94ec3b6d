use super::protocol::{
    CHAT_PACKETS_PER_TICK, GAME_PACKETS_PER_TICK, PacketFrame, PacketKind, StateHeader,
    TICKS_PER_CYCLE,
};

/// Everything received for one server tick.
#[derive(Debug, Clone, Copy)]
pub struct TickSlot {
    game: [PacketFrame; GAME_PACKETS_PER_TICK],
    chat: [PacketFrame; CHAT_PACKETS_PER_TICK],
    game_packets_sent: u8,
    chat_packets_sent: u8,
}

impl TickSlot {
    const EMPTY: Self = Self {
        game: [PacketFrame::EMPTY; GAME_PACKETS_PER_TICK],
        chat: [PacketFrame::EMPTY; CHAT_PACKETS_PER_TICK],
        game_packets_sent: 0,
        chat_packets_sent: 0,
    };

    pub fn reset(&mut self) {
        self.game_packets_sent = 0;
        self.chat_packets_sent = 0;
        self.game.iter_mut().for_each(PacketFrame::clear);
        self.chat.iter_mut().for_each(PacketFrame::clear);
    }

    pub fn game_packets_sent(&self) -> usize {
        self.game_packets_sent as usize
    }

    pub fn chat_packets_sent(&self) -> usize {
        self.chat_packets_sent as usize
    }

    pub fn game_frames(&self) -> &[PacketFrame; GAME_PACKETS_PER_TICK] {
        &self.game
    }

    pub fn chat_frames(&self) -> &[PacketFrame; CHAT_PACKETS_PER_TICK] {
        &self.chat
    }

    pub fn has_data(&self) -> bool {
        self.game_packets_sent > 0 || self.chat_packets_sent > 0
    }
}

/// Fixed ring of the last 16 server ticks, indexed by `tick % 16`.
#[derive(Debug)]
pub struct TickRing {
    slots: Vec<TickSlot>,
    current_tick: u8,
    last_received_tick: u8,
}

impl Default for TickRing {
    fn default() -> Self {
        Self::new()
    }
}

impl TickRing {
    pub fn new() -> Self {
        Self {
            slots: vec![TickSlot::EMPTY; TICKS_PER_CYCLE],
            current_tick: 0,
            last_received_tick: 0,
        }
    }

    pub fn current_tick(&self) -> u8 {
        self.current_tick
    }

    pub fn last_received_tick(&self) -> u8 {
        self.last_received_tick
    }

    pub fn slot(&self, tick: u8) -> &TickSlot {
        &self.slots[tick as usize % TICKS_PER_CYCLE]
    }

    /// Called at the start of every receive pass; slots only ever hold the
    /// datagrams of the pass that filled them.
    pub fn reset_slots(&mut self) {
        self.slots.iter_mut().for_each(TickSlot::reset);
    }

    pub fn seed(&mut self, tick: u8) {
        self.current_tick = tick % TICKS_PER_CYCLE as u8;
        self.last_received_tick = self.current_tick;
    }

    pub fn clear(&mut self) {
        self.reset_slots();
        self.seed(0);
    }

    /// Writes a state frame into its tick slot. Returns false for sub packet
    /// ids the slot has no room for.
    pub fn store(&mut self, header: &StateHeader, frame: PacketFrame) -> bool {
        let slot = &mut self.slots[header.tick as usize % TICKS_PER_CYCLE];
        let (frames, packets_sent) = match header.kind {
            PacketKind::Game => (&mut slot.game[..], &mut slot.game_packets_sent),
            PacketKind::Chat => (&mut slot.chat[..], &mut slot.chat_packets_sent),
            _ => return false,
        };

        let capacity = frames.len();
        let index = header.sub_packet_id as usize;
        if index >= capacity {
            return false;
        }

        *packets_sent = header.packets_sent.min(capacity as u8);
        frames[index] = frame;
        true
    }

    /// Moves the read position past the newest tick that holds data.
    /// Returns true once sixteen ticks pass with nothing received.
    pub fn advance(&mut self) -> bool {
        let start = self.last_received_tick as usize;
        let newest = (0..TICKS_PER_CYCLE)
            .rev()
            .map(|offset| (start + offset) % TICKS_PER_CYCLE)
            .find(|&tick| self.slots[tick].has_data());

        if let Some(tick) = newest {
            self.seed(tick as u8);
        }

        self.current_tick = (self.current_tick + 1) % TICKS_PER_CYCLE as u8;
        self.current_tick == self.last_received_tick
    }

    /// Slots from the oldest tick to the newest, starting at the current tick.
    pub fn oldest_first(&self) -> impl Iterator<Item = (u8, &TickSlot)> {
        let start = self.current_tick as usize;
        (0..TICKS_PER_CYCLE).map(move |offset| {
            let tick = (start + offset) % TICKS_PER_CYCLE;
            (tick as u8, &self.slots[tick])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: PacketKind, tick: u8, packets_sent: u8, sub_packet_id: u8) -> StateHeader {
        StateHeader {
            kind,
            session_id: 1,
            using_key: false,
            tick,
            packets_sent,
            sub_packet_id,
        }
    }

    fn frame(marker: u32) -> PacketFrame {
        PacketFrame {
            core: [marker, 0, 0],
            ..PacketFrame::EMPTY
        }
    }

    #[test]
    fn store_indexes_by_tick_and_sub_packet() {
        let mut ring = TickRing::new();

        assert!(ring.store(&header(PacketKind::Game, 21, 3, 2), frame(7)));

        let slot = ring.slot(5);
        assert_eq!(slot.game_packets_sent(), 3);
        assert_eq!(slot.game_frames()[2].core[0], 7);
        assert!(slot.game_frames()[0].is_empty());
    }

    #[test]
    fn chat_slots_clamp_to_capacity() {
        let mut ring = TickRing::new();

        assert!(ring.store(&header(PacketKind::Chat, 0, 16, 3), frame(1)));
        assert!(!ring.store(&header(PacketKind::Chat, 0, 16, 4), frame(1)));
        assert_eq!(ring.slot(0).chat_packets_sent(), CHAT_PACKETS_PER_TICK);
        assert!(!ring.store(&header(PacketKind::Login, 0, 1, 0), frame(1)));
    }

    #[test]
    fn reset_clears_stale_frames() {
        let mut ring = TickRing::new();
        ring.store(&header(PacketKind::Game, 4, 1, 0), frame(9));

        ring.reset_slots();

        assert!(!ring.slot(4).has_data());
        assert!(ring.slot(4).game_frames()[0].is_empty());
    }

    #[test]
    fn advance_tracks_newest_tick() {
        let mut ring = TickRing::new();
        ring.seed(14);
        ring.store(&header(PacketKind::Game, 15, 1, 0), frame(1));
        ring.store(&header(PacketKind::Game, 1, 1, 0), frame(1));

        assert!(!ring.advance());
        assert_eq!(ring.last_received_tick(), 1);
        assert_eq!(ring.current_tick(), 2);

        let order: Vec<u8> = ring.oldest_first().map(|(tick, _)| tick).collect();
        assert_eq!(order.first(), Some(&2));
        assert_eq!(order.last(), Some(&1));
    }

    #[test]
    fn silence_times_out_after_full_cycle() {
        let mut ring = TickRing::new();
        ring.seed(3);

        for _ in 0..TICKS_PER_CYCLE - 1 {
            ring.reset_slots();
            assert!(!ring.advance());
        }
        ring.reset_slots();
        assert!(ring.advance());
    }
}
