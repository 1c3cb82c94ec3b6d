use std::collections::VecDeque;

use crate::net::HiscoresPage;

pub const HISCORES_QUEUE_CAPACITY: usize = 10;

/// Leaderboard pages waiting to be shown, one per game tick.
#[derive(Debug, Clone, Default)]
pub struct HiscoresBoard {
    pending: VecDeque<HiscoresPage>,
    current: Option<HiscoresPage>,
}

impl HiscoresBoard {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::with_capacity(HISCORES_QUEUE_CAPACITY),
            current: None,
        }
    }

    /// Queues a page. A backlog near capacity, or a page for a different
    /// skill than the one shown, drops everything pending first.
    pub fn push(&mut self, page: HiscoresPage) {
        let skill_changed = self
            .current
            .is_some_and(|current| current.skill_id != page.skill_id);

        if self.pending.len() >= HISCORES_QUEUE_CAPACITY - 2 || skill_changed {
            self.pending.clear();
        }
        self.pending.push_back(page);
    }

    pub fn on_tick(&mut self) -> Option<&HiscoresPage> {
        if let Some(page) = self.pending.pop_front() {
            self.current = Some(page);
        }
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&HiscoresPage> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(skill_id: u8, start_rank: u32) -> HiscoresPage {
        HiscoresPage {
            skill_id,
            start_rank,
            ..Default::default()
        }
    }

    #[test]
    fn one_page_per_tick() {
        let mut board = HiscoresBoard::new();
        board.push(page(3, 1));
        board.push(page(3, 6));

        assert_eq!(board.on_tick().map(|p| p.start_rank), Some(1));
        assert_eq!(board.on_tick().map(|p| p.start_rank), Some(6));
        assert_eq!(board.on_tick().map(|p| p.start_rank), Some(6));
        assert_eq!(board.pending(), 0);
    }

    #[test]
    fn backlog_catches_up() {
        let mut board = HiscoresBoard::new();
        for rank in 0..8 {
            board.push(page(0, rank));
        }
        assert_eq!(board.pending(), 8);

        board.push(page(0, 99));
        assert_eq!(board.pending(), 1);
        assert_eq!(board.on_tick().map(|p| p.start_rank), Some(99));
    }

    #[test]
    fn skill_change_drops_pending() {
        let mut board = HiscoresBoard::new();
        board.push(page(0, 1));
        board.on_tick();
        board.push(page(0, 6));
        board.push(page(0, 11));

        board.push(page(7, 1));
        assert_eq!(board.pending(), 1);
        assert_eq!(board.on_tick().map(|p| p.skill_id), Some(7));
    }
}
