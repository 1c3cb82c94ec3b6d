use std::time::Duration;

use crate::config::SyncConfig;

/// Longest wall-clock gap credited in one `accumulate`, in steps.
const MAX_CATCH_UP_STEPS: u32 = 4;

pub struct FixedTimestep {
    step: Duration,
    accumulator: Duration,
}

impl FixedTimestep {
    pub fn new(step: Duration) -> Self {
        Self {
            step: step.max(Duration::from_millis(1)),
            accumulator: Duration::ZERO,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator += delta.min(self.step * MAX_CATCH_UP_STEPS);
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.step {
            self.accumulator -= self.step;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStep {
    /// A game tick: receive, ingest and send.
    Tick,
    /// A render step: advance ghosts toward their targets.
    SubTick,
}

/// Drives game ticks and render sub-ticks from wall-clock time.
pub struct SimulationLoop<F> {
    tick: FixedTimestep,
    sub_tick: FixedTimestep,
    ticks_run: u64,
    step_fn: F,
}

impl<F> SimulationLoop<F>
where
    F: FnMut(ClockStep),
{
    pub fn new(config: &SyncConfig, step_fn: F) -> Self {
        Self {
            tick: FixedTimestep::from_millis(config.tick_ms),
            sub_tick: FixedTimestep::from_millis(config.sub_tick_ms),
            ticks_run: 0,
            step_fn,
        }
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    /// Runs every step that `delta` covers, ticks first. Returns the number of
    /// game ticks run.
    pub fn update(&mut self, delta: Duration) -> u32 {
        self.tick.accumulate(delta);
        self.sub_tick.accumulate(delta);

        let mut ticks = 0;
        while self.tick.consume_tick() {
            (self.step_fn)(ClockStep::Tick);
            self.ticks_run += 1;
            ticks += 1;
        }
        while self.sub_tick.consume_tick() {
            (self.step_fn)(ClockStep::SubTick);
        }

        ticks
    }

    /// Time until the next step of either kind is due.
    pub fn until_next_step(&self) -> Duration {
        let remaining = |timestep: &FixedTimestep| timestep.step.saturating_sub(timestep.accumulator);
        remaining(&self.tick).min(remaining(&self.sub_tick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::from_millis(20);

        ts.accumulate(Duration::from_millis(45));
        assert!(ts.consume_tick());
        assert!(ts.consume_tick());
        assert!(!ts.consume_tick());
        assert_eq!(ts.accumulator, Duration::from_millis(5));
    }

    #[test]
    fn long_stall_is_capped() {
        let mut ts = FixedTimestep::from_millis(600);
        ts.accumulate(Duration::from_secs(60));

        let mut steps = 0;
        while ts.consume_tick() {
            steps += 1;
        }
        assert_eq!(steps, MAX_CATCH_UP_STEPS);
    }

    #[test]
    fn loop_runs_ticks_before_sub_ticks() {
        let mut steps = Vec::new();
        let config = SyncConfig {
            tick_ms: 60,
            sub_tick_ms: 20,
            ..Default::default()
        };
        let mut sim = SimulationLoop::new(&config, |step| steps.push(step));

        assert_eq!(sim.update(Duration::from_millis(40)), 0);
        assert_eq!(sim.until_next_step(), Duration::from_millis(20));
        assert_eq!(sim.update(Duration::from_millis(20)), 1);
        assert_eq!(sim.ticks_run(), 1);
        drop(sim);

        assert_eq!(
            steps,
            vec![
                ClockStep::SubTick,
                ClockStep::SubTick,
                ClockStep::Tick,
                ClockStep::SubTick,
            ]
        );
    }
}
