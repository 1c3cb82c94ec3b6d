mod tick;

pub use tick::{ClockStep, FixedTimestep, SimulationLoop};
