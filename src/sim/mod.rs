/// Match state and the fixed-step simulation that advances it.

pub mod clock;
pub mod event;
pub mod level;
pub mod snapshot;
pub mod step;
pub mod world;
