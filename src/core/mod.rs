pub mod activity;
pub mod column;
pub mod constants;
pub mod driver;
pub mod energy;
pub mod error;
pub mod grid;
pub mod memory;
pub mod persist;
pub mod placement;
pub mod super_activity;
pub mod topology;
pub mod winner;
