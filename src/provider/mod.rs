//! Provider seams to the device platform, plus simulated stand-ins.

pub mod connection;
pub mod simulated;
pub mod tracker;

pub use connection::HealthConnectionProvider;
pub use simulated::{SimulatedConnectionProvider, SimulatedTrackerConfig, SimulatedTrackerProvider};
pub use tracker::HealthTrackerProvider;
