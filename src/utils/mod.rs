pub mod logging;
pub mod pacing;

pub use pacing::{DelayRange, Pacing};
