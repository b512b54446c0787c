pub mod connection;
pub mod launch;

pub use connection::connect_to_browser;
pub use launch::launch_with_profile;
