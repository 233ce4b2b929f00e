pub mod fixtures;

pub use fixtures::{credentials, fast_queue_config};
