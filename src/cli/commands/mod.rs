//! CLI command implementations

pub mod cache;
pub mod clean;
pub mod config;
pub mod render;
pub mod worker;

pub use cache::execute as cache;
pub use clean::execute as clean;
pub use config::execute as config;
pub use render::execute as render;
pub use worker::execute as worker;
