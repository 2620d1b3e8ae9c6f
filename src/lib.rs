//! Menushot - cached raster menus from a plugin catalog
//!
//! Balances a catalog of containers into a column layout, typesets it with
//! an external compiler in an isolated worker, converts the raster to WebP
//! pages and keeps one static render per menu until its content or the
//! render settings change.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod hashing;
pub mod layout;
pub mod postprocess;
pub mod renderer;
pub mod ui;
pub mod worker;

pub use error::{MenushotError, MenushotResult};
