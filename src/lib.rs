//! Bookstore application library
//!
//! Feature modules (catalog, categories, favorites cache, account) and the
//! bootstrap that wires them into the module registry and HTTP server.

pub mod app;
pub mod modules;
pub mod utils;

pub use app::{run, App};
pub use modules::*;
