//! Server module for Placeboard
//!
//! Contains the main server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for all server components
//! - `loader`: Configuration loading from files and environment
//! - `validation`: Startup configuration validation
//! - `background_tasks`: Periodic state snapshots
//! - `shutdown`: Signal handling
//! - `init`: Main server initialization and run loop

mod background_tasks;
pub mod config;
mod init;
mod loader;
mod shutdown;
mod validation;

// Re-export public API
pub use init::{build_canvas_state, build_router, run};
pub use loader::load_config;
