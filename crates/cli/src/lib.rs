//! Public library modules for the CLI crate
pub mod format;
pub mod paths;
pub mod repl;
