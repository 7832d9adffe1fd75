//! Core library: scanning, the video catalog, edit sessions, the pending
//! overlay and its reconciliation into per-folder metadata files. `AppContext`
//! ties them together for a front end.

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod library;
pub mod models;
pub mod pending;
pub mod probe;
pub mod reconcile;
pub mod scanner;
pub mod session;
pub mod taxonomy;

pub use app::{AppContext, FinishOutcome};
pub use error::CoreError;
