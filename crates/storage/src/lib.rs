//! Storage layer: per-folder metadata files and the global app config.
//!
//! Every document is handled whole: load fresh, mutate in memory, save whole.
//! There is no partial update and no locking; the last writer wins.

pub mod config_store;
pub mod error;
pub mod meta_store;
pub mod models;

pub use config_store::{load_config, save_config, CONFIG_FILENAME};
pub use error::StorageError;
pub use meta_store::{meta_path, JsonMetadataStore, MetadataStore, META_FILENAME};
pub use models::{FolderMetadataFile, GlobalConfig, VideoMetadata, DEFAULT_PRESET_TAGS};
