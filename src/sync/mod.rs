//! Reconciles live editor state with the host's serialized widget value.
//!
//! - [`PersistedState`]: the JSON blob layout, parsed leniently
//! - [`SyncLayer`]: persisted-wins lifecycle, write-through on commit, pose
//!   tabs
//! - [`export`]: every pose tab posed once, previews composed as a list or grid

pub mod export;
pub mod layer;
pub mod state;

pub use export::BatchExport;
pub use layer::{StateOrigin, StateSink, SyncLayer};
pub use state::{decode_data_url, encode_png_data_url, ExportSettings, GridLayout, OutputMode, PersistedState};
