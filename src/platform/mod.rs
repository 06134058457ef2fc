//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Storage (LocalStorage / SessionStorage on web, in-memory on native)
//! - Wall-clock time and calendar dates
//! - Same-origin fetches (web only)

#[cfg(target_arch = "wasm32")]
pub mod fetch;
pub mod storage;
pub mod time;

pub use storage::{KeyValueStore, MemoryStore};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStore;
pub use time::{CivilDate, now_ms};
#[cfg(target_arch = "wasm32")]
pub use fetch::{fetch_json, fetch_text};
