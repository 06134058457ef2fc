//! Idle cultivation game
//!
//! Core modules:
//! - `state`: persisted character record
//! - `data`: CSV-driven realm/log/adventure tables
//! - `select`: conditional weighted selection
//! - `progress`: the [`Cultivation`] manager

pub mod data;
pub mod progress;
pub mod select;
pub mod state;

pub use data::{Adventure, CultivationData, DataManager, LogTemplate, Realm};
pub use progress::{Cultivation, CultivationError, CultivationEvent, StatusView, TribulationOutcome};
pub use state::{Attr, Attributes, CultivationState, Tribulation};
