//! Persistent multi-map location registry.
//! Data types, sled-backed storage, legacy schema migration, the navigable
//! map graph model, snapshot export/import, and the travel wizard live here
//! so the embedding UI layer only has to render and forward choices.

pub mod errors;
pub mod migrate;
pub mod model;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod wizard;

pub use errors::AtlasError;
pub use migrate::{classify_document, load_world, LEGACY_BG_KEY, LEGACY_PINS_KEY, WORLD_KEY};
pub use model::{
    AlwaysConfirm, AtlasModel, BackOutcome, Confirm, FloorField, NewPin, PinField, Refresh,
};
pub use snapshot::{export_world, import_document, Snapshot};
pub use store::{KvStore, LegacyStore};
pub use types::{default_world, Floor, Map, Pin, PinKind, World, DEFAULT_MAP_ID};
pub use wizard::{CommandSink, TravelWizard, WizardStep, PRESET_ACTIVITIES};
