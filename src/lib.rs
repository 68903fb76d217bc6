//! # Waymark - Persistent Multi-Map Location Registry
//!
//! Waymark maintains a navigable registry of named locations ("pins")
//! organized into linked scenes ("maps"), so an interactive session can pick
//! a destination and emit a formatted travel instruction.
//!
//! ## Features
//!
//! - **Persistent world**: sled-backed asynchronous key-value storage with
//!   write-through persistence on every mutation.
//! - **Schema Migration**: legacy flat pin collections (including a flat-text
//!   fallback dump) are wrapped into the current multi-map schema exactly
//!   once; corrupt data falls back to the starter world.
//! - **Map Graph**: portals between maps, lazy creation of unknown targets,
//!   and a single-step back-history stack.
//! - **Travel Wizard**: transient multi-step flow assembling one travel
//!   instruction from destination/companion/NPC/activity choices.
//! - **Snapshots**: dated JSON export and format-detecting import with
//!   destructive-action confirmation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use waymark::atlas::{AtlasModel, KvStore, LegacyStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = KvStore::new("data/atlas");
//!     let mut model = AtlasModel::load(store, &LegacyStore::empty()).await?;
//!     let _ = model.switch_map("suburbs").await?;
//!     println!("now on {}", model.current_map().name);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`atlas`] - Data model, storage, migration, map graph, wizard, snapshots
//! - [`config`] - Configuration management and validation
//!
//! Rendering, styling, drag geometry, image encoding, and the host command
//! executor are external collaborators: the model stores blob references and
//! percentage coordinates opaquely and hands finished instruction strings to
//! a [`atlas::CommandSink`].

pub mod atlas;
pub mod config;
