//! # mediabucket
//!
//! A per-destination **media bucket and publish-history engine**. Each
//! destination (e.g. a display screen) owns an ordered, favoritable
//! collection of media assets on disk, a canonical "currently displayed"
//! slot, and a bounded undo/redo history of past publishes.
//!
//! ## Layers
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  Engine facade (api.rs)                                    │
//! │  - wires components, exposes the public surface            │
//! │  - undo/redo = pointer move + history-navigation publish   │
//! └────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────┬─────────────┴──────────────┬────────────────┐
//! │ Publisher    │ PublishHistoryManager      │ BucketMaint.   │
//! │ (publisher)  │ (history)                  │ (maintenance)  │
//! └──────────────┴─────────────┬──────────────┴────────────────┘
//!                              │
//! ┌────────────────────────────┴───────────────────────────────┐
//! │  BucketStore (store/)                                      │
//! │  - sequence/favorites/published_meta document per dest     │
//! │  - per-destination locked read-modify-write cycles         │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Leaves: `sidecar` (one JSON doc per asset), `media` (kind dispatch,
//! extraction, thumbnails), `download` (remote sources), `notify` (overlay
//! contract).
//!
//! ## Not in this crate
//!
//! Image/video generation, AI-provider calls, the HTTP/CLI layer, the
//! overlay broadcaster itself, and process-wide logging/configuration
//! ownership all live with the callers.

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod history;
pub mod maintenance;
pub mod media;
pub mod model;
pub mod notify;
pub mod publisher;
pub mod sidecar;
pub mod store;

pub use api::Engine;
pub use config::{Destination, DestinationRegistry, Settings};
pub use error::{BucketError, Result};
pub use history::{BatchNavResult, PublishHistoryManager, StackInfo, TargetOutcome};
pub use maintenance::{BatchReport, BucketMaintenance, ItemOutcome, SweepSummary};
pub use model::{BucketMetadata, HistoryEntry, PublishedMeta};
pub use notify::{DisplayEvent, NullNotifier, OverlayNotifier};
pub use publisher::{PublishOptions, PublishOutcome, Publisher};
pub use store::BucketStore;
