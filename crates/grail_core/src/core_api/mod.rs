mod aggregate;
mod categorize;
mod engine;
mod error;
mod history;
mod item_catalog;
mod stats;
mod types;
pub mod well_known_items;

pub use aggregate::{Aggregation, FileOutcome, aggregate_files, list_candidates, merge_outcomes};
pub use categorize::{ItemCategory, accepts, categorize};
pub use engine::Engine;
pub use error::{CoreError, CoreErrorCode};
pub use history::{ETHEREAL_HISTORY_SUFFIX, EverFoundHistory, RecentFinds, ethereal_history_key};
pub use item_catalog::{CatalogCache, FlattenedLookup, GrailCatalog, SeedDataset, SeedLeaf};
pub use stats::{
    CategoryStats, CompletionSummary, EtherealStats, GrailStats, NormalStats, compute_stats,
    display_percent, summarize,
};
pub use types::{
    EngineEvent, HISTORY_SAVE_LABEL, ItemCollection, ItemEntry, ItemMap, MANUAL_SAVE_LABEL,
    NewKey, Occurrence, RecentFind, ScanOutcome, ScanReport,
};
