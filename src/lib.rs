// Berner Registry - Core Library
// Exposes all modules for use in the CLI and tests

pub mod config;   // TOML config + defaults
pub mod db;       // SQLite stores, upsert, import events
pub mod entities; // Breeder / Dog / Litter models
pub mod error;
pub mod grading;  // Health, longevity, pedigree and overall grades
pub mod ids;      // Identifier + name normalization
pub mod import;   // Import pipeline stages
pub mod linker;   // Cross-reference linking
pub mod parser;   // CSV readers and typed records
pub mod query;    // Filtered reads

// Re-export commonly used types
pub use config::Config;
pub use db::{
    count, find_dog_by_external_id, get_all_breeders, get_all_dogs, get_all_litters, get_dog,
    get_recent_events, insert_event, setup_database, truncate_all, upsert, EntityKind, IdMap,
    ImportEvent, Patch, Upserted,
};
pub use entities::{Breeder, Dog, Litter};
pub use error::ImportError;
pub use grading::{
    derive_age_years, recalculate_all, recalculate_breeder_grades, DogScores, GradeSummary,
    GradeWeights, GradingEngine, LongevityIndex,
};
pub use ids::{normalize_id, normalize_name, split_id_list};
pub use import::{Importer, PipelineReport, StageReport, StoreCounts};
pub use linker::{BreederLinkReport, LitterIdReport, NameIndex, NameLinkReport};
pub use parser::{Field, SourceKind};
pub use query::{
    active_breeding, find_breeders, find_dogs, find_litters, registry_stats, search, BreederQuery,
    DogQuery, LitterQuery, RegistryStats, SearchResults,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
