//! RogueLab telemetry engine
//!
//! Reconstructs playthroughs from the game client's JSON-lines event streams
//! and reduces them to per-run and cross-run balance statistics.
//! This crate has no terminal or file output of its own; see `roguelab-report`.

pub mod aggregate;
pub mod analysis;
pub mod error;
pub mod event;
pub mod loader;
pub mod model;
pub mod payload;
pub mod reconstruct;
pub mod table;
pub mod timestamp;

// Re-export commonly used types
pub use aggregate::{
    CombatAnalysis, DeathCause, EnemyStats, ItemStats, UNKNOWN_DEATH_CAUSE,
    analyze_combat_efficiency, analyze_death_causes, analyze_enemy_lethality,
    analyze_item_effectiveness, items_by_rarity,
};
pub use analysis::{RunAnalysis, analyze_run, avg_combat_turns, critical_hit_rate};
pub use error::{Result, TelemetryError};
pub use event::{Event, EventKind, parse_event_line, parse_events};
pub use loader::{
    BatchLoad, DEFAULT_EXTENSION, LoadOptions, Parallelism, SourceFailure, load_run, load_runs,
    load_runs_from_directory, reconstruct_source,
};
pub use model::{Combat, DamageEvent, EnemySnapshot, Floor, ItemSnapshot, Run};
pub use reconstruct::{FoldState, reconstruct_run};
pub use table::{
    BatchOverview, ColumnStats, DamageRow, RunRow, batch_overview, damage_rows, run_rows,
};
pub use timestamp::parse_timestamp;
