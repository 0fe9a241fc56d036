/// Data layer: core types, loading, caching, filtering and export.
///
/// Architecture:
/// ```text
///  basketball-reference.com          .csv / .json / .parquet
///        │                                   │
///        ▼                                   ▼
///   ┌──────────┐                       ┌──────────┐
///   │  loader   │  HTML → table         │  loader   │
///   └──────────┘                       └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  year → PlayerStatsTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  team / position selection → row indices
///   └──────────┘
///        │
///        ├──────────────► export  (CSV, data URI, snapshots)
///        ▼
///   ┌──────────┐
///   │  stats    │  Pearson correlation matrix
///   └──────────┘
/// ```

pub mod cache;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;
