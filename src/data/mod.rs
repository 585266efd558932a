/// Data layer: core types, loading, detection and filtering.
///
/// Architecture:
/// ```text
///     .csv bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + infer column types → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  typed columns, Schema
///   └──────────┘
///        │            ┌──────────┐
///        ├───────────▶│  detect   │  date / year / category columns
///        ▼            └──────────┘
///   ┌──────────┐
///   │  filter   │  date, year, category predicates → derived Dataset
///   └──────────┘
/// ```

pub mod detect;
pub mod filter;
pub mod loader;
pub mod model;
