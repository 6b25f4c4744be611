/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + clean file → PurchaseDataset
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ PurchaseDataset │  Vec<PurchaseRecord>, value domains
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  manual layer → base view, interactive layer → final view
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  group-by totals + correlation matrix → ChartData
///   └───────────┘
/// ```
pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
