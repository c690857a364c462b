/// Data layer: survey types, loading, cleaning, and writing.
///
/// Architecture:
/// ```text
///  survey .csv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file, drop bad data → SurveyDataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ SurveyDataset │  Vec<WordRecord>, header order
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  IQR, tolerance and reasonable-interval passes
///   └──────────┘
///        │
///        ▼  (analysis::histogram, analysis::summary)
///   ┌──────────┐
///   │  writer   │  cleaned / histograms / statistics files
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
