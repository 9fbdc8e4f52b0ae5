//! # propex
//!
//! Expense aggregation and reporting for a portfolio of rental properties.
//!
//! Monthly expense records (nine fixed categories per property-month) are
//! filtered by property facets, collapsed by a trailing window, optionally
//! rescaled per unit, and turned into row views, size-weighted averages, a
//! property x category x date pivot, and spreadsheet or CSV artifacts.
//!
//! ## Example
//!
//! ```rust,ignore
//! use propex::*;
//!
//! let store = SqliteStore::open(&load_settings().database_path())?;
//! let session = ReportSession::load(&store)?;
//! let view = session.run(&ReportRequest {
//!     criteria: FilterCriteria::new().state("TX").units(50, 400),
//!     mode: WindowMode::T12,
//!     per_unit: true,
//! })?;
//! println!("{}", view::render_rows(&view.rows));
//! ```

pub mod engine;
pub mod error;
pub mod export;
pub mod filter;
pub mod fmt;
pub mod models;
pub mod normalize;
pub mod period;
pub mod pivot;
pub mod settings;
pub mod stats;
pub mod store;
pub mod view;
pub mod window;

pub use engine::{build_view, property_detail, ExportKind, ReportRequest, ReportSession, ReportView};
pub use error::{FetchError, ReportError, Result};
pub use export::{serialize, write_artifact, Artifact, ArtifactKind, ExportRequest, TemplateSpec};
pub use filter::{filter, Facets, FilterCriteria, UnitRange};
pub use models::{Category, CategoryAmounts, ExpenseRecord, Property};
pub use normalize::normalize;
pub use period::YearMonth;
pub use pivot::{build_pivot, Pivot, PivotRow};
pub use settings::{load_settings, load_settings_from, save_settings, save_settings_to, Settings};
pub use stats::{weighted_average, WeightedAverages};
pub use store::{MemoryStore, RecordStore, SqliteStore};
pub use window::{aggregate, select, AggregatedRow, RowPeriod, WindowMode};
