//! Report discovery over the vault's reports directory.
//!
//! Reports are JSON files written by upstream generators and named
//! `<prefix>-<YYYY-MM-DD>[-<suffix>].json`; this module only ever reads them.

pub mod catalog;
pub mod naming;
pub mod source;

pub use catalog::{filter_summaries, ReportCatalog, ReportSummary};
pub use naming::infer_type;
pub use source::{FileReportSource, ReportSource};

pub const REPORTS_DIR: &str = "07_system/reports";
