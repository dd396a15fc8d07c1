//! CSV rendering of submitted and locked reports.

pub mod service;
pub mod types;

pub use service::ExportEngine;
pub use types::{ExportDocument, ExportHeader, ExportOptions, CSV_CONTENT_TYPE};
