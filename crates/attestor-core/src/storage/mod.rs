//! # Storage
//!
//! Disk-backed persistence for sealed reports and their audit trails.

mod report_store;

pub use report_store::ReportStore;
