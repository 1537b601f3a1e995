//! PDF export of consultation reports.

pub mod pdf;

pub use pdf::write_report_pdf;
