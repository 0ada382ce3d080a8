//! evalify-report: exports of stored evaluation results.
//!
//! `csv` produces the spreadsheet export; `html` a self-contained report
//! page with summary statistics.

pub mod csv;
pub mod html;
