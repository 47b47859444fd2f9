//! Google Sheets access for Foreman.
//!
//! [`SheetsClient`] implements the core `RowSource` and `RowSink` seams over
//! the Sheets v4 values API.

pub mod client;

pub use client::SheetsClient;
