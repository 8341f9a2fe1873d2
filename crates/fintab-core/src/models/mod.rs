//! Data models for extraction output and configuration.

pub mod config;
pub mod result;
pub mod security;
pub mod table;

pub use config::FintabConfig;
pub use result::{DocumentKind, Metadata, ProcessingResult};
pub use security::{AllocationEntry, AssetAllocation, LineItem, Security, SecuritySource};
pub use table::{CellValue, TableMethod, TableRecord, TableType};
