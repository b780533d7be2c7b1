//! Transport workload aggregation and descriptive analyses.
//!
//! The workload side buckets transports by (date, start hour), measures how
//! evenly minutes are spread across transporters, and ranks the buckets. The
//! registry side runs independent descriptive analyses over the same
//! filtered table.

pub mod aggregate;
pub mod descriptive;
pub mod ranking;
pub mod registry;
pub mod summary;
pub mod types;
pub mod utility;
