pub mod analyzers;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod output;
pub mod parser;
pub mod schema;
pub mod table;
