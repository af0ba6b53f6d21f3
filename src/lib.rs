pub mod aggregate;
pub mod backoff;
pub mod categories;
pub mod config;
pub mod coordinator;
pub mod districts;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod filter;
pub mod geometry;
pub mod output;
pub mod parser;
pub mod registry;
pub mod severity;
