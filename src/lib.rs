//! Biodiversity specimen catalog: CSV feed ingestion, SQLite storage, and a
//! JSON HTTP API for browsing plant and insect records.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod import;
pub mod insect;
pub mod migrate;
pub mod normalize;
pub mod plant;
pub mod server;
pub mod store;
