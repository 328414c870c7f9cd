//! parcelscan-core - Core library for Parcelscan
//!
//! This crate contains the shared models, tracking normalizer, record store,
//! capture engine, and import/export logic used by all Parcelscan interfaces
//! (CLI, API service).

pub mod capture;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod remote;
pub mod store;
pub mod tracking;
pub mod transfer;
pub mod verify;

pub use error::{Error, Result};
pub use models::{NewScan, Scan, ScanConfig, ScanId};
