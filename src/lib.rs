//! Booklet Server Library
//!
//! Student score records, photo booklet generation and catalog PDF merging
//! behind a small axum router. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `db`: student records in SQLite
//! - `pdf`: booklet generation and catalog merging
//! - `fetch`: outbound HTTP behind the `Fetcher` trait
//! - `routes`: HTTP front door

pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod pdf;
pub mod routes;
pub mod state;
