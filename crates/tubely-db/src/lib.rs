//! Tubely Database Library
//!
//! Video metadata store: the [`VideoStore`] trait consumed by the ingestion
//! pipeline and its Postgres implementation.

pub mod db;

pub use db::setup::{connect, run_migrations};
pub use db::video::{VideoRepository, VideoStore};
