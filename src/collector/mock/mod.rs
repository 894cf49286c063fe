//! Mock fetcher implementations for testing.
//!
//! This module provides `MockFetcher` and pre-built status page fixtures for
//! testing the collector without a running php-fpm pool.

mod fetcher;
pub mod scenarios;

pub use fetcher::MockFetcher;
