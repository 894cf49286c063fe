//! Status page collector.
//!
//! This module provides the polling pipeline for php-fpm style status pages,
//! with support for mocking the HTTP side for testing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    StatusCollector                       │
//! │  ┌──────────────┐   ┌────────────────┐   ┌────────────┐  │
//! │  │ RequestMode  │   │ json / parser  │   │  Metrics   │  │
//! │  │ (?json,?full)│──►│ StatusRecord   │──►│ Basic/Full │  │
//! │  └──────────────┘   └────────────────┘   └────────────┘  │
//! │                            ▲                             │
//! │                     ┌──────┴──────┐                      │
//! │                     │   Fetcher   │ (trait)              │
//! │                     └──────┬──────┘                      │
//! └────────────────────────────┼─────────────────────────────┘
//!                              │
//!                    ┌─────────┴─────────┐
//!                    │                   │
//!             ┌──────▼──────┐     ┌──────▼──────┐
//!             │ HttpFetcher │     │ MockFetcher │
//!             │   (ureq)    │     │ (Scenarios) │
//!             └─────────────┘     └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production
//!
//! ```no_run
//! use fpmstat::collector::StatusCollector;
//! use fpmstat::config::CollectorConfig;
//!
//! let collector = StatusCollector::from_config(&CollectorConfig::default()).unwrap();
//! let metrics = collector.collect_map();
//! ```
//!
//! ## Testing (with MockFetcher)
//!
//! ```
//! use fpmstat::collector::{MockFetcher, StatusCollector};
//! use fpmstat::config::CollectorConfig;
//!
//! let config = CollectorConfig::new("http://127.0.0.1/status?full&json");
//! let collector = StatusCollector::new(MockFetcher::typical_pool(), &config);
//! assert_eq!(collector.collect_map().len(), 15);
//! ```

pub mod fpm;
pub mod mock;
pub mod traits;

pub use fpm::format::{Detail, Format, RequestMode};
pub use fpm::{CollectError, DecodeError, StatusCollector};
pub use mock::MockFetcher;
pub use traits::{FetchError, FetchResponse, Fetcher, HttpFetcher};
