//! fpmstat - php-fpm status collector library.
//!
//! Polls a php-fpm status page and reduces it to a fixed set of integer
//! metrics. Used by:
//! - `fpmstatd` - daemon that polls on an interval and prints the metrics

pub mod collector;
pub mod config;
pub mod metrics;
pub mod models;
