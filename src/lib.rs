/// Coin Shop library
///
/// Exposes the shop services so the binary and integration tests share them.
pub mod api;
pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod jobs;
pub mod ledger;
pub mod metrics;
pub mod money;
pub mod purchase;
pub mod rate_limit;
pub mod server;
pub mod session;
pub mod view;
