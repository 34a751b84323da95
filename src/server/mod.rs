//! Relay HTTP server
//!
//! Triggers test runs and serves archived results:
//! - `GET /`, `GET /health` liveness
//! - `POST /trigger-tests` run, archive and relay
//! - `GET /results`, `GET /results/:filename`, `GET /results-list`

pub mod api;
pub mod server;

pub use server::RelayServer;
