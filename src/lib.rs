pub mod notify;
pub mod parser;
pub mod report;
pub mod runner;
pub mod server;
pub mod store;
pub mod testdata;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export common items
pub use parser::parse_results;
pub use report::generate_report;
pub use runner::Orchestrator;
pub use server::RelayServer;
