pub mod case;
pub mod config;
pub mod error;
pub mod history;
pub mod loader;
pub mod oracle;
pub mod output;
pub mod registry;
pub mod runner;
