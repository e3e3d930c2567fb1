pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod save;
pub mod scanner;
pub mod stats;
