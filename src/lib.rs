pub mod city;
pub mod config;
pub mod constants;
pub mod dates;
pub mod error;
pub mod keywords;
pub mod logging;
pub mod metrics;
pub mod parsers;
pub mod pipeline;
pub mod types;

// Ports the core depends on, and the adapters a host plugs into them
pub mod app;
pub mod infra;
