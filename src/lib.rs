pub mod configuration;
pub mod contract;
pub mod errors;
pub mod lifecycle;
pub mod probes;
pub mod runner;
pub mod target_client;
pub mod telemetry;
pub mod webdriver;
