// Library surface for headless/integration tests and reuse.
// The terminal front-end lives in main.rs and ui.rs.
pub mod app_dirs;
pub mod badges;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod logging;
pub mod phase;
pub mod progress;
pub mod runtime;
pub mod session;
pub mod stopwatch;
pub mod store;
