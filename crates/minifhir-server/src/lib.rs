pub mod batch;
pub mod capability;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod seed;
pub mod server;

pub use config::AppConfig;
pub use observability::{apply_logging_level, init_tracing};
pub use seed::{SeedError, SeedReport, load_seed};
pub use server::{AppState, MiniFhirServer, ServerBuilder, bootstrap, bootstrap_with_registry, build_app};
