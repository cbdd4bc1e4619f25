pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;

pub use config::{AppConfig, LoggingConfig, ServerConfig};
pub use observability::{init_tracing, shutdown_tracing};
pub use server::{AppState, LinkbridgeServer, ServerBuilder, build_app};
