pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, ServerConfig, StorageBackend, StorageConfig};
pub use observability::init_tracing;
pub use server::{
    AppState, MedvaultServer, ServerBuilder, ServerError, build_app, build_state, open_store,
    router,
};
