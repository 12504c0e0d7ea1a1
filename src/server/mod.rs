pub mod config;
pub mod loader;
pub mod option;
pub mod translator;

pub use config::ServerConfig;
pub use loader::{ServerLoader, ServerLoaderOptions, ServerSuite};
pub use option::{ServerOption, ServiceAddr};
