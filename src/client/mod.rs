pub mod config;
pub mod loader;
pub mod option;
pub mod translator;

pub use config::ClientConfig;
pub use loader::{ClientLoader, ClientLoaderOptions, ClientSnapshot, ClientSuite, StreamSuite};
pub use option::{CallOption, ClientOption, StreamCallOption, StreamOption};
