pub mod client;
pub mod decoder;
pub mod duration;
pub mod error;
pub mod metrics;
pub mod option;
pub mod reader;
pub mod registry;
pub mod retry;
pub mod server;
pub mod store;
pub mod suite;
pub mod template;

pub use client::{ClientConfig, ClientLoader, ClientLoaderOptions};
pub use decoder::{ConfigDecoder, ConfigFormat, DefaultDecoder, Extension, NoExtension};
pub use error::{DecodeError, FetchError, LoadError, ReaderError, TemplateError, TranslateError};
pub use reader::{Backend, Reader, ReaderOptions};
pub use server::{ServerConfig, ServerLoader, ServerLoaderOptions};
pub use suite::{CallOptions, Suite};
pub use template::PathParams;
