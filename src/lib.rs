pub mod api;
pub mod assembler;
pub mod client;
pub mod config;
pub mod datasource;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod resolver;
pub mod template;

pub use datasource::DataSource;
pub use error::{DataSourceError, Result};
