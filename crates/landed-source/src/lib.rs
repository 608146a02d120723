mod adapter;
mod error;
mod file;
mod http;
mod json;
mod registry;
mod sql;

pub use adapter::{CursorCell, RecordStream, SourceAdapter};
pub use error::SourceError;
pub use file::FileAdapter;
pub use http::HttpAdapter;
pub use registry::SourceRegistry;
pub use sql::SqlAdapter;
