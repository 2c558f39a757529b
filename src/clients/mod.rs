pub mod backend;
pub mod http_client;

pub use backend::{ByteStream, StreamingBackend, TemplateSource, VariantBackend};
pub use http_client::HttpBackend;
