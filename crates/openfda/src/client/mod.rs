//! openFDA client, its configuration and the HTTP seam it talks through.

mod config;
mod fda_client;
mod transport;

pub use config::{FdaConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
pub use fda_client::FdaClient;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
