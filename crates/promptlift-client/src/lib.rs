//! Client layer: REST transport to the prompt backend, the session driver
//! that runs the workflow against it, and local credential storage.

pub mod config;
pub mod credential;
pub mod http;
pub mod session;

pub use config::{ClientConfig, DEFAULT_API_URL, DEFAULT_ORIGIN};
pub use credential::{CREDENTIAL_KEY, CredentialError, CredentialStore};
pub use http::{ApiClient, ApiError, Improvement, PromptApi};
pub use session::Session;
