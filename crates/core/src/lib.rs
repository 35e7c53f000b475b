pub mod config;
pub mod credentials;
pub mod error;
pub mod retry;
pub mod status;
pub mod types;

pub use config::AppConfig;
pub use credentials::{CredentialStore, Credentials};
pub use error::PortalError;
pub use retry::RetryPolicy;
pub use status::{LoginStatus, StatusTracker};
pub use types::*;
