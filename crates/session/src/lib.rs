pub mod checker;
pub mod client;
pub mod headers;
pub mod login;
pub mod maintain;

pub use checker::StatusChecker;
pub use client::HttpTransport;
pub use login::LoginDriver;
pub use maintain::SessionMaintainer;
