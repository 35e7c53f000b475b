use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("captcha error: {0}")]
    Captcha(String),

    #[error("login gave up after {0} attempts")]
    LoginExhausted(u32),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
