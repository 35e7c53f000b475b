mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use xuanke_core::config::AppConfig;

use crate::cli::{Cli, Commands};
use crate::commands::Portal;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    // Environment overrides so credentials never have to live in the file.
    if let Ok(v) = std::env::var("XUANKE_BASE_URL") {
        config.portal.base_url = v;
    }
    if let Ok(v) = std::env::var("XUANKE_USERNAME") {
        config.portal.username = v;
    }
    if let Ok(v) = std::env::var("XUANKE_PASSWORD") {
        config.portal.password = v;
    }
    if let Ok(v) = std::env::var("XUANKE_COOKIE") {
        match config
            .portal
            .cookies
            .iter_mut()
            .find(|(name, _)| name == "JSESSIONID")
        {
            Some(entry) => entry.1 = v,
            None => config.portal.cookies.push(("JSESSIONID".to_string(), v)),
        }
    }
    if let Ok(v) = std::env::var("XUANKE_CHECK_INTERVAL") {
        if let Ok(n) = v.parse::<u64>() {
            if n > 0 {
                config.session.check_interval_seconds = n;
            }
        }
    }

    let portal = Portal::new(config)?;

    match cli.command {
        Commands::Run { enroll } => commands::run::run(portal, enroll).await?,
        Commands::Login => commands::session::login(portal).await?,
        Commands::Status => commands::session::status(portal).await?,
        Commands::Courses => commands::courses::courses(portal).await?,
        Commands::Enroll { course_ids } => commands::courses::enroll(portal, course_ids).await?,
        Commands::Rounds => commands::courses::rounds(portal).await?,
    }

    Ok(())
}
