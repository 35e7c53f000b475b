use anyhow::Result;
use tracing::warn;

use xuanke_core::ReentryHook;

use crate::commands::Portal;

/// One-shot login, then step into the current registration round.
pub async fn login(portal: Portal) -> Result<()> {
    portal.driver()?.login().await?;
    if let Err(e) = portal.reentry_hook().on_login().await {
        warn!(error = %e, "logged in but could not enter a registration round");
    }
    println!("登录成功");
    Ok(())
}

/// Single status probe.
pub async fn status(portal: Portal) -> Result<()> {
    let authenticated = portal.checker()?.check().await;
    println!(
        "{}",
        if authenticated {
            "已登录"
        } else {
            "未登录"
        }
    );
    Ok(())
}
