use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use xuanke_courses::{fetch_catalog, filter_viable, submit_registration, Catalog};
use xuanke_session::SessionMaintainer;

use crate::commands::Portal;

/// Full automatic flow: keep the session alive in the background, wait for
/// an authenticated session, list viable offerings, then register for any
/// requested course ids.
pub async fn run(portal: Portal, enroll_ids: Vec<String>) -> Result<()> {
    let checker = portal.checker()?;
    let driver = portal.driver()?;
    let maintainer = Arc::new(SessionMaintainer::new(
        checker.clone(),
        driver,
        portal.reentry_hook(),
    ));

    let interval = Duration::from_secs(portal.config.session.check_interval_seconds);
    let background = maintainer.clone();
    tokio::spawn(async move { background.maintain(interval).await });

    while !checker.check().await {
        info!("等待登录完成...");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    for catalog in Catalog::ALL {
        let courses = fetch_catalog(
            portal.transport.clone(),
            &portal.base,
            catalog,
            &portal.config.courses,
        )
        .await?;
        let viable = filter_viable(catalog.label(), courses);

        println!("\n{} ({} 可选):", catalog.label(), viable.len());
        for course in &viable {
            println!(
                "  [{}] {} {} 学分 {} {} 剩余 {}",
                course.selection_id,
                course.name,
                course.credits,
                course.teacher,
                course.schedule,
                course.remaining
            );
        }
    }

    for course_id in &enroll_ids {
        let outcome = submit_registration(&portal.transport, &portal.base, course_id).await?;
        println!(
            "{} -> {}",
            course_id,
            if outcome.accepted {
                "选课成功".to_string()
            } else {
                format!("失败: {}", outcome.message)
            }
        );
    }

    Ok(())
}
