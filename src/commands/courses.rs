use anyhow::Result;

use xuanke_courses::{fetch_catalog, fetch_rounds, filter_viable, submit_registration, Catalog};

use crate::commands::Portal;

/// Fetch every catalog and print the viable offerings.
pub async fn courses(portal: Portal) -> Result<()> {
    for catalog in Catalog::ALL {
        let all = fetch_catalog(
            portal.transport.clone(),
            &portal.base,
            catalog,
            &portal.config.courses,
        )
        .await?;
        let total = all.len();
        let viable = filter_viable(catalog.label(), all);

        println!("\n{}: 总条数({}) 可用条数({})", catalog.label(), total, viable.len());
        for course in &viable {
            println!(
                "  [{}] {} {} 学分 {} {} @ {} 剩余 {}",
                course.selection_id,
                course.name,
                course.credits,
                course.teacher,
                course.schedule,
                course.location,
                course.remaining
            );
        }
    }
    Ok(())
}

/// Submit registrations for explicit selection ids.
pub async fn enroll(portal: Portal, course_ids: Vec<String>) -> Result<()> {
    for course_id in &course_ids {
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

/// Print the registration rounds currently listed by the portal.
pub async fn rounds(portal: Portal) -> Result<()> {
    let rounds = fetch_rounds(&portal.transport, &portal.base).await?;
    if rounds.is_empty() {
        println!("没有选课轮次");
        return Ok(());
    }
    for round in rounds {
        println!(
            "[{}] {} {} 至 {} ({})",
            round.year_term,
            round.name,
            round.start_time,
            round.end_time,
            if round.round_id.is_empty() {
                "未开放"
            } else {
                &round.round_id
            }
        );
    }
    Ok(())
}
