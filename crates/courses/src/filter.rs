use tracing::info;

use crate::listing::Course;

/// A course is worth submitting for only when it has no timetable conflict
/// and seats remain. The portal occasionally sends placeholder text in the
/// seats column, so counts that do not parse are kept unless they read as
/// zero or negative.
pub fn is_viable(course: &Course) -> bool {
    if !course.conflict.is_empty() {
        return false;
    }
    let seats = course.remaining.trim();
    match seats.parse::<i64>() {
        Ok(n) => n > 0,
        Err(_) => seats != "0" && !seats.starts_with('-'),
    }
}

/// Filter one catalog's listing down to viable offerings, logging the
/// total/viable split the way the round summaries read.
pub fn filter_viable(catalog_label: &str, courses: Vec<Course>) -> Vec<Course> {
    let total = courses.len();
    let viable: Vec<Course> = courses.into_iter().filter(is_viable).collect();
    info!(
        catalog = catalog_label,
        total,
        viable = viable.len(),
        "filtered listing"
    );
    viable
}
