//! Pure feed filtering, pagination and statistics.

use chrono::{DateTime, Utc};

use crate::notification::Priority;

use super::types::{FeedFilter, FeedPage, FeedStats, NotificationRecord};

/// Whether a visible record satisfies every criterion of `filter`
pub fn matches(record: &NotificationRecord, filter: &FeedFilter, now: DateTime<Utc>) -> bool {
    if !filter.tab.admits(record.read) {
        return false;
    }

    if filter.priority.is_some_and(|p| p != record.priority) {
        return false;
    }

    if let Some(category) = filter.category.as_deref() {
        if !category.is_empty() && record.category() != category {
            return false;
        }
    }

    if !filter.window.contains(record.created_at, now) {
        return false;
    }

    if let Some(query) = filter.query.as_deref() {
        let needle = query.trim().to_lowercase();
        if !needle.is_empty()
            && !record.title.to_lowercase().contains(&needle)
            && !record.message.to_lowercase().contains(&needle)
            && !record.event_type.to_lowercase().contains(&needle)
        {
            return false;
        }
    }

    true
}

/// Filter a user's records, newest first, and cut out the requested page
pub fn paginate(
    mut records: Vec<NotificationRecord>,
    filter: &FeedFilter,
    now: DateTime<Utc>,
) -> FeedPage {
    records.retain(|r| r.is_visible() && matches(r, filter, now));
    sort_newest_first(&mut records);

    let total = records.len();
    let notifications = records
        .into_iter()
        .skip(filter.offset)
        .take(filter.limit.unwrap_or(usize::MAX))
        .collect();

    FeedPage {
        notifications,
        total,
    }
}

pub fn sort_newest_first(records: &mut [NotificationRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Counters over the visible subset of `records`
pub fn compute_stats<'a>(records: impl IntoIterator<Item = &'a NotificationRecord>) -> FeedStats {
    records
        .into_iter()
        .filter(|r| r.is_visible())
        .fold(FeedStats::default(), |mut stats, r| {
            stats.total += 1;
            if r.read {
                stats.read += 1;
            } else {
                stats.unread += 1;
            }
            if r.priority >= Priority::High {
                stats.critical_or_high += 1;
            }
            stats
        })
}
