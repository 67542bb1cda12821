use crate::models::{canonical_login, CreatorStatus};


/// Picks the stream to feature: the primary creator while live, otherwise the
/// most watched live creator, otherwise the primary creator's offline card.
pub fn select_featured<'a>(statuses: &'a [CreatorStatus], primary: &str) -> Option<&'a CreatorStatus> {
    let primary = canonical_login(primary);
    let primary_entry = statuses.iter().find(|s| canonical_login(&s.login) == primary);
    if let Some(entry) = primary_entry.filter(|s| s.live) {
        return Some(entry);
    }

    let mut most_watched: Option<&CreatorStatus> = None;
    for status in statuses.iter().filter(|s| s.live) {
        if most_watched.map_or(true, |best| status.viewer_count() > best.viewer_count()) {
            most_watched = Some(status);
        }
    }

    most_watched.or(primary_entry).or_else(|| statuses.first())
}

/// Searches the creators other than `primary`, matching the query against
/// login and display name while ignoring case. The primary creator is always
/// shown on its own, so it never appears in search results.
pub fn filter_by_search<'a>(
    statuses: &'a [CreatorStatus],
    primary: &str,
    query: &str,
) -> Vec<&'a CreatorStatus> {
    let primary = canonical_login(primary);
    let query = query.trim().to_lowercase();
    statuses
        .iter()
        .filter(|status| canonical_login(&status.login) != primary)
        .filter(|status| {
            query.is_empty()
                || status.login.to_lowercase().contains(&query)
                || status
                    .user
                    .as_ref()
                    .map_or(false, |user| user.display_name.to_lowercase().contains(&query))
        })
        .collect()
}
