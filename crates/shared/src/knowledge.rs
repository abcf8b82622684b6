//! Bounded knowledge-context assembly. Renders a best-effort digest of a
//! user's personal data for prepending to the assistant system prompt,
//! under a hard character budget so prompt size cannot grow unbounded.

use chrono::{DateTime, NaiveDate, Utc};

pub const KNOWLEDGE_CONTEXT_MAX_CHARS: usize = 1000;
pub const TRUNCATION_MARKER: &str = "...[truncated]";

pub const MAX_DIARY_ENTRIES: usize = 3;
pub const MAX_GOALS: usize = 3;
pub const MAX_TODAY_ITEMS: usize = 3;
pub const MAX_UPCOMING_ITEMS: usize = 3;
pub const MAX_FAVORITES: usize = 5;

const MAX_DIARY_BODY_CHARS: usize = 100;
const MAX_GOAL_DESCRIPTION_CHARS: usize = 50;
const MAX_SCHEDULE_DETAIL_CHARS: usize = 50;
const MAX_FAVORITE_NOTES_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct DiaryEntrySource {
    pub title: String,
    pub content: String,
    pub entry_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct GoalSource {
    pub title: String,
    pub description: Option<String>,
    pub target_value: f64,
    pub current_value: f64,
}

#[derive(Debug, Clone)]
pub struct ScheduleItemSource {
    pub title: String,
    pub detail: Option<String>,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FavoriteSource {
    pub title: String,
    pub category: Option<String>,
    pub rating: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfileSource {
    pub username: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeSources {
    pub diary_entries: Vec<DiaryEntrySource>,
    pub goals: Vec<GoalSource>,
    pub today_items: Vec<ScheduleItemSource>,
    pub upcoming_items: Vec<ScheduleItemSource>,
    pub favorites: Vec<FavoriteSource>,
    pub profile: Option<ProfileSource>,
}

/// Renders all non-empty sections in a fixed order, then enforces the
/// global cap. The returned text never exceeds
/// [`KNOWLEDGE_CONTEXT_MAX_CHARS`] and ends with [`TRUNCATION_MARKER`]
/// when trimmed.
pub fn assemble_knowledge_context(sources: &KnowledgeSources) -> String {
    let sections = [
        diary_section(&sources.diary_entries),
        goals_section(&sources.goals),
        schedule_section(&sources.today_items, &sources.upcoming_items),
        favorites_section(&sources.favorites),
        profile_section(sources.profile.as_ref()),
    ];

    let combined = sections.into_iter().flatten().collect::<Vec<_>>().join("\n\n");
    enforce_cap(combined)
}

pub fn goal_progress_percent(current_value: f64, target_value: f64) -> u32 {
    if !(target_value > 0.0) || !current_value.is_finite() {
        return 0;
    }

    let percent = (current_value / target_value * 100.0).round();
    if percent <= 0.0 {
        0
    } else {
        percent.min(u32::MAX as f64) as u32
    }
}

fn diary_section(entries: &[DiaryEntrySource]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }

    let lines = entries
        .iter()
        .take(MAX_DIARY_ENTRIES)
        .map(|entry| {
            format!(
                "- [{}] {}: {}",
                entry.entry_date,
                collapse_whitespace(&entry.title),
                truncate_chars(&collapse_whitespace(&entry.content), MAX_DIARY_BODY_CHARS),
            )
        })
        .collect::<Vec<_>>();

    Some(format!("Recent diary entries:\n{}", lines.join("\n")))
}

fn goals_section(goals: &[GoalSource]) -> Option<String> {
    if goals.is_empty() {
        return None;
    }

    let lines = goals
        .iter()
        .take(MAX_GOALS)
        .map(|goal| {
            let mut line = format!(
                "- {} ({}% complete)",
                collapse_whitespace(&goal.title),
                goal_progress_percent(goal.current_value, goal.target_value),
            );
            if let Some(description) = goal.description.as_deref() {
                let compact = collapse_whitespace(description);
                if !compact.is_empty() {
                    line.push_str(": ");
                    line.push_str(&truncate_chars(&compact, MAX_GOAL_DESCRIPTION_CHARS));
                }
            }
            line
        })
        .collect::<Vec<_>>();

    Some(format!("Active goals:\n{}", lines.join("\n")))
}

fn schedule_section(
    today_items: &[ScheduleItemSource],
    upcoming_items: &[ScheduleItemSource],
) -> Option<String> {
    let mut blocks = Vec::new();

    if !today_items.is_empty() {
        let lines = today_items
            .iter()
            .take(MAX_TODAY_ITEMS)
            .map(|item| {
                let mut line = format!(
                    "- {} {}",
                    item.starts_at.format("%H:%M"),
                    collapse_whitespace(&item.title),
                );
                if let Some(detail) = item.detail.as_deref() {
                    let compact = collapse_whitespace(detail);
                    if !compact.is_empty() {
                        line.push_str(": ");
                        line.push_str(&truncate_chars(&compact, MAX_SCHEDULE_DETAIL_CHARS));
                    }
                }
                line
            })
            .collect::<Vec<_>>();
        blocks.push(format!("Today's schedule:\n{}", lines.join("\n")));
    }

    if !upcoming_items.is_empty() {
        let lines = upcoming_items
            .iter()
            .take(MAX_UPCOMING_ITEMS)
            .map(|item| {
                format!(
                    "- {} {}",
                    item.starts_at.format("%b %d %H:%M"),
                    collapse_whitespace(&item.title),
                )
            })
            .collect::<Vec<_>>();
        blocks.push(format!("Upcoming in the next 3 days:\n{}", lines.join("\n")));
    }

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

fn favorites_section(favorites: &[FavoriteSource]) -> Option<String> {
    if favorites.is_empty() {
        return None;
    }

    let lines = favorites
        .iter()
        .take(MAX_FAVORITES)
        .map(|favorite| {
            let mut line = format!("- {}", collapse_whitespace(&favorite.title));

            let mut qualifiers = Vec::new();
            if let Some(category) = favorite.category.as_deref() {
                let compact = collapse_whitespace(category);
                if !compact.is_empty() {
                    qualifiers.push(compact);
                }
            }
            if let Some(rating) = favorite.rating {
                qualifiers.push(format!("rated {rating}"));
            }
            if !qualifiers.is_empty() {
                line.push_str(&format!(" ({})", qualifiers.join(", ")));
            }

            if let Some(notes) = favorite.notes.as_deref() {
                let compact = collapse_whitespace(notes);
                if !compact.is_empty() {
                    line.push_str(": ");
                    line.push_str(&truncate_chars(&compact, MAX_FAVORITE_NOTES_CHARS));
                }
            }
            line
        })
        .collect::<Vec<_>>();

    Some(format!("Entertainment favorites:\n{}", lines.join("\n")))
}

fn profile_section(profile: Option<&ProfileSource>) -> Option<String> {
    let profile = profile?;
    let username = collapse_whitespace(&profile.username);
    if username.is_empty() {
        return None;
    }

    let full_name = profile
        .full_name
        .as_deref()
        .map(collapse_whitespace)
        .filter(|name| !name.is_empty());

    Some(match full_name {
        Some(full_name) => format!("User profile: {username} ({full_name})"),
        None => format!("User profile: {username}"),
    })
}

fn enforce_cap(text: String) -> String {
    if text.chars().count() <= KNOWLEDGE_CONTEXT_MAX_CHARS {
        return text;
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    let mut capped: String = text
        .chars()
        .take(KNOWLEDGE_CONTEXT_MAX_CHARS - marker_chars)
        .collect();
    capped.push_str(TRUNCATION_MARKER);
    capped
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
