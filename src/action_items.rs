//! Action-item extraction from meeting content.
//!
//! Items are derived from inline `AI:` markers in the rich-text markup. A
//! marker's text runs to the next tag-open character or end of string, so
//! an item written across nested markup is truncated at the first tag
//! boundary. That truncation matches what existing stored documents
//! produce and is kept as-is.

use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"AI:([^<]+)").expect("valid literal pattern"));

/// A to-do derived from an `AI:` marker. At most one item exists per
/// unique trimmed text per meeting; `completed_at` is present iff
/// `completed` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub meeting_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One marker occurrence: the trimmed trailing text plus the byte offset
/// of the marker, used for intra-batch id uniqueness.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerMatch {
    pub text: String,
    pub offset: usize,
}

/// Scan content for `AI:` markers, case-sensitively, non-overlapping,
/// left to right. Markers whose text trims to nothing are skipped.
pub fn scan(content: &str) -> Vec<MarkerMatch> {
    MARKER
        .captures_iter(content)
        .filter_map(|captures| {
            let all = captures.get(0)?;
            let text = captures.get(1)?.as_str().trim();
            if text.is_empty() {
                return None;
            }
            Some(MarkerMatch {
                text: text.to_string(),
                offset: all.start(),
            })
        })
        .collect()
}

/// Re-derive the item list for one meeting from its current content.
///
/// Items whose trimmed text still appears are carried over untouched:
/// identity and completion state survive a re-scan. Texts with no match
/// any more are dropped; new texts get fresh incomplete items. Callers
/// pass only this meeting's items and merge the result back; other
/// meetings' items are never affected.
pub fn sync(
    content: &str,
    existing: &[ActionItem],
    meeting_id: &str,
    now: DateTime<Utc>,
) -> Vec<ActionItem> {
    let by_text: HashMap<&str, &ActionItem> =
        existing.iter().map(|item| (item.text.as_str(), item)).collect();

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for found in scan(content) {
        if !seen.insert(found.text.clone()) {
            continue;
        }
        match by_text.get(found.text.as_str()) {
            Some(item) => result.push((*item).clone()),
            None => result.push(ActionItem {
                id: format!("{}-{}-{}", meeting_id, now.timestamp_millis(), found.offset),
                text: found.text,
                completed: false,
                meeting_id: meeting_id.to_string(),
                created_at: now,
                completed_at: None,
            }),
        }
    }
    result
}

/// Flip completion for the item with the given id. `completed_at` is set
/// on the false→true transition and cleared on true→false; nothing else
/// changes, and unknown ids leave the list as it was.
pub fn toggle(items: &[ActionItem], id: &str, now: DateTime<Utc>) -> Vec<ActionItem> {
    items
        .iter()
        .map(|item| {
            if item.id != id {
                return item.clone();
            }
            let mut toggled = item.clone();
            toggled.completed = !item.completed;
            toggled.completed_at = toggled.completed.then_some(now);
            toggled
        })
        .collect()
}

/// Display-only rewrite: every complete item's `AI:` marker becomes
/// `Done M/D/YY:` in the returned copy. The canonical stored content is
/// never modified; persisting the annotation would stop the scanner from
/// matching and silently drop the item on the next edit.
pub fn annotate(content: &str, completed_items: &[ActionItem], now: DateTime<Utc>) -> String {
    let mut annotated = content.to_string();
    for item in completed_items.iter().filter(|item| item.completed) {
        // Item text is escaped so regex metacharacters in a note ("call
        // Bob (urgent)") cannot corrupt matching elsewhere in the content.
        let pattern = format!(r"AI:\s*{}", regex::escape(&item.text));
        let Ok(marker) = Regex::new(&pattern) else {
            continue;
        };
        let stamp = format!(
            "Done {}: {}",
            short_date(item.completed_at.unwrap_or(now)),
            item.text
        );
        // NoExpand: item text is literal replacement text, never capture
        // group syntax.
        annotated = marker.replace_all(&annotated, NoExpand(&stamp)).into_owned();
    }
    annotated
}

/// `M/D/YY` with unpadded month and day and a two-digit year.
fn short_date(when: DateTime<Utc>) -> String {
    format!("{}/{}/{:02}", when.month(), when.day(), when.year() % 100)
}
