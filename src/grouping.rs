//! Grouping and ordering over the flat meeting list.
//!
//! The collection is a single ordered array; the grouped sidebar view is
//! derived from it. Everything here is a pure function over that array so
//! the manager can apply a result atomically and persist it in one step.

use crate::managers::meeting::Meeting;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One bucket of the derived view. `name == None` is the ungrouped bucket,
/// which is always first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub name: Option<String>,
    pub meetings: Vec<Meeting>,
}

/// Derive the grouped view: ungrouped bucket first, then `group_order` in
/// sequence (empty groups included, they are valid drop targets), then any
/// group referenced by a meeting but missing from the order list, in first
/// appearance order. Relative order within a bucket follows the flat list.
pub fn grouped_view(meetings: &[Meeting], group_order: &[String]) -> Vec<GroupView> {
    let order = reconcile_group_order(meetings, group_order);

    let mut view = Vec::with_capacity(order.len() + 1);
    view.push(GroupView {
        name: None,
        meetings: meetings.iter().filter(|m| m.group.is_none()).cloned().collect(),
    });
    for name in &order {
        view.push(GroupView {
            name: Some(name.clone()),
            meetings: meetings
                .iter()
                .filter(|m| m.group.as_deref() == Some(name.as_str()))
                .cloned()
                .collect(),
        });
    }
    view
}

/// Self-healing reconciliation: append every group name referenced by a
/// meeting but absent from the order list, preserving the existing order.
pub fn reconcile_group_order(meetings: &[Meeting], group_order: &[String]) -> Vec<String> {
    let mut order = group_order.to_vec();
    for meeting in meetings {
        if let Some(group) = meeting.group.as_deref() {
            if !group.is_empty() && !order.iter().any(|g| g == group) {
                order.push(group.to_string());
            }
        }
    }
    order
}

/// Move a meeting to position `dest_index` within the `dest_group` bucket
/// (`None` = ungrouped), re-deriving the absolute position in the flat
/// list. Unknown ids return the input unchanged rather than failing, to
/// tolerate races between drag events and concurrent reorders.
pub fn relocate(
    meetings: &[Meeting],
    meeting_id: &str,
    dest_group: Option<&str>,
    dest_index: usize,
    now_ms: i64,
) -> Vec<Meeting> {
    let Some(position) = meetings.iter().position(|m| m.id == meeting_id) else {
        return meetings.to_vec();
    };

    let mut list = meetings.to_vec();
    let mut moved = list.remove(position);

    // The empty string and a missing group both mean the ungrouped bucket.
    let dest = dest_group.filter(|g| !g.is_empty());
    let at = match dest {
        None => ungrouped_insert_index(&list, dest_index),
        Some(group) => grouped_insert_index(&list, group, dest_index),
    };

    moved.group = dest.map(|g| g.to_string());
    moved.updated_at = now_ms;
    list.insert(at, moved);
    list
}

/// Position math for a drop into the ungrouped bucket, computed against the
/// list with the moved meeting already removed.
fn ungrouped_insert_index(list: &[Meeting], dest_index: usize) -> usize {
    if dest_index == 0 {
        return 0;
    }
    let mut seen = 0;
    for (i, meeting) in list.iter().enumerate() {
        if meeting.group.is_none() {
            seen += 1;
            if seen == dest_index {
                return i + 1;
            }
        }
    }
    // Fewer ungrouped meetings than the index: land just before the first
    // grouped meeting, or at the end if everything is ungrouped.
    list.iter()
        .position(|m| m.group.is_some())
        .unwrap_or(list.len())
}

/// Position math for a drop into a named group. When the index overflows
/// the bucket, insert after its last member. When the bucket has no members
/// at all, fall back to a lexicographic position among the grouped
/// meetings; see the test documenting this coarse fallback.
fn grouped_insert_index(list: &[Meeting], group: &str, dest_index: usize) -> usize {
    let mut seen = 0;
    let mut last_in_bucket = None;
    for (i, meeting) in list.iter().enumerate() {
        if meeting.group.as_deref() == Some(group) {
            if seen == dest_index {
                return i;
            }
            seen += 1;
            last_in_bucket = Some(i);
        }
    }
    if let Some(last) = last_in_bucket {
        return last + 1;
    }
    list.iter()
        .position(|m| matches!(m.group.as_deref(), Some(other) if other > group))
        .unwrap_or(list.len())
}

/// Swap the named group with its neighbor in the order list. A no-op at
/// either boundary or for unknown names; never touches meeting membership.
pub fn move_group(order: &[String], name: &str, direction: Direction) -> Vec<String> {
    let mut order = order.to_vec();
    let Some(index) = order.iter().position(|g| g == name) else {
        return order;
    };
    match direction {
        Direction::Up if index > 0 => order.swap(index, index - 1),
        Direction::Down if index + 1 < order.len() => order.swap(index, index + 1),
        _ => {}
    }
    order
}

/// Synthetic separator record. Participates in ordering and grouping like
/// any meeting but is excluded from selection and search.
pub fn divider(group: Option<&str>) -> Meeting {
    let now = Utc::now().timestamp_millis();
    Meeting {
        id: Uuid::new_v4().to_string(),
        title: String::new(),
        date: String::new(),
        content: String::new(),
        notes: String::new(),
        next_time_notes: None,
        attendees: Vec::new(),
        group: group.filter(|g| !g.is_empty()).map(|g| g.to_string()),
        is_divider: true,
        created_at: now,
        updated_at: now,
    }
}
