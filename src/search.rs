use crate::managers::meeting::Meeting;

/// Strip markup tags from editor content, keeping the raw text between
/// them. No entity decoding; this only needs to be as precise as the
/// marker scanner that shares its view of the markup.
pub fn strip_tags(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

/// Case-insensitive substring search over title, date, notes, next-time
/// notes, attendees and tag-stripped content. Dividers never match; a
/// blank query matches nothing.
pub fn search<'a>(meetings: &'a [Meeting], query: &str) -> Vec<&'a Meeting> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    meetings
        .iter()
        .filter(|m| !m.is_divider)
        .filter(|m| {
            m.title.to_lowercase().contains(&needle)
                || m.date.to_lowercase().contains(&needle)
                || m.notes.to_lowercase().contains(&needle)
                || m.next_time_notes
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
                || m.attendees.iter().any(|a| a.to_lowercase().contains(&needle))
                || strip_tags(&m.content).to_lowercase().contains(&needle)
        })
        .collect()
}
