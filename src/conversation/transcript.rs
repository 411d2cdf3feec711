use super::item::ConversationItem;

/// Whether an item is part of the spoken dialog
fn is_dialog_line(item: &ConversationItem) -> bool {
    item.role.is_dialog() && !item.is_summary && !item.text.is_empty()
}

/// Build a `role: text` transcript, one line per dialog turn in history order.
///
/// Returns an empty string when nothing qualifies.
pub fn build_transcript(items: &[ConversationItem]) -> String {
    items
        .iter()
        .filter(|item| is_dialog_line(item))
        .map(|item| format!("{}: {}", item.role, item.text))
        .collect::<Vec<_>>()
        .join("\n")
}
