//! Todo and schedule list editing.
//!
//! Both lists are stored as JSON arrays. Hydration is lossy on purpose:
//! anything that does not parse as an array of the expected items becomes an
//! empty list and a warning in the log, so one bad row never breaks a day.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

use super::model::{new_item_id, ScheduleItem, TodoItem};

pub trait ListItem: Serialize + DeserializeOwned + Clone {
    /// Name used in log lines.
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Restore canonical order after hydration or insertion.
    fn canonicalize(_items: &mut [Self]) {}
}

impl ListItem for TodoItem {
    const KIND: &'static str = "todos";

    fn id(&self) -> &str {
        &self.id
    }
}

impl ListItem for ScheduleItem {
    const KIND: &'static str = "schedule";

    fn id(&self) -> &str {
        &self.id
    }

    fn canonicalize(items: &mut [Self]) {
        sort_schedule(items);
    }
}

/// Parse stored list text. `None`, empty and malformed text all yield an
/// empty list.
pub fn hydrate<T: ListItem>(text: Option<&str>) -> Vec<T> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(text) {
        Ok(value) => hydrate_array(value),
        Err(e) => {
            warn!(kind = T::KIND, error = %e, "stored list is not valid JSON; using empty list");
            Vec::new()
        }
    }
}

/// Hydrate from a JSONB column. A JSON string is treated as legacy list text.
pub fn hydrate_value<T: ListItem>(value: Value) -> Vec<T> {
    match value {
        Value::Null => Vec::new(),
        Value::String(text) => hydrate(Some(&text)),
        other => hydrate_array(other),
    }
}

fn hydrate_array<T: ListItem>(value: Value) -> Vec<T> {
    if !value.is_array() {
        warn!(kind = T::KIND, "stored list is not a JSON array; using empty list");
        return Vec::new();
    }
    match serde_json::from_value::<Vec<T>>(value) {
        Ok(mut items) => {
            T::canonicalize(&mut items);
            items
        }
        Err(e) => {
            warn!(kind = T::KIND, error = %e, "stored list has malformed items; using empty list");
            Vec::new()
        }
    }
}

pub fn serialize<T: ListItem>(items: &[T]) -> serde_json::Result<String> {
    serde_json::to_string(items)
}

/// Append a todo. Blank text is ignored and returns `None`.
pub fn add_todo(items: &mut Vec<TodoItem>, text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let id = new_item_id();
    items.push(TodoItem {
        id: id.clone(),
        text: text.to_string(),
        completed: false,
    });
    Some(id)
}

/// Flip `completed` on the first todo with `id`. Returns whether one matched.
pub fn toggle_todo(items: &mut [TodoItem], id: &str) -> bool {
    match items.iter_mut().find(|t| t.id == id) {
        Some(todo) => {
            todo.completed = !todo.completed;
            true
        }
        None => false,
    }
}

/// Insert a schedule entry and re-sort. Blank time or description is ignored.
pub fn add_schedule_item(
    items: &mut Vec<ScheduleItem>,
    time: &str,
    description: &str,
) -> Option<String> {
    let (time, description) = (time.trim(), description.trim());
    if time.is_empty() || description.is_empty() {
        return None;
    }
    let id = new_item_id();
    items.push(ScheduleItem {
        id: id.clone(),
        time: time.to_string(),
        description: description.to_string(),
    });
    sort_schedule(items);
    Some(id)
}

/// Remove the first item with `id`. Returns whether one was removed.
pub fn delete_item<T: ListItem>(items: &mut Vec<T>, id: &str) -> bool {
    match items.iter().position(|item| item.id() == id) {
        Some(pos) => {
            items.remove(pos);
            true
        }
        None => false,
    }
}

/// Stable ascending sort by the raw time string ("9:00" sorts after "10:00").
pub fn sort_schedule(items: &mut [ScheduleItem]) {
    items.sort_by(|a, b| a.time.cmp(&b.time));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn todo(id: &str, text: &str, completed: bool) -> TodoItem {
        TodoItem {
            id: id.into(),
            text: text.into(),
            completed,
        }
    }

    fn slot(id: &str, time: &str, description: &str) -> ScheduleItem {
        ScheduleItem {
            id: id.into(),
            time: time.into(),
            description: description.into(),
        }
    }

    #[test]
    fn todos_round_trip_in_order() {
        let todos = vec![
            todo("b", "second thing first", true),
            todo("a", "Buy milk", false),
            todo("c", "Buy milk", false),
        ];
        let text = serialize(&todos).unwrap();
        assert_eq!(hydrate::<TodoItem>(Some(&text)), todos);
    }

    #[test]
    fn schedule_hydrates_sorted_whatever_the_stored_order() {
        let stored = vec![
            slot("1", "14:00", "Call"),
            slot("2", "08:30", "Gym"),
            slot("3", "11:15", "Review"),
        ];
        let text = serialize(&stored).unwrap();
        let times: Vec<_> = hydrate::<ScheduleItem>(Some(&text))
            .into_iter()
            .map(|s| s.time)
            .collect();
        assert_eq!(times, ["08:30", "11:15", "14:00"]);
    }

    #[test]
    fn empty_missing_and_malformed_text_hydrate_to_nothing() {
        assert!(hydrate::<TodoItem>(None).is_empty());
        assert!(hydrate::<TodoItem>(Some("")).is_empty());
        assert!(hydrate::<TodoItem>(Some("   ")).is_empty());
        assert!(hydrate::<TodoItem>(Some("{not an array}")).is_empty());
        assert!(hydrate::<TodoItem>(Some(r#"{"id":"1","text":"x"}"#)).is_empty());
        assert!(hydrate::<ScheduleItem>(Some(r#"[{"id":"1"}]"#)).is_empty());
    }

    #[test]
    fn jsonb_values_hydrate_including_legacy_text() {
        let arr = json!([{"id": "1", "text": "Water plants"}]);
        let todos = hydrate_value::<TodoItem>(arr);
        assert_eq!(todos, vec![todo("1", "Water plants", false)]);

        let legacy = Value::String(r#"[{"id":"1","time":"14:00","description":"Call"}]"#.into());
        assert_eq!(hydrate_value::<ScheduleItem>(legacy).len(), 1);

        assert!(hydrate_value::<TodoItem>(Value::Null).is_empty());
        assert!(hydrate_value::<TodoItem>(json!({"todos": []})).is_empty());
        assert!(hydrate_value::<TodoItem>(json!(42)).is_empty());
    }

    #[test]
    fn add_todo_appends_with_fresh_id_and_trims() {
        let mut todos = vec![todo("a", "first", false)];
        let id = add_todo(&mut todos, "  Buy milk ").expect("added");
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[1].id, id);
        assert_eq!(todos[1].text, "Buy milk");
        assert!(!todos[1].completed);
        assert_ne!(id, "a");
    }

    #[test]
    fn add_todo_ignores_whitespace() {
        let mut todos = vec![todo("a", "first", false)];
        let before = todos.clone();
        assert!(add_todo(&mut todos, " \t\n").is_none());
        assert_eq!(todos, before);
    }

    #[test]
    fn add_schedule_item_keeps_time_order() {
        let mut schedule =
            hydrate::<ScheduleItem>(Some(r#"[{"id":"1","time":"14:00","description":"Call"}]"#));
        add_schedule_item(&mut schedule, "09:00", "Standup").expect("added");
        let got: Vec<_> = schedule
            .iter()
            .map(|s| (s.time.as_str(), s.description.as_str()))
            .collect();
        assert_eq!(got, [("09:00", "Standup"), ("14:00", "Call")]);
    }

    #[test]
    fn add_schedule_item_requires_time_and_description() {
        let mut schedule = vec![slot("1", "14:00", "Call")];
        let before = schedule.clone();
        assert!(add_schedule_item(&mut schedule, "", "Standup").is_none());
        assert!(add_schedule_item(&mut schedule, "09:00", "   ").is_none());
        assert_eq!(schedule, before);
    }

    #[test]
    fn schedule_sort_is_lexicographic() {
        let mut schedule = vec![slot("1", "9:00", "late"), slot("2", "10:00", "early")];
        sort_schedule(&mut schedule);
        assert_eq!(schedule[0].time, "10:00");
    }

    #[test]
    fn toggle_flips_and_unknown_id_is_noop() {
        let mut todos = vec![todo("a", "one", false), todo("b", "two", true)];
        assert!(toggle_todo(&mut todos, "a"));
        assert!(todos[0].completed);
        assert!(toggle_todo(&mut todos, "a"));
        assert!(!todos[0].completed);

        let before = todos.clone();
        assert!(!toggle_todo(&mut todos, "zzz"));
        assert_eq!(todos, before);
    }

    #[test]
    fn duplicate_ids_only_touch_first_match() {
        let mut todos = vec![todo("dup", "one", false), todo("dup", "two", false)];
        toggle_todo(&mut todos, "dup");
        assert!(todos[0].completed);
        assert!(!todos[1].completed);

        assert!(delete_item(&mut todos, "dup"));
        assert_eq!(todos, vec![todo("dup", "two", false)]);
    }

    #[test]
    fn delete_unknown_id_is_noop() {
        let mut schedule = vec![slot("1", "14:00", "Call")];
        assert!(!delete_item(&mut schedule, "2"));
        assert_eq!(schedule.len(), 1);
        assert!(delete_item(&mut schedule, "1"));
        assert!(schedule.is_empty());
    }
}
