use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(plan_date_format, Date, "[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` calendar date as used in plan URLs.
pub fn parse_plan_date(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
}

pub fn format_plan_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Fresh opaque id for a todo or schedule entry.
pub fn new_item_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: String,
    /// `HH:MM`, compared as a plain string.
    pub time: String,
    pub description: String,
}

/// One user's plan for one calendar day.
///
/// `id`, `created_at` and `updated_at` are only set once the record has been
/// stored; an empty default for a day without a saved plan has none of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPlan {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    #[serde(with = "plan_date_format")]
    pub plan_date: Date,
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    pub snacks: String,
    pub mood: String,
    pub weather: String,
    pub notes: String,
    pub high_level_note: String,
    pub water_intake_glasses: u32,
    pub todos: Vec<TodoItem>,
    pub schedule: Vec<ScheduleItem>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl DailyPlan {
    pub fn empty(user_id: Uuid, plan_date: Date) -> Self {
        Self {
            id: None,
            user_id,
            plan_date,
            breakfast: String::new(),
            lunch: String::new(),
            dinner: String::new(),
            snacks: String::new(),
            mood: String::new(),
            weather: String::new(),
            notes: String::new(),
            high_level_note: String::new(),
            water_intake_glasses: 0,
            todos: Vec::new(),
            schedule: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
