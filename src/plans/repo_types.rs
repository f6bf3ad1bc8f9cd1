use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::lists::hydrate_value;
use super::model::DailyPlan;

/// A `daily_plans` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_date: Date,
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    pub snacks: String,
    pub mood: String,
    pub weather: String,
    pub notes: String,
    pub high_level_note: String,
    pub water_intake_glasses: i32,
    pub todos: serde_json::Value,    // JSONB array of TodoItem
    pub schedule: serde_json::Value, // JSONB array of ScheduleItem
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<PlanRow> for DailyPlan {
    fn from(r: PlanRow) -> Self {
        Self {
            id: Some(r.id),
            user_id: r.user_id,
            plan_date: r.plan_date,
            breakfast: r.breakfast,
            lunch: r.lunch,
            dinner: r.dinner,
            snacks: r.snacks,
            mood: r.mood,
            weather: r.weather,
            notes: r.notes,
            high_level_note: r.high_level_note,
            water_intake_glasses: u32::try_from(r.water_intake_glasses).unwrap_or(0),
            todos: hydrate_value(r.todos),
            schedule: hydrate_value(r.schedule),
            created_at: Some(r.created_at),
            updated_at: Some(r.updated_at),
        }
    }
}

/// Per-day digest used by the history listing.
#[derive(Debug, Clone, FromRow)]
pub struct PlanSummaryRow {
    pub plan_date: Date,
    pub mood: String,
    pub high_level_note: String,
    pub todos: serde_json::Value,
    pub schedule: serde_json::Value,
    pub updated_at: OffsetDateTime,
}
