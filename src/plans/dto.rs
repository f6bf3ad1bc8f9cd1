use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::lists::hydrate_value;
use super::model::{format_plan_date, DailyPlan, ScheduleItem, TodoItem};
use super::repo_types::PlanSummaryRow;

/// Body of `PUT /plans/:date`: the full record, every field optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SavePlanRequest {
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
}

impl SavePlanRequest {
    pub fn into_plan(self, user_id: Uuid, plan_date: Date) -> DailyPlan {
        DailyPlan {
            breakfast: self.breakfast,
            lunch: self.lunch,
            dinner: self.dinner,
            snacks: self.snacks,
            mood: self.mood,
            weather: self.weather,
            notes: self.notes,
            high_level_note: self.high_level_note,
            water_intake_glasses: self.water_intake_glasses,
            todos: self.todos,
            schedule: self.schedule,
            ..DailyPlan::empty(user_id, plan_date)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddTodoRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AddScheduleItemRequest {
    pub time: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub plan_date: String,
    pub mood: String,
    pub high_level_note: String,
    pub todo_count: usize,
    pub completed_count: usize,
    pub schedule_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<PlanSummaryRow> for PlanSummary {
    fn from(r: PlanSummaryRow) -> Self {
        let todos: Vec<TodoItem> = hydrate_value(r.todos);
        let schedule: Vec<ScheduleItem> = hydrate_value(r.schedule);
        Self {
            plan_date: format_plan_date(r.plan_date),
            mood: r.mood,
            high_level_note: r.high_level_note,
            todo_count: todos.len(),
            completed_count: todos.iter().filter(|t| t.completed).count(),
            schedule_count: schedule.len(),
            updated_at: r.updated_at,
        }
    }
}
