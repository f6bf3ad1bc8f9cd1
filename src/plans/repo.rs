use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::lists;
use super::model::DailyPlan;
use super::repo_types::{PlanRow, PlanSummaryRow};

const PLAN_COLUMNS: &str = "id, user_id, plan_date, breakfast, lunch, dinner, snacks, mood, weather, \
     notes, high_level_note, water_intake_glasses, todos, schedule, created_at, updated_at";

/// Durable home of daily plans, keyed by (user, date).
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// `Ok(None)` when the user has no plan for that day.
    async fn find(&self, user_id: Uuid, plan_date: Date) -> anyhow::Result<Option<PlanRow>>;

    /// Insert or fully replace the plan for (`plan.user_id`, `plan.plan_date`).
    async fn upsert(&self, plan: &DailyPlan) -> anyhow::Result<PlanRow>;

    /// Saved days in `[from, to]`, oldest first.
    async fn list_range(
        &self,
        user_id: Uuid,
        from: Date,
        to: Date,
    ) -> anyhow::Result<Vec<PlanSummaryRow>>;
}

#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn find(&self, user_id: Uuid, plan_date: Date) -> anyhow::Result<Option<PlanRow>> {
        let sql = format!(
            "SELECT {PLAN_COLUMNS} FROM daily_plans WHERE user_id = $1 AND plan_date = $2"
        );
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(user_id)
            .bind(plan_date)
            .fetch_optional(&self.db)
            .await
            .context("select daily plan")?;
        Ok(row)
    }

    async fn upsert(&self, plan: &DailyPlan) -> anyhow::Result<PlanRow> {
        let water = i32::try_from(plan.water_intake_glasses)
            .context("water_intake_glasses out of range")?;
        let sql = format!(
            r#"
            INSERT INTO daily_plans (user_id, plan_date, breakfast, lunch, dinner, snacks, mood,
                                     weather, notes, high_level_note, water_intake_glasses,
                                     todos, schedule)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::jsonb, $13::jsonb)
            ON CONFLICT (user_id, plan_date) DO UPDATE
               SET breakfast            = EXCLUDED.breakfast,
                   lunch                = EXCLUDED.lunch,
                   dinner               = EXCLUDED.dinner,
                   snacks               = EXCLUDED.snacks,
                   mood                 = EXCLUDED.mood,
                   weather              = EXCLUDED.weather,
                   notes                = EXCLUDED.notes,
                   high_level_note      = EXCLUDED.high_level_note,
                   water_intake_glasses = EXCLUDED.water_intake_glasses,
                   todos                = EXCLUDED.todos,
                   schedule             = EXCLUDED.schedule,
                   updated_at           = now()
            RETURNING {PLAN_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(plan.user_id)
            .bind(plan.plan_date)
            .bind(&plan.breakfast)
            .bind(&plan.lunch)
            .bind(&plan.dinner)
            .bind(&plan.snacks)
            .bind(&plan.mood)
            .bind(&plan.weather)
            .bind(&plan.notes)
            .bind(&plan.high_level_note)
            .bind(water)
            .bind(lists::serialize(&plan.todos).context("encode todos")?)
            .bind(lists::serialize(&plan.schedule).context("encode schedule")?)
            .fetch_one(&self.db)
            .await
            .context("upsert daily plan")?;
        Ok(row)
    }

    async fn list_range(
        &self,
        user_id: Uuid,
        from: Date,
        to: Date,
    ) -> anyhow::Result<Vec<PlanSummaryRow>> {
        let rows = sqlx::query_as::<_, PlanSummaryRow>(
            r#"
            SELECT plan_date, mood, high_level_note, todos, schedule, updated_at
              FROM daily_plans
             WHERE user_id = $1
               AND plan_date BETWEEN $2 AND $3
             ORDER BY plan_date ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await
        .context("list daily plans")?;
        Ok(rows)
    }
}
