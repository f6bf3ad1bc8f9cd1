use time::Date;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::lists::sort_schedule;
use super::model::{new_item_id, DailyPlan};
use super::repo::PlanStore;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("sign in to load or save plans")]
    NotAuthenticated,
    #[error("invalid plan: {0}")]
    Invalid(String),
    #[error("failed to load plan: {0:#}")]
    Load(anyhow::Error),
    #[error("failed to save plan: {0:#}")]
    Save(anyhow::Error),
}

/// Fetch the plan for (`user`, `date`), or an unsaved empty default when the
/// day has no record. A store failure returns no plan at all.
pub async fn load_plan(
    store: &dyn PlanStore,
    user: Option<Uuid>,
    date: Date,
) -> Result<DailyPlan, SyncError> {
    let user_id = user.ok_or(SyncError::NotAuthenticated)?;
    match store.find(user_id, date).await {
        Ok(Some(row)) => {
            debug!(%user_id, %date, "plan loaded");
            Ok(row.into())
        }
        Ok(None) => {
            debug!(%user_id, %date, "no plan stored; using empty default");
            Ok(DailyPlan::empty(user_id, date))
        }
        Err(e) => {
            error!(error = %e, %user_id, %date, "load plan failed");
            Err(SyncError::Load(e))
        }
    }
}

/// Write the whole plan for (`user`, `date`) and return what was stored.
pub async fn save_plan(
    store: &dyn PlanStore,
    user: Option<Uuid>,
    date: Date,
    mut plan: DailyPlan,
) -> Result<DailyPlan, SyncError> {
    let user_id = user.ok_or(SyncError::NotAuthenticated)?;
    plan.user_id = user_id;
    plan.plan_date = date;
    normalize(&mut plan)?;

    let row = store.upsert(&plan).await.map_err(|e| {
        error!(error = %e, %user_id, %date, "save plan failed");
        SyncError::Save(e)
    })?;
    info!(%user_id, %date, plan_id = %row.id, "plan saved");
    Ok(row.into())
}

/// Load, apply `edit`, and save only if `edit` reports a change.
pub async fn edit_plan<F>(
    store: &dyn PlanStore,
    user: Option<Uuid>,
    date: Date,
    edit: F,
) -> Result<DailyPlan, SyncError>
where
    F: FnOnce(&mut DailyPlan) -> bool,
{
    let mut plan = load_plan(store, user, date).await?;
    if !edit(&mut plan) {
        debug!(%date, stored = plan.is_persisted(), "edit was a no-op; nothing saved");
        return Ok(plan);
    }
    save_plan(store, user, date, plan).await
}

fn normalize(plan: &mut DailyPlan) -> Result<(), SyncError> {
    if i32::try_from(plan.water_intake_glasses).is_err() {
        return Err(SyncError::Invalid("water_intake_glasses is too large".into()));
    }
    for todo in &mut plan.todos {
        if todo.text.trim().is_empty() {
            return Err(SyncError::Invalid("todo text must not be empty".into()));
        }
        if todo.id.trim().is_empty() {
            todo.id = new_item_id();
        }
    }
    for item in &mut plan.schedule {
        if item.time.trim().is_empty() || item.description.trim().is_empty() {
            return Err(SyncError::Invalid(
                "schedule entries need a time and a description".into(),
            ));
        }
        if item.id.trim().is_empty() {
            item.id = new_item_id();
        }
    }
    sort_schedule(&mut plan.schedule);
    Ok(())
}
