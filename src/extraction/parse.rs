use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::ExtractionError;
use crate::plans::lists::sort_schedule;
use crate::plans::model::{new_item_id, DailyPlan, ScheduleItem, TodoItem};

pub const RAW_TEXT_START: &str = "--- unparsed planner scan ---";
pub const RAW_TEXT_END: &str = "--- end of scan ---";

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?is)```[ \t]*(json)?[ \t]*\r?\n(.*?)```").expect("fence regex compiles");
    static ref TIMED_LINE: Regex =
        Regex::new(r"^\s*(\d{1,2}:\d{2})\s*[-–:]?\s*(.+?)\s*$").expect("time regex compiles");
    static ref LIST_BULLET: Regex =
        Regex::new(r"^\s*(?:[-*•]|\d+[.)]|\[[ xX]?\])\s*").expect("bullet regex compiles");
}

/// What the model recognised. `None` means "not found, keep what you have".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlanPatch {
    pub breakfast: Option<String>,
    pub lunch: Option<String>,
    pub dinner: Option<String>,
    pub snacks: Option<String>,
    pub mood: Option<String>,
    pub weather: Option<String>,
    pub notes: Option<String>,
    pub high_level_note: Option<String>,
    pub water_intake_glasses: Option<u32>,
    pub todos: Option<Vec<String>>,
    pub schedule: Option<Vec<ExtractedSlot>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSlot {
    pub time: String,
    pub description: String,
}

/// Pick the JSON candidate out of a model reply: a fenced block when there is
/// one (a `json`-tagged fence wins over a bare one), otherwise the whole text.
pub fn locate_json(text: &str) -> &str {
    let mut bare = None;
    for caps in FENCED_BLOCK.captures_iter(text) {
        let Some(body) = caps.get(2) else { continue };
        if caps.get(1).is_some() {
            return body.as_str().trim();
        }
        bare.get_or_insert(body.as_str().trim());
    }
    bare.unwrap_or_else(|| text.trim())
}

pub fn parse_patch(text: &str) -> Result<PlanPatch, ExtractionError> {
    let candidate = locate_json(text);
    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| ExtractionError::Unparseable(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(ExtractionError::Unparseable(
            "expected a JSON object".into(),
        ));
    };

    Ok(PlanPatch {
        breakfast: text_field(&obj, "breakfast"),
        lunch: text_field(&obj, "lunch"),
        dinner: text_field(&obj, "dinner"),
        snacks: text_field(&obj, "snacks"),
        mood: text_field(&obj, "mood"),
        weather: text_field(&obj, "weather"),
        notes: text_field(&obj, "notes"),
        high_level_note: text_field(&obj, "high_level_note"),
        water_intake_glasses: obj.get("water_intake_glasses").and_then(glasses),
        todos: obj.get("todos").and_then(todo_texts),
        schedule: obj.get("schedule").and_then(slots),
    })
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let lines: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().and_then(non_blank))
                .collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        _ => None,
    }
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn glasses(v: &Value) -> Option<u32> {
    let n = match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|n| *n > 0)
}

fn todo_texts(v: &Value) -> Option<Vec<String>> {
    let texts: Vec<String> = match v {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => non_blank(s),
                Value::Object(o) => ["text", "task", "title"]
                    .iter()
                    .find_map(|k| o.get(*k).and_then(Value::as_str).and_then(non_blank)),
                _ => None,
            })
            .collect(),
        Value::String(s) => s
            .lines()
            .filter_map(|line| non_blank(&LIST_BULLET.replace(line, "")))
            .collect(),
        _ => return None,
    };
    (!texts.is_empty()).then_some(texts)
}

fn slots(v: &Value) -> Option<Vec<ExtractedSlot>> {
    let found: Vec<ExtractedSlot> = match v {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let o = item.as_object()?;
                let time = o.get("time").and_then(Value::as_str).and_then(non_blank)?;
                let description = ["description", "activity", "event"]
                    .iter()
                    .find_map(|k| o.get(*k).and_then(Value::as_str).and_then(non_blank))?;
                Some(ExtractedSlot { time, description })
            })
            .collect(),
        Value::String(s) => s
            .lines()
            .filter_map(|line| {
                let caps = TIMED_LINE.captures(line)?;
                Some(ExtractedSlot {
                    time: caps.get(1)?.as_str().to_string(),
                    description: caps.get(2)?.as_str().to_string(),
                })
            })
            .collect(),
        _ => return None,
    };
    (!found.is_empty()).then_some(found)
}

/// Fold a patch into a draft. Present fields replace, absent ones stay.
pub fn apply_patch(mut plan: DailyPlan, patch: PlanPatch) -> DailyPlan {
    fn set(slot: &mut String, value: Option<String>) {
        if let Some(v) = value {
            *slot = v;
        }
    }

    set(&mut plan.breakfast, patch.breakfast);
    set(&mut plan.lunch, patch.lunch);
    set(&mut plan.dinner, patch.dinner);
    set(&mut plan.snacks, patch.snacks);
    set(&mut plan.mood, patch.mood);
    set(&mut plan.weather, patch.weather);
    set(&mut plan.notes, patch.notes);
    set(&mut plan.high_level_note, patch.high_level_note);
    if let Some(n) = patch.water_intake_glasses {
        plan.water_intake_glasses = n;
    }
    if let Some(texts) = patch.todos {
        plan.todos = texts
            .into_iter()
            .map(|text| TodoItem {
                id: new_item_id(),
                text,
                completed: false,
            })
            .collect();
    }
    if let Some(found) = patch.schedule {
        plan.schedule = found
            .into_iter()
            .map(|s| ScheduleItem {
                id: new_item_id(),
                time: s.time,
                description: s.description,
            })
            .collect();
        sort_schedule(&mut plan.schedule);
    }
    plan
}

/// Keep an unreadable reply by appending it to the notes between markers.
pub fn append_raw_text(mut plan: DailyPlan, raw: &str) -> DailyPlan {
    let block = format!("{RAW_TEXT_START}\n{}\n{RAW_TEXT_END}", raw.trim());
    if plan.notes.trim().is_empty() {
        plan.notes = block;
    } else {
        plan.notes = format!("{}\n\n{block}", plan.notes.trim_end());
    }
    plan
}

/// Merge a model reply into `plan`. On failure the reply lands in the notes
/// and the parse error is returned alongside the plan.
pub fn merge_reply(plan: DailyPlan, reply: &str) -> (DailyPlan, Option<ExtractionError>) {
    match parse_patch(reply) {
        Ok(patch) => {
            debug!(?patch, "extraction patch parsed");
            (apply_patch(plan, patch), None)
        }
        Err(e) => {
            warn!(error = %e, "extraction reply was not usable JSON");
            (append_raw_text(plan, reply), Some(e))
        }
    }
}
