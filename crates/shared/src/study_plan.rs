//! Lenient parsing of model-generated study plans. Generators wrap their
//! JSON in code fences or fall back to single-quoted object literals often
//! enough that strict parsing alone loses usable plans; the normalization
//! here recovers those without ever evaluating model output as code.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPlan {
    pub title: String,
    pub priority: String,
    pub tasks: Vec<StudyPlanTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPlanTask {
    pub title: String,
    pub duration: String,
}

/// `ParseError` is a degraded success: the caller gets the raw text back
/// to salvage manually, and the overall request still completes.
#[derive(Debug, Clone)]
pub enum StudyPlanOutcome {
    Success {
        plan: StudyPlan,
        tokens_used: u32,
        model: String,
    },
    ParseError {
        raw_content: String,
        error: String,
        tokens_used: u32,
        model: String,
    },
}

#[derive(Debug, Error)]
enum PlanValidationError {
    #[error("plan must be a JSON object")]
    NotAnObject,
    #[error("plan is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("plan field `{0}` must be a non-empty string")]
    InvalidField(&'static str),
    #[error("`tasks` must be an array")]
    TasksNotArray,
    #[error("task {0} must be an object")]
    TaskNotObject(usize),
    #[error("task {index} has an empty or missing `{field}`")]
    InvalidTaskField { index: usize, field: &'static str },
}

pub fn parse_study_plan(raw_content: &str, tokens_used: u32, model: &str) -> StudyPlanOutcome {
    match parse_plan_text(raw_content) {
        Ok(plan) => StudyPlanOutcome::Success {
            plan,
            tokens_used,
            model: model.to_string(),
        },
        Err(error) => StudyPlanOutcome::ParseError {
            raw_content: raw_content.to_string(),
            error,
            tokens_used,
            model: model.to_string(),
        },
    }
}

fn parse_plan_text(raw_content: &str) -> Result<StudyPlan, String> {
    let stripped = strip_code_fence(raw_content);

    let value = match serde_json::from_str::<Value>(stripped) {
        Ok(value) => value,
        Err(strict_err) => {
            let normalized = normalize_quotes(stripped);
            serde_json::from_str::<Value>(&normalized)
                .map_err(|_| format!("invalid JSON: {strict_err}"))?
        }
    };

    validate_plan(&value).map_err(|err| err.to_string())
}

fn strip_code_fence(value: &str) -> &str {
    let trimmed = value.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // The fence line may carry a language tag; drop the whole line.
    let Some(newline) = rest.find('\n') else {
        return trimmed;
    };
    let body = rest[newline + 1..].trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Rewrites single-quoted strings to double-quoted JSON strings. Quote
/// characters inside an already double-quoted string are left untouched.
fn normalize_quotes(value: &str) -> String {
    let mut normalized = String::with_capacity(value.len());
    let mut chars = value.chars();
    let mut in_double = false;
    let mut in_single = false;

    while let Some(ch) = chars.next() {
        if in_double {
            normalized.push(ch);
            match ch {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        normalized.push(escaped);
                    }
                }
                '"' => in_double = false,
                _ => {}
            }
        } else if in_single {
            match ch {
                '\\' => match chars.next() {
                    // \' inside a single-quoted string is a plain quote.
                    Some('\'') => normalized.push('\''),
                    Some(escaped) => {
                        normalized.push('\\');
                        normalized.push(escaped);
                    }
                    None => normalized.push('\\'),
                },
                '\'' => {
                    normalized.push('"');
                    in_single = false;
                }
                '"' => normalized.push_str("\\\""),
                _ => normalized.push(ch),
            }
        } else {
            match ch {
                '"' => {
                    normalized.push(ch);
                    in_double = true;
                }
                '\'' => {
                    normalized.push('"');
                    in_single = true;
                }
                _ => normalized.push(ch),
            }
        }
    }

    normalized
}

fn validate_plan(value: &Value) -> Result<StudyPlan, PlanValidationError> {
    let object = value.as_object().ok_or(PlanValidationError::NotAnObject)?;

    let title = object
        .get("title")
        .ok_or(PlanValidationError::MissingField("title"))?
        .as_str()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .ok_or(PlanValidationError::InvalidField("title"))?
        .to_string();

    let priority = object
        .get("priority")
        .ok_or(PlanValidationError::MissingField("priority"))?;
    let priority = value_as_text(priority).ok_or(PlanValidationError::InvalidField("priority"))?;

    let tasks_value = object
        .get("tasks")
        .ok_or(PlanValidationError::MissingField("tasks"))?;
    let tasks_array = tasks_value
        .as_array()
        .ok_or(PlanValidationError::TasksNotArray)?;

    let mut tasks = Vec::with_capacity(tasks_array.len());
    for (index, task_value) in tasks_array.iter().enumerate() {
        let task = task_value
            .as_object()
            .ok_or(PlanValidationError::TaskNotObject(index))?;

        let task_title = task
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .ok_or(PlanValidationError::InvalidTaskField {
                index,
                field: "title",
            })?
            .to_string();

        let duration = task
            .get("duration")
            .and_then(value_as_text)
            .ok_or(PlanValidationError::InvalidTaskField {
                index,
                field: "duration",
            })?;

        tasks.push(StudyPlanTask {
            title: task_title,
            duration,
        });
    }

    Ok(StudyPlan {
        title,
        priority,
        tasks,
    })
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
