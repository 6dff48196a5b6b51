use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    #[serde(other)]
    None,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Priority::None),
            "low" | "l" => Ok(Priority::Low),
            "medium" | "m" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            other => Err(TaskError::InvalidPriority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque; new tasks get a v4 UUID but stored ids are kept as written.
    #[serde(default = "new_task_id", deserialize_with = "lenient::id")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(
        default,
        serialize_with = "iso_date_serde::serialize",
        deserialize_with = "lenient::date"
    )]
    pub date: Option<NaiveDate>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub completed: bool,

    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub order: usize,
}

impl Task {
    /// Overdue means incomplete with a date strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.date.is_some_and(|date| date < today)
    }
}

pub fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "iso_date_serde")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update restricted to the mutable fields of a task.
///
/// `date` distinguishes "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "iso_date_serde::deserialize_patch")]
    pub date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Builds a patch from a loose JSON object. Keys outside the allow-list
    /// are dropped.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn clean_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Splits the comma separated tag field used by the task form.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    clean_tags(raw.split(','))
}

pub fn parse_iso_date(raw: &str) -> Result<Option<NaiveDate>, TaskError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, iso_date_serde::FORMAT)
        .map(Some)
        .map_err(|_| TaskError::InvalidDate(trimmed.to_string()))
}

/// Dates travel as `YYYY-MM-DD`, with the empty string meaning "no date".
pub mod iso_date_serde {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        parse(raw.as_deref()).map_err(serde::de::Error::custom)
    }

    pub fn deserialize_patch<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize(deserializer).map(Some)
    }

    fn parse(raw: Option<&str>) -> Result<Option<NaiveDate>, chrono::ParseError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, FORMAT).map(Some),
        }
    }
}

/// Readers for stored records written by other versions of the app. A field
/// in an unexpected shape falls back instead of costing the whole task.
mod lenient {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(raw) if !raw.trim().is_empty() => Ok(raw),
            Value::Number(number) => Ok(number.to_string()),
            _ => Ok(super::new_task_id()),
        }
    }

    pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(raw) => {
                NaiveDate::parse_from_str(raw.trim(), super::iso_date_serde::FORMAT).ok()
            }
            _ => None,
        })
    }

    pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(raw) => DateTime::parse_from_rfc3339(raw.trim())
                .map(|stamp| stamp.with_timezone(&Utc))
                .unwrap_or_default(),
            _ => DateTime::<Utc>::default(),
        })
    }
}
