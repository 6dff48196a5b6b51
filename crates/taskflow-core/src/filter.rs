use std::fmt;
use std::str::FromStr;

use serde::{
  Deserialize,
  Serialize
};

use crate::error::TaskError;
use crate::task::{
  Priority,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Completed,
  High
}

impl StatusFilter {
  pub const ALL: [StatusFilter; 4] = [
    StatusFilter::All,
    StatusFilter::Active,
    StatusFilter::Completed,
    StatusFilter::High
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | StatusFilter::All => "all",
      | StatusFilter::Active => "active",
      | StatusFilter::Completed => {
        "completed"
      }
      | StatusFilter::High => "high"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | StatusFilter::All => "All",
      | StatusFilter::Active => "Active",
      | StatusFilter::Completed => "Done",
      | StatusFilter::High => {
        "High Priority"
      }
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Active => {
        !task.completed
      }
      | StatusFilter::Completed => {
        task.completed
      }
      | StatusFilter::High => {
        task.priority == Priority::High
      }
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StatusFilter {
  type Err = TaskError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" | "" => {
        Ok(StatusFilter::All)
      }
      | "active" | "pending" => {
        Ok(StatusFilter::Active)
      }
      | "completed" | "done" => {
        Ok(StatusFilter::Completed)
      }
      | "high" => {
        Ok(StatusFilter::High)
      }
      | other => Err(
        TaskError::InvalidFilter(
          other.to_string()
        )
      )
    }
  }
}

/// The list narrowing a session is
/// currently looking at: a status
/// filter and a free-text query.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct TaskFilter {
  status: StatusFilter,
  query:  String
}

impl TaskFilter {
  pub fn new(
    status: StatusFilter,
    query: &str
  ) -> Self {
    let mut filter = Self {
      status,
      query: String::new()
    };
    filter.set_query(query);
    filter
  }

  pub fn status(&self) -> StatusFilter {
    self.status
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn set_status(
    &mut self,
    status: StatusFilter
  ) {
    self.status = status;
  }

  pub fn set_query(
    &mut self,
    query: &str
  ) {
    self.query = query.trim().to_string();
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    self.status.matches(task)
      && matches_query(
        task,
        &self.query.to_lowercase()
      )
  }

  /// Status first, then text. Keeps
  /// input order.
  pub fn apply(
    &self,
    tasks: &[Task]
  ) -> Vec<Task> {
    let q = self.query.to_lowercase();
    tasks
      .iter()
      .filter(|task| {
        self.status.matches(task)
      })
      .filter(|task| {
        matches_query(task, &q)
      })
      .cloned()
      .collect()
  }
}

fn matches_query(
  task: &Task,
  lowered_query: &str
) -> bool {
  if lowered_query.is_empty() {
    return true;
  }
  task
    .title
    .to_lowercase()
    .contains(lowered_query)
    || task
      .description
      .to_lowercase()
      .contains(lowered_query)
    || task.tags.iter().any(|tag| {
      tag
        .to_lowercase()
        .contains(lowered_query)
    })
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::*;
  use crate::task::new_task_id;

  fn task(
    title: &str,
    completed: bool
  ) -> Task {
    Task {
      id: new_task_id(),
      title: title.to_string(),
      description: String::new(),
      date: None,
      priority: Priority::Low,
      tags: vec![],
      completed,
      created_at: Utc
        .with_ymd_and_hms(
          2026, 1, 1, 0, 0, 0
        )
        .unwrap(),
      order: 0
    }
  }

  #[test]
  fn status_and_query_combine() {
    let done = task("Buy milk", true);
    let open = task("Buy milk", false);
    let other = task("Walk dog", true);
    let tasks =
      vec![open, done.clone(), other];

    let filter = TaskFilter::new(
      StatusFilter::Completed,
      "milk"
    );
    assert_eq!(
      filter.apply(&tasks),
      vec![done]
    );
  }

  #[test]
  fn query_is_trimmed_and_case_insensitive()
   {
    let mut a = task("Quarterly REPORT", false);
    a.description =
      "numbers".to_string();
    let mut b = task("Groceries", false);
    b.tags =
      vec!["Errands".to_string()];
    let mut c = task("Call", false);
    c.description =
      "about the report".to_string();
    let tasks =
      vec![a.clone(), b.clone(), c.clone()];

    let mut filter =
      TaskFilter::default();
    filter.set_query("  report ");
    assert_eq!(filter.query(), "report");
    assert_eq!(
      filter.apply(&tasks),
      vec![a, c]
    );

    filter.set_query("ERRAND");
    assert_eq!(
      filter.apply(&tasks),
      vec![b]
    );
  }

  #[test]
  fn each_status_keeps_its_tasks() {
    let mut high = task("h", false);
    high.priority = Priority::High;
    let done = task("d", true);
    let open = task("o", false);
    let tasks = vec![
      high.clone(),
      done.clone(),
      open.clone(),
    ];

    let run = |status| {
      TaskFilter::new(status, "")
        .apply(&tasks)
        .into_iter()
        .map(|t| t.title)
        .collect::<Vec<_>>()
    };
    assert_eq!(
      run(StatusFilter::All),
      vec!["h", "d", "o"]
    );
    assert_eq!(
      run(StatusFilter::Active),
      vec!["h", "o"]
    );
    assert_eq!(
      run(StatusFilter::Completed),
      vec!["d"]
    );
    assert_eq!(
      run(StatusFilter::High),
      vec!["h"]
    );
    assert_eq!(tasks.len(), 3);
  }

  #[test]
  fn parses_filter_names() {
    assert_eq!(
      "Completed"
        .parse::<StatusFilter>()
        .unwrap(),
      StatusFilter::Completed
    );
    assert!(
      "urgent"
        .parse::<StatusFilter>()
        .is_err()
    );
  }
}
