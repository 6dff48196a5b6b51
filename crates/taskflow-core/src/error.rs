use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
  #[error("task title must not be empty")]
  EmptyTitle,

  #[error("no task matches id {0}")]
  NotFound(String),

  #[error(
    "id prefix {prefix} is ambiguous \
     ({matches} tasks match)"
  )]
  AmbiguousId {
    prefix:  String,
    matches: usize
  },

  #[error(
    "invalid date {0:?}; expected \
     YYYY-MM-DD"
  )]
  InvalidDate(String),

  #[error("invalid priority {0:?}")]
  InvalidPriority(String),

  #[error("invalid filter {0:?}")]
  InvalidFilter(String)
}
