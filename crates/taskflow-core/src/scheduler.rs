use std::cell::Cell;
use std::rc::Rc;

use chrono::{
  DateTime,
  Duration,
  Local,
  NaiveDate,
  Utc
};
use tracing::trace;

pub const DEFAULT_DEBOUNCE_MS: u64 =
  300;

pub trait Clock {
  fn now(&self) -> DateTime<Utc>;

  /// The current calendar day in the
  /// host's local time zone.
  fn today(&self) -> NaiveDate {
    self
      .now()
      .with_timezone(&Local)
      .date_naive()
  }
}

#[derive(
  Debug, Clone, Copy, Default,
)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A clock that only moves when told
/// to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
  now: Rc<Cell<DateTime<Utc>>>
}

impl ManualClock {
  pub fn new(
    start: DateTime<Utc>
  ) -> Self {
    Self {
      now: Rc::new(Cell::new(start))
    }
  }

  pub fn advance(
    &self,
    by: Duration
  ) {
    self.now.set(self.now.get() + by);
  }

  pub fn advance_ms(&self, ms: i64) {
    self.advance(
      Duration::milliseconds(ms)
    );
  }

  pub fn set(
    &self,
    now: DateTime<Utc>
  ) {
    self.now.set(now);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    self.now.get()
  }

  fn today(&self) -> NaiveDate {
    self.now.get().date_naive()
  }
}

/// A single deferred write. Scheduling
/// again before the deadline replaces
/// the deadline, so a burst of edits
/// produces one write.
#[derive(Debug, Clone)]
pub struct PersistScheduler {
  delay:    Duration,
  deadline: Option<DateTime<Utc>>
}

impl PersistScheduler {
  pub fn new(delay_ms: u64) -> Self {
    let delay_ms = i64::try_from(
      delay_ms
    )
    .unwrap_or(i64::MAX / 1_000_000);
    Self {
      delay:    Duration::milliseconds(
        delay_ms
      ),
      deadline: None
    }
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  pub fn schedule(
    &mut self,
    now: DateTime<Utc>
  ) {
    let deadline = now + self.delay;
    trace!(%deadline, replaced = self.deadline.is_some(), "write scheduled");
    self.deadline = Some(deadline);
  }

  pub fn is_pending(&self) -> bool {
    self.deadline.is_some()
  }

  pub fn deadline(
    &self
  ) -> Option<DateTime<Utc>> {
    self.deadline
  }

  /// Clears the deadline and returns
  /// true once it has been reached.
  pub fn take_due(
    &mut self,
    now: DateTime<Utc>
  ) -> bool {
    match self.deadline {
      | Some(deadline)
        if now >= deadline =>
      {
        self.deadline = None;
        true
      }
      | _ => false
    }
  }

  /// Cancels the deadline, returning
  /// whether a write was pending.
  pub fn flush_now(&mut self) -> bool {
    self.deadline.take().is_some()
  }
}

impl Default for PersistScheduler {
  fn default() -> Self {
    Self::new(DEFAULT_DEBOUNCE_MS)
  }
}
