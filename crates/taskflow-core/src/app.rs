use chrono::{
  DateTime,
  Utc
};
use tracing::{
  debug,
  info
};

use crate::config::Config;
use crate::error::TaskError;
use crate::filter::{
  StatusFilter,
  TaskFilter
};
use crate::scheduler::{
  Clock,
  PersistScheduler
};
use crate::stats::{
  Stats,
  compute_stats
};
use crate::storage::KeyValueStorage;
use crate::store::TaskStore;
use crate::task::{
  NewTask,
  Priority,
  Task,
  TaskPatch,
  parse_iso_date,
  parse_tag_list
};
use crate::theme::{
  self,
  Theme
};
use crate::view::{
  Element,
  TaskHandlers,
  render_stats,
  render_tasks
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
  Create,
  Edit(String)
}

/// Raw values of the add/edit form, as
/// typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
  pub title:       String,
  pub description: String,
  pub date:        String,
  pub priority:    Priority,
  pub tags:        String
}

impl Default for TaskForm {
  fn default() -> Self {
    Self {
      title:       String::new(),
      description: String::new(),
      date:        String::new(),
      priority:    Priority::Low,
      tags:        String::new()
    }
  }
}

impl TaskForm {
  pub fn from_task(task: &Task) -> Self {
    Self {
      title:       task.title.clone(),
      description: task
        .description
        .clone(),
      date:        task
        .date
        .map(|d| {
          d.format("%Y-%m-%d").to_string()
        })
        .unwrap_or_default(),
      priority:    task.priority,
      tags:        task.tags.join(", ")
    }
  }

  fn to_new_task(
    &self
  ) -> Result<NewTask, TaskError> {
    let title = self.title.trim();
    if title.is_empty() {
      return Err(TaskError::EmptyTitle);
    }
    Ok(NewTask {
      title:       title.to_string(),
      description: self
        .description
        .clone(),
      date:        parse_iso_date(
        &self.date
      )?,
      priority:    Some(self.priority),
      tags:        parse_tag_list(
        &self.tags
      )
    })
  }

  fn to_patch(
    &self
  ) -> Result<TaskPatch, TaskError> {
    let fields = self.to_new_task()?;
    Ok(TaskPatch {
      title:       Some(fields.title),
      description: Some(
        fields.description
      ),
      date:        Some(fields.date),
      priority:    fields.priority,
      tags:        Some(fields.tags),
      completed:   None
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
  pub mode: EditorMode,
  pub form: TaskForm
}

impl Editor {
  pub fn heading(&self) -> &'static str {
    match self.mode {
      | EditorMode::Create => "New Task",
      | EditorMode::Edit(_) => {
        "Edit Task"
      }
    }
  }

  pub fn submit_label(
    &self
  ) -> &'static str {
    match self.mode {
      | EditorMode::Create => "Add Task",
      | EditorMode::Edit(_) => "Update"
    }
  }
}

/// Everything a host needs to draw one
/// frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
  pub stats:          Stats,
  pub stats_grid:     Element,
  pub task_list:      Element,
  pub filter:         StatusFilter,
  pub query:          String,
  pub theme:          Theme,
  pub editor:         Option<Editor>,
  pub confirm_delete: Option<String>
}

/// Session orchestration: routes user
/// gestures to the store and produces
/// the next view.
#[derive(Debug)]
pub struct App<S, C> {
  store:          TaskStore<S, C>,
  filter:         TaskFilter,
  theme:          Theme,
  editor:         Option<Editor>,
  pending_delete: Option<String>
}

impl<S: KeyValueStorage, C: Clock>
  App<S, C>
{
  #[tracing::instrument(skip_all)]
  pub fn new(
    storage: S,
    clock: C,
    cfg: &Config,
    prefers_dark: bool
  ) -> anyhow::Result<Self> {
    let keys = cfg.storage_keys();
    let scheduler =
      PersistScheduler::new(
        cfg.debounce_ms()?
      );
    let theme = theme::load_theme(
      &storage,
      &keys,
      prefers_dark
    );
    let mut store = TaskStore::new(
      storage, clock, keys, scheduler
    );
    let count = store.init();
    info!(
      count,
      %theme,
      "session started"
    );

    Ok(Self {
      store,
      filter: TaskFilter::default(),
      theme,
      editor: None,
      pending_delete: None
    })
  }

  pub fn store(
    &self
  ) -> &TaskStore<S, C> {
    &self.store
  }

  pub fn store_mut(
    &mut self
  ) -> &mut TaskStore<S, C> {
    &mut self.store
  }

  pub fn filter(&self) -> &TaskFilter {
    &self.filter
  }

  pub fn theme(&self) -> Theme {
    self.theme
  }

  pub fn editor(
    &self
  ) -> Option<&Editor> {
    self.editor.as_ref()
  }

  pub fn pending_delete(
    &self
  ) -> Option<&str> {
    self.pending_delete.as_deref()
  }

  /// Full list through the filter for
  /// the cards; full list for the
  /// numbers.
  pub fn refresh(&self) -> View {
    let all = self.store.get_all();
    let today = self.store.clock().today();
    let visible = self.filter.apply(&all);
    let stats = compute_stats(&all, today);
    debug!(
      total = all.len(),
      visible = visible.len(),
      "view refreshed"
    );

    View {
      stats,
      stats_grid: render_stats(&stats),
      task_list: render_tasks(
        &visible, today
      ),
      filter: self.filter.status(),
      query: self.filter.query().to_string(),
      theme: self.theme,
      editor: self.editor.clone(),
      confirm_delete: self.pending_delete.clone()
    }
  }

  pub fn set_filter(
    &mut self,
    status: StatusFilter
  ) {
    self.filter.set_status(status);
  }

  pub fn set_query(
    &mut self,
    query: &str
  ) {
    self.filter.set_query(query);
  }

  /// Opens the form blank, or prefilled
  /// from an existing task. Unknown ids
  /// leave the editor closed.
  pub fn open_editor(
    &mut self,
    id: Option<&str>
  ) -> Option<&Editor> {
    self.editor = None;
    let editor = match id {
      | None => Editor {
        mode: EditorMode::Create,
        form: TaskForm::default()
      },
      | Some(id) => {
        let task = self.store.get_one(id)?;
        Editor {
          mode: EditorMode::Edit(
            task.id.clone()
          ),
          form: TaskForm::from_task(&task)
        }
      }
    };
    self.editor = Some(editor);
    self.editor.as_ref()
  }

  pub fn close_editor(&mut self) {
    self.editor = None;
  }

  /// Validates the form and adds or
  /// updates depending on how the editor
  /// was opened. The editor stays open
  /// when validation fails.
  #[tracing::instrument(skip(
    self, form
  ))]
  pub fn submit(
    &mut self,
    form: TaskForm
  ) -> Result<Task, TaskError> {
    let mode = self
      .editor
      .as_ref()
      .map(|editor| editor.mode.clone())
      .unwrap_or(EditorMode::Create);

    let saved = match mode {
      | EditorMode::Create => {
        self
          .store
          .add(form.to_new_task()?)?
      }
      | EditorMode::Edit(id) => {
        let patch = form.to_patch()?;
        self
          .store
          .update(&id, patch)
          .ok_or(TaskError::NotFound(id))?
      }
    };

    self.editor = None;
    Ok(saved)
  }

  pub fn confirm_delete(
    &mut self
  ) -> bool {
    match self.pending_delete.take() {
      | Some(id) => self.store.delete(&id),
      | None => false
    }
  }

  pub fn cancel_delete(&mut self) {
    self.pending_delete = None;
  }

  pub fn toggle_theme(
    &mut self
  ) -> Theme {
    self.theme = self.theme.toggled();
    let keys = self.store.keys().clone();
    theme::save_theme(
      self.store.storage_mut(),
      &keys,
      self.theme
    );
    self.theme
  }

  /// Escape key: closes whichever
  /// dialog is open.
  pub fn dismiss_dialogs(&mut self) {
    self.editor = None;
    self.pending_delete = None;
  }

  pub fn tick(&mut self) -> bool {
    self.store.tick()
  }

  pub fn next_write_at(
    &self
  ) -> Option<DateTime<Utc>> {
    self.store.scheduler().deadline()
  }

  /// Writes any deferred change before
  /// the host goes away.
  pub fn shutdown(&mut self) {
    if self.store.has_pending_write() {
      self.store.flush();
    }
  }
}

impl<S: KeyValueStorage, C: Clock>
  TaskHandlers for App<S, C>
{
  fn on_toggle(&mut self, id: &str) {
    self.store.toggle_complete(id);
  }

  fn on_edit(&mut self, id: &str) {
    self.open_editor(Some(id));
  }

  fn on_delete(&mut self, id: &str) {
    if self.store.get_one(id).is_some() {
      self.pending_delete =
        Some(id.to_string());
    }
  }

  fn on_drop(
    &mut self,
    dragged: &str,
    target: &str
  ) {
    self.store.reorder(dragged, target);
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::scheduler::ManualClock;
  use crate::storage::MemoryStorage;
  use crate::view::Gesture;

  fn app()
  -> App<MemoryStorage, ManualClock> {
    let clock = ManualClock::new(
      Utc
        .with_ymd_and_hms(
          2026, 7, 1, 10, 0, 0
        )
        .unwrap()
    );
    App::new(
      MemoryStorage::new(),
      clock,
      &Config::defaults(),
      false
    )
    .unwrap()
  }

  fn form(title: &str) -> TaskForm {
    TaskForm {
      title: title.to_string(),
      ..TaskForm::default()
    }
  }

  #[test]
  fn submit_rejects_blank_title_and_keeps_editor()
   {
    let mut app = app();
    app.open_editor(None);
    assert_eq!(
      app.submit(form("   ")),
      Err(TaskError::EmptyTitle)
    );
    assert!(app.editor().is_some());
    assert!(app.store().is_empty());
  }

  #[test]
  fn submit_rejects_bad_date() {
    let mut app = app();
    app.open_editor(None);
    let mut f = form("x");
    f.date = "07/01/2026".to_string();
    assert!(matches!(
      app.submit(f),
      Err(TaskError::InvalidDate(_))
    ));
  }

  #[test]
  fn create_then_edit_through_the_form()
   {
    let mut app = app();
    app.open_editor(None);
    let mut f = form(" Buy milk ");
    f.tags = "home, errands,".to_string();
    f.date = "2026-07-02".to_string();
    let task = app.submit(f).unwrap();
    assert!(app.editor().is_none());
    assert_eq!(
      task.tags,
      vec!["home", "errands"]
    );

    let editor =
      app.open_editor(Some(&task.id)).unwrap();
    assert_eq!(editor.heading(), "Edit Task");
    assert_eq!(
      editor.form.tags,
      "home, errands"
    );
    let mut f = editor.form.clone();
    f.priority = Priority::High;
    f.date.clear();
    let updated = app.submit(f).unwrap();
    assert_eq!(updated.id, task.id);
    assert_eq!(updated.priority, Priority::High);
    assert_eq!(updated.date, None);
    assert_eq!(app.store().len(), 1);
  }

  #[test]
  fn delete_needs_confirmation() {
    let mut app = app();
    app.open_editor(None);
    let task = app.submit(form("a")).unwrap();

    app.on_delete(&task.id);
    assert_eq!(
      app.refresh().confirm_delete,
      Some(task.id.clone())
    );
    app.cancel_delete();
    assert!(!app.confirm_delete());
    assert_eq!(app.store().len(), 1);

    app.on_delete(&task.id);
    assert!(app.confirm_delete());
    assert!(app.store().is_empty());
  }

  #[test]
  fn gestures_on_rendered_view_reach_the_store()
   {
    let mut app = app();
    app.open_editor(None);
    let b = app.submit(form("b")).unwrap();
    app.open_editor(None);
    let a = app.submit(form("a")).unwrap();

    let view = app.refresh();
    let cards: Vec<Element> = view
      .task_list
      .child_elements()
      .cloned()
      .collect();
    let checkbox = cards[0]
      .find_by_class("task-card__checkbox")
      .unwrap()
      .clone();
    assert!(
      checkbox
        .dispatch(&Gesture::Click, &mut app)
    );
    assert!(
      app
        .store()
        .get_one(&a.id)
        .unwrap()
        .completed
    );

    assert!(cards[0].dispatch(
      &Gesture::Drop {
        dragged: b.id.clone()
      },
      &mut app
    ));
    let titles: Vec<String> = app
      .store()
      .get_all()
      .into_iter()
      .map(|t| t.title)
      .collect();
    assert_eq!(titles, vec!["b", "a"]);
  }

  #[test]
  fn unknown_id_closes_an_open_editor() {
    let mut app = app();
    assert!(app.open_editor(None).is_some());
    assert!(
      app.open_editor(Some("missing")).is_none()
    );
    assert!(app.editor().is_none());
    assert!(app.refresh().editor.is_none());
  }

  #[test]
  fn refresh_filters_list_but_not_stats() {
    let mut app = app();
    for title in ["Buy milk", "Walk dog"] {
      app.open_editor(None);
      app.submit(form(title)).unwrap();
    }
    app.set_query("MILK");
    let view = app.refresh();
    assert_eq!(view.stats.total, 2);
    assert_eq!(
      view.task_list.child_elements().count(),
      1
    );

    app.set_filter(StatusFilter::Completed);
    let view = app.refresh();
    assert!(
      view
        .task_list
        .find_by_class("empty-state")
        .is_some()
    );
  }

  #[test]
  fn theme_toggle_persists_preference() {
    let mut app = app();
    assert_eq!(app.theme(), Theme::Light);
    assert_eq!(app.toggle_theme(), Theme::Dark);
    assert_eq!(
      app
        .store()
        .storage()
        .get_item("app_theme")
        .unwrap()
        .as_deref(),
      Some("dark")
    );
  }

  #[test]
  fn shutdown_flushes_pending_write() {
    let mut app = app();
    app.open_editor(None);
    app.submit(form("a")).unwrap();
    assert!(app.next_write_at().is_some());
    app.shutdown();
    assert!(app.next_write_at().is_none());
    assert!(
      app
        .store()
        .storage()
        .get_item("app_data")
        .unwrap()
        .is_some()
    );
  }
}
