use tracing::{debug, error, info, warn};
use crate::error::TaskError;
use crate::scheduler::{Clock, PersistScheduler};
use crate::storage::{self, KeyValueStorage, StorageKeys};
use crate::task::{NewTask, Task, TaskPatch, clean_tags, new_task_id};

/// Owns the live task collection for a session and decides when it is
/// written back to storage.
///
/// The vector order is the display order; `order` fields mirror it and are
/// rewritten after every structural change.
#[derive(Debug)]
pub struct TaskStore<S, C> {
    storage: S,
    clock: C,
    keys: StorageKeys,
    scheduler: PersistScheduler,
    tasks: Vec<Task>,
}

impl<S: KeyValueStorage, C: Clock> TaskStore<S, C> {
    pub fn new(storage: S, clock: C, keys: StorageKeys, scheduler: PersistScheduler) -> Self {
        Self {
            storage,
            clock,
            keys,
            scheduler,
            tasks: Vec::new(),
        }
    }

    /// Replaces the in-memory collection with what storage holds.
    #[tracing::instrument(skip(self))]
    pub fn init(&mut self) -> usize {
        let mut tasks = storage::load_tasks(&mut self.storage, &self.keys.data());
        tasks.sort_by_key(|task| task.order);
        self.tasks = tasks;
        self.reindex();
        self.scheduler.flush_now();
        info!(count = self.tasks.len(), "task store initialised");
        self.tasks.len()
    }

    pub fn get_all(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn get_one(&self, id: &str) -> Option<Task> {
        self.tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Resolves a full id or a unique id prefix.
    pub fn resolve_id(&self, raw: &str) -> Result<String, TaskError> {
        let needle = raw.trim();
        if needle.is_empty() {
            return Err(TaskError::NotFound(raw.to_string()));
        }
        if self.position(needle).is_some() {
            return Ok(needle.to_string());
        }

        let needle = needle.to_ascii_lowercase();
        let matches: Vec<&str> = self
            .tasks
            .iter()
            .map(|task| task.id.as_str())
            .filter(|id| id.to_ascii_lowercase().starts_with(&needle))
            .collect();
        match matches.as_slice() {
            [] => Err(TaskError::NotFound(raw.to_string())),
            [id] => Ok(id.to_string()),
            many => Err(TaskError::AmbiguousId {
                prefix: raw.to_string(),
                matches: many.len(),
            }),
        }
    }

    #[tracing::instrument(skip(self, new_task), fields(title = %new_task.title.trim()))]
    pub fn add(&mut self, new_task: NewTask) -> Result<Task, TaskError> {
        let title = new_task.title.trim();
        if title.is_empty() {
            warn!("rejected task with empty title");
            return Err(TaskError::EmptyTitle);
        }

        let task = Task {
            id: new_task_id(),
            title: title.to_string(),
            description: new_task.description.trim().to_string(),
            date: new_task.date,
            priority: new_task.priority.unwrap_or_default(),
            tags: clean_tags(&new_task.tags),
            completed: false,
            created_at: self.clock.now(),
            order: 0,
        };

        self.tasks.insert(0, task);
        self.reindex();
        self.schedule_save();
        debug!(id = %self.tasks[0].id, count = self.tasks.len(), "task added");
        Ok(self.tasks[0].clone())
    }

    #[tracing::instrument(skip(self, patch), fields(id = %id))]
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Option<Task> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("update for unknown task ignored");
            return None;
        };

        if let Some(title) = patch.title {
            let title = title.trim();
            if title.is_empty() {
                warn!("ignoring empty title in update");
            } else {
                task.title = title.to_string();
            }
        }
        if let Some(description) = patch.description {
            task.description = description.trim().to_string();
        }
        if let Some(date) = patch.date {
            task.date = date;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(tags) = patch.tags {
            task.tags = clean_tags(&tags);
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }

        let updated = task.clone();
        self.schedule_save();
        Some(updated)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_complete(&mut self, id: &str) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;
        task.completed = !task.completed;
        let toggled = task.clone();
        self.schedule_save();
        debug!(completed = toggled.completed, "task toggled");
        Some(toggled)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(idx) = self.position(id) else {
            debug!("delete for unknown task ignored");
            return false;
        };
        self.tasks.remove(idx);
        self.reindex();
        self.schedule_save();
        true
    }

    /// Takes `moved` out of the list and puts it back directly in front of
    /// `target`, looking the target up again after the removal.
    #[tracing::instrument(skip(self), fields(moved = %moved, target = %target))]
    pub fn reorder(&mut self, moved: &str, target: &str) -> bool {
        let (Some(from), Some(_)) = (self.position(moved), self.position(target)) else {
            debug!("reorder with unknown task ignored");
            return false;
        };
        if moved == target {
            return true;
        }
        let task = self.tasks.remove(from);
        let to = self.position(target).unwrap_or(from);
        self.tasks.insert(to, task);
        self.reindex();
        self.schedule_save();
        true
    }

    /// Writes the collection if the debounce window has elapsed.
    pub fn tick(&mut self) -> bool {
        if self.scheduler.take_due(self.clock.now()) {
            self.write();
            true
        } else {
            false
        }
    }

    /// Writes the collection now, cancelling any pending deferred write.
    #[tracing::instrument(skip(self))]
    pub fn flush(&mut self) {
        let was_pending = self.scheduler.flush_now();
        debug!(was_pending, "flushing task store");
        self.write();
    }

    pub fn has_pending_write(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn scheduler(&self) -> &PersistScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn reindex(&mut self) {
        for (idx, task) in self.tasks.iter_mut().enumerate() {
            task.order = idx;
        }
    }

    fn schedule_save(&mut self) {
        self.scheduler.schedule(self.clock.now());
    }

    fn write(&mut self) {
        if let Err(err) = storage::save_tasks(&mut self.storage, &self.keys.data(), &self.tasks) {
            error!(error = %format!("{err:#}"), count = self.tasks.len(), "failed to save tasks");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::scheduler::ManualClock;
    use crate::storage::MemoryStorage;

    fn store() -> (TaskStore<MemoryStorage, ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap());
        let mut store = TaskStore::new(
            MemoryStorage::new(),
            clock.clone(),
            StorageKeys::default(),
            PersistScheduler::default(),
        );
        store.init();
        (store, clock)
    }

    fn assert_dense(store: &TaskStore<MemoryStorage, ManualClock>) {
        let orders: Vec<usize> = store.get_all().iter().map(|t| t.order).collect();
        let expected: Vec<usize> = (0..store.len()).collect();
        assert_eq!(orders, expected);
    }

    fn titles(store: &TaskStore<MemoryStorage, ManualClock>) -> Vec<String> {
        store.get_all().into_iter().map(|t| t.title).collect()
    }

    #[test]
    fn add_trims_and_inserts_at_front() {
        let (mut store, _) = store();
        store.add(NewTask::titled("first")).unwrap();
        let task = store.add(NewTask::titled("  Buy milk  ")).unwrap();

        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.order, 0);
        assert_eq!(task.priority, crate::task::Priority::Low);
        assert!(!task.completed);
        assert_eq!(titles(&store), vec!["Buy milk", "first"]);
        assert_dense(&store);
    }

    #[test]
    fn add_rejects_blank_title() {
        let (mut store, _) = store();
        assert_eq!(store.add(NewTask::titled("   ")), Err(TaskError::EmptyTitle));
        assert!(store.is_empty());
        assert!(!store.has_pending_write());
    }

    #[test]
    fn delete_unknown_leaves_collection_unchanged() {
        let (mut store, _) = store();
        store.add(NewTask::titled("a")).unwrap();
        let before = store.get_all();
        assert!(!store.delete("ghost"));
        assert_eq!(store.get_all(), before);
    }

    #[test]
    fn order_stays_dense_through_mixed_operations() {
        let (mut store, _) = store();
        let ids: Vec<String> = (0..6)
            .map(|n| store.add(NewTask::titled(format!("t{n}"))).unwrap().id)
            .collect();
        assert_dense(&store);

        assert!(store.delete(&ids[2]));
        assert_dense(&store);
        assert!(store.reorder(&ids[0], &ids[5]));
        assert_dense(&store);
        assert!(store.delete(&ids[5]));
        assert_dense(&store);
        store.add(NewTask::titled("late")).unwrap();
        assert!(store.reorder(&ids[4], &ids[1]));
        assert_dense(&store);
    }

    #[test]
    fn reorder_places_moved_task_in_front_of_target() {
        let (mut store, _) = store();
        let d = store.add(NewTask::titled("d")).unwrap().id;
        let c = store.add(NewTask::titled("c")).unwrap().id;
        let b = store.add(NewTask::titled("b")).unwrap().id;
        let a = store.add(NewTask::titled("a")).unwrap().id;
        assert_eq!(titles(&store), vec!["a", "b", "c", "d"]);

        assert!(store.reorder(&a, &d));
        assert_eq!(titles(&store), vec!["b", "c", "a", "d"]);

        assert!(store.reorder(&d, &b));
        assert_eq!(titles(&store), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn repeated_reorder_is_idempotent() {
        let (mut store, _) = store();
        let c = store.add(NewTask::titled("c")).unwrap().id;
        let b = store.add(NewTask::titled("b")).unwrap().id;
        let a = store.add(NewTask::titled("a")).unwrap().id;

        assert!(store.reorder(&a, &c));
        let once = titles(&store);
        assert_eq!(once, vec!["b", "a", "c"]);
        assert!(store.reorder(&a, &c));
        assert_eq!(titles(&store), once);

        assert!(store.reorder(&c, &b));
        assert!(store.reorder(&c, &b));
        assert_eq!(titles(&store), vec!["c", "b", "a"]);
    }

    #[test]
    fn reorder_with_unknown_id_is_a_noop() {
        let (mut store, _) = store();
        let a = store.add(NewTask::titled("a")).unwrap().id;
        store.flush();
        assert!(!store.reorder(&a, "ghost"));
        assert!(!store.reorder("ghost", &a));
        assert!(!store.has_pending_write());
    }

    #[test]
    fn update_applies_allow_list_and_trims() {
        let (mut store, _) = store();
        let id = store.add(NewTask::titled("old")).unwrap().id;
        let patch = TaskPatch {
            title: Some("  new  ".to_string()),
            description: Some("  details ".to_string()),
            tags: Some(vec![" x ".to_string(), String::new()]),
            completed: Some(true),
            ..TaskPatch::default()
        };
        let updated = store.update(&id, patch).unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.description, "details");
        assert_eq!(updated.tags, vec!["x".to_string()]);
        assert!(updated.completed);
        assert_eq!(store.get_one(&id), Some(updated));
    }

    #[test]
    fn update_keeps_title_when_patch_title_is_blank() {
        let (mut store, _) = store();
        let id = store.add(NewTask::titled("keep me")).unwrap().id;
        let patch = TaskPatch {
            title: Some("   ".to_string()),
            ..TaskPatch::default()
        };
        assert_eq!(store.update(&id, patch).unwrap().title, "keep me");
    }

    #[test]
    fn unknown_ids_signal_not_found() {
        let (mut store, _) = store();
        let ghost = "ghost";
        assert!(store.get_one(ghost).is_none());
        assert!(store.update(ghost, TaskPatch::default()).is_none());
        assert!(store.toggle_complete(ghost).is_none());
    }

    #[test]
    fn toggle_flips_completion() {
        let (mut store, _) = store();
        let id = store.add(NewTask::titled("a")).unwrap().id;
        assert!(store.toggle_complete(&id).unwrap().completed);
        assert!(!store.toggle_complete(&id).unwrap().completed);
    }

    #[test]
    fn writes_are_debounced_until_quiet() {
        let (mut store, clock) = store();
        let key = store.keys().data();

        store.add(NewTask::titled("a")).unwrap();
        clock.advance_ms(250);
        store.add(NewTask::titled("b")).unwrap();
        clock.advance_ms(250);
        assert!(!store.tick());
        assert_eq!(store.storage().get_item(&key).unwrap(), None);

        clock.advance_ms(50);
        assert!(store.tick());
        let raw = store.storage().get_item(&key).unwrap().unwrap();
        let saved: Vec<Task> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].title, "b");
    }

    #[test]
    fn flush_writes_immediately() {
        let (mut store, _) = store();
        store.add(NewTask::titled("a")).unwrap();
        assert!(store.has_pending_write());
        store.flush();
        assert!(!store.has_pending_write());
        assert!(store.storage().get_item("app_data").unwrap().is_some());
    }

    #[test]
    fn failed_write_keeps_memory_authoritative() {
        let (mut store, _) = store();
        store.storage_mut().set_quota(Some(8));
        let id = store.add(NewTask::titled("too big to store")).unwrap().id;
        store.flush();
        assert_eq!(store.storage().get_item("app_data").unwrap(), None);
        assert!(store.toggle_complete(&id).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn init_reindexes_sparse_orders() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap());
        let mut storage = MemoryStorage::new();
        let payload = r#"[
            {"id":"00000000-0000-4000-8000-000000000002","title":"second","createdAt":"2026-01-01T00:00:00Z","order":7},
            {"id":"00000000-0000-4000-8000-000000000001","title":"first","createdAt":"2026-01-01T00:00:00Z","order":3}
        ]"#;
        storage.set_item("app_data", payload).unwrap();
        let mut store = TaskStore::new(storage, clock, StorageKeys::default(), PersistScheduler::default());
        assert_eq!(store.init(), 2);
        assert_eq!(titles(&store), vec!["first", "second"]);
        assert_dense(&store);
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let (mut store, _) = store();
        let id = store.add(NewTask::titled("a")).unwrap().id;
        assert_eq!(store.resolve_id(&id), Ok(id.clone()));
        assert_eq!(store.resolve_id(&id[..8]), Ok(id.clone()));
        assert!(matches!(store.resolve_id("zzzz"), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn stored_tasks_with_foreign_ids_survive_the_next_write() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap());
        let mut storage = MemoryStorage::new();
        let payload = r#"[
            {"id":"task-1","title":"Buy milk","date":"soon","createdAt":"2026-01-01T00:00:00Z","order":0}
        ]"#;
        storage.set_item("app_data", payload).unwrap();
        let mut store = TaskStore::new(storage, clock, StorageKeys::default(), PersistScheduler::default());
        assert_eq!(store.init(), 1);

        store.add(NewTask::titled("new")).unwrap();
        store.flush();

        let raw = store.storage().get_item("app_data").unwrap().unwrap();
        let saved: Vec<Task> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].id, "task-1");
        assert_eq!(saved[1].title, "Buy milk");
        assert_eq!(saved[1].date, None);
        assert_eq!(store.resolve_id("task-1"), Ok("task-1".to_string()));
        assert!(store.toggle_complete("task-1").unwrap().completed);
    }
}
