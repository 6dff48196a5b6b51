//! Pure view description of the task list and the stat cards.
//!
//! Rendering produces a [`Node`] tree instead of touching a live document.
//! A host turns the tree into real elements and forwards user gestures back
//! through [`Element::dispatch`], which calls into a [`TaskHandlers`]
//! implementation. User supplied text only ever appears as [`Node::Text`],
//! so titles such as `<b>hi</b>` are shown literally.

use std::fmt::Write as _;

use chrono::{Duration, NaiveDate};
use crate::stats::Stats;
use crate::task::{Priority, Task};

/// Callbacks a host wires to the rendered list.
pub trait TaskHandlers {
    fn on_toggle(&mut self, id: &str);
    fn on_edit(&mut self, id: &str);
    fn on_delete(&mut self, id: &str);
    fn on_drop(&mut self, dragged: &str, target: &str);

    fn on_drag_start(&mut self, _id: &str) {}
}

/// Built-in icons. These are the only markup emitted verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Check,
    Edit,
    Trash,
    Calendar,
    Grip,
}

impl Icon {
    pub fn svg(self) -> &'static str {
        match self {
            Icon::Check => {
                r##"<svg viewBox="0 0 24 24" fill="none" stroke="#fff" stroke-width="3" stroke-linecap="round" stroke-linejoin="round"><polyline points="20 6 9 17 4 12"/></svg>"##
            }
            Icon::Edit => {
                r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M11 4H4a2 2 0 00-2 2v14a2 2 0 002 2h14a2 2 0 002-2v-7"/><path d="M18.5 2.5a2.121 2.121 0 013 3L12 15l-4 1 1-4 9.5-9.5z"/></svg>"#
            }
            Icon::Trash => {
                r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><polyline points="3 6 5 6 21 6"/><path d="M19 6v14a2 2 0 01-2 2H7a2 2 0 01-2-2V6m3 0V4a2 2 0 012-2h4a2 2 0 012 2v2"/></svg>"#
            }
            Icon::Calendar => {
                r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><rect x="3" y="4" width="18" height="18" rx="2"/><line x1="16" y1="2" x2="16" y2="6"/><line x1="8" y1="2" x2="8" y2="6"/><line x1="3" y1="10" x2="21" y2="10"/></svg>"#
            }
            Icon::Grip => {
                r#"<svg viewBox="0 0 24 24" fill="currentColor" opacity="0.3"><circle cx="9" cy="6" r="1.5"/><circle cx="15" cy="6" r="1.5"/><circle cx="9" cy="12" r="1.5"/><circle cx="15" cy="12" r="1.5"/><circle cx="9" cy="18" r="1.5"/><circle cx="15" cy="18" r="1.5"/></svg>"#
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Toggle(String),
    Edit(String),
    Delete(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listener {
    Click(Action),
    /// Starts a drag carrying this task id.
    DragStart(String),
    /// Accepts a dragged task and places it in front of this one.
    Drop(String),
}

/// A user gesture delivered to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    Click,
    DragStart,
    Drop { dragged: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Icon(Icon),
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Icon(_) => {}
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(&escape(text)),
            Node::Icon(icon) => out.push_str(icon.svg()),
            Node::Element(element) => element.write_html(out),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub classes: Vec<String>,
    pub attrs: Vec<(&'static str, String)>,
    pub listeners: Vec<Listener>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            classes: Vec::new(),
            attrs: Vec::new(),
            listeners: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn class_if(self, condition: bool, class: &str) -> Self {
        if condition { self.class(class) } else { self }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn on(mut self, listener: Listener) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn text(self, value: impl Into<String>) -> Self {
        self.child(Node::Text(value.into()))
    }

    pub fn icon(self, icon: Icon) -> Self {
        self.child(Node::Icon(icon))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Depth-first search for the first element carrying `class`,
    /// including `self`.
    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        if self.has_class(class) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find_by_class(class))
    }

    pub fn find_all_by_class<'a>(&'a self, class: &str, out: &mut Vec<&'a Element>) {
        if self.has_class(class) {
            out.push(self);
        }
        for child in self.child_elements() {
            child.find_all_by_class(class, out);
        }
    }

    pub fn text_content(&self) -> String {
        Node::Element(self.clone()).text_content()
    }

    /// Routes a gesture on this element to the handlers. Returns whether a
    /// listener accepted it. Dropping a card onto itself does nothing.
    pub fn dispatch<H: TaskHandlers + ?Sized>(&self, gesture: &Gesture, handlers: &mut H) -> bool {
        for listener in &self.listeners {
            match (listener, gesture) {
                (Listener::Click(action), Gesture::Click) => {
                    match action {
                        Action::Toggle(id) => handlers.on_toggle(id),
                        Action::Edit(id) => handlers.on_edit(id),
                        Action::Delete(id) => handlers.on_delete(id),
                    }
                    return true;
                }
                (Listener::DragStart(id), Gesture::DragStart) => {
                    handlers.on_drag_start(id);
                    return true;
                }
                (Listener::Drop(target), Gesture::Drop { dragged }) => {
                    if dragged == target {
                        return false;
                    }
                    handlers.on_drop(dragged, target);
                    return true;
                }
                _ => {}
            }
        }
        false
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&self.classes.join(" ")));
        }
        for (name, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", escape(name), escape(value));
        }
        out.push('>');
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// `Today`, `Tomorrow`, otherwise a short month and day such as `Mar 7`.
pub fn format_date(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.checked_add_signed(Duration::days(1)) {
        "Tomorrow".to_string()
    } else {
        date.format("%b %-d").to_string()
    }
}

pub fn render_tasks(tasks: &[Task], today: NaiveDate) -> Element {
    let list = Element::new("div").class("task-list").attr("role", "list");
    if tasks.is_empty() {
        return list.child(empty_state());
    }
    tasks
        .iter()
        .fold(list, |list, task| list.child(task_card(task, today)))
}

fn empty_state() -> Element {
    Element::new("div")
        .class("empty-state")
        .class("animate-fade-in")
        .child(Element::new("div").class("empty-state__icon").text("📝"))
        .child(Element::new("p").class("empty-state__text").text("No tasks yet"))
        .child(
            Element::new("p")
                .class("empty-state__sub")
                .text("Click \"Add Task\" to get started"),
        )
}

pub fn task_card(task: &Task, today: NaiveDate) -> Element {
    let id = &task.id;

    let checkbox = Element::new("button")
        .class("task-card__checkbox")
        .class_if(task.completed, "checked")
        .attr(
            "aria-label",
            if task.completed {
                "Mark as incomplete"
            } else {
                "Mark as complete"
            },
        )
        .on(Listener::Click(Action::Toggle(id.clone())))
        .icon(Icon::Check);

    let mut header = Element::new("div")
        .class("task-card__header")
        .child(Element::new("span").class("task-card__title").text(&task.title));
    if task.priority != Priority::None {
        header = header.child(
            Element::new("span")
                .class("badge")
                .class(format!("badge-{}", task.priority))
                .text(task.priority.as_str()),
        );
    }

    let mut body = Element::new("div").class("task-card__body").child(header);
    if !task.description.is_empty() {
        body = body.child(Element::new("p").class("task-card__desc").text(&task.description));
    }

    let mut meta = Element::new("div").class("task-card__meta");
    if let Some(date) = task.date {
        meta = meta.child(
            Element::new("span")
                .class("task-card__date")
                .class_if(task.is_overdue(today), "overdue")
                .attr("datetime", date.format("%Y-%m-%d").to_string())
                .child(Element::new("span").class("task-card__date-icon").icon(Icon::Calendar))
                .child(Element::new("span").text(format_date(date, today))),
        );
    }
    for tag in &task.tags {
        meta = meta.child(Element::new("span").class("tag").text(tag));
    }
    if !meta.children.is_empty() {
        body = body.child(meta);
    }

    let actions = Element::new("div")
        .class("task-card__actions")
        .child(
            Element::new("button")
                .class("btn")
                .class("btn-ghost")
                .class("btn-icon")
                .attr("aria-label", "Edit task")
                .on(Listener::Click(Action::Edit(id.clone())))
                .icon(Icon::Edit),
        )
        .child(
            Element::new("button")
                .class("btn")
                .class("btn-danger")
                .class("btn-icon")
                .attr("aria-label", "Delete task")
                .on(Listener::Click(Action::Delete(id.clone())))
                .icon(Icon::Trash),
        );

    Element::new("div")
        .class("task-card")
        .class_if(task.completed, "completed")
        .attr("data-id", id.clone())
        .attr("draggable", "true")
        .attr("role", "listitem")
        .on(Listener::DragStart(id.clone()))
        .on(Listener::Drop(id.clone()))
        .child(Element::new("span").class("task-card__grip").icon(Icon::Grip))
        .child(checkbox)
        .child(body)
        .child(actions)
}

pub fn render_stats(stats: &Stats) -> Element {
    let cards = [
        (stats.total, "Total", "stat-card--total"),
        (stats.completed, "Done", "stat-card--done"),
        (stats.pending, "Pending", "stat-card--pending"),
        (stats.overdue, "Overdue", "stat-card--overdue"),
    ];

    cards.iter().fold(
        Element::new("div").class("stats-grid"),
        |grid, (value, label, modifier)| {
            grid.child(
                Element::new("div")
                    .class("stat-card")
                    .class(*modifier)
                    .child(Element::new("div").class("stat-card__value").text(value.to_string()))
                    .child(Element::new("div").class("stat-card__label").text(*label)),
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl TaskHandlers for Recorder {
        fn on_toggle(&mut self, id: &str) {
            self.calls.push(format!("toggle {id}"));
        }
        fn on_edit(&mut self, id: &str) {
            self.calls.push(format!("edit {id}"));
        }
        fn on_delete(&mut self, id: &str) {
            self.calls.push(format!("delete {id}"));
        }
        fn on_drop(&mut self, dragged: &str, target: &str) {
            self.calls.push(format!("drop {dragged} {target}"));
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn task(title: &str) -> Task {
        Task {
            id: crate::task::new_task_id(),
            title: title.to_string(),
            description: String::new(),
            date: None,
            priority: Priority::Low,
            tags: vec![],
            completed: false,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            order: 0,
        }
    }

    #[test]
    fn empty_list_renders_placeholder() {
        let list = render_tasks(&[], today());
        assert!(list.find_by_class("empty-state").is_some());
        assert!(list.find_by_class("task-card").is_none());
    }

    #[test]
    fn markup_in_user_text_stays_literal() {
        let mut t = task("<img src=x onerror=alert(1)>");
        t.description = "a & b".to_string();
        t.tags = vec!["\"quoted\"".to_string()];
        let list = render_tasks(&[t], today());

        let title = list.find_by_class("task-card__title").unwrap();
        assert_eq!(title.text_content(), "<img src=x onerror=alert(1)>");

        let html = Node::from(list).to_html();
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("&quot;quoted&quot;"));
    }

    #[test]
    fn card_reflects_task_state() {
        let mut t = task("Pay rent");
        t.completed = true;
        t.priority = Priority::None;
        t.date = NaiveDate::from_ymd_opt(2026, 3, 1);
        t.tags = vec!["home".to_string(), "money".to_string()];
        let card = task_card(&t, today());

        assert!(card.has_class("completed"));
        assert_eq!(card.get_attr("data-id"), Some(t.id.as_str()));
        assert!(card.find_by_class("badge").is_none());
        let checkbox = card.find_by_class("task-card__checkbox").unwrap();
        assert_eq!(checkbox.get_attr("aria-label"), Some("Mark as incomplete"));

        let date = card.find_by_class("task-card__date").unwrap();
        assert!(!date.has_class("overdue"));
        assert_eq!(date.text_content(), "Mar 1");

        let mut tags = Vec::new();
        card.find_all_by_class("tag", &mut tags);
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn overdue_date_is_flagged() {
        let mut t = task("late");
        t.priority = Priority::High;
        t.date = NaiveDate::from_ymd_opt(2026, 3, 9);
        let card = task_card(&t, today());
        assert!(card.find_by_class("overdue").is_some());
        assert!(card.find_by_class("badge-high").is_some());
        assert!(card.find_by_class("task-card__desc").is_none());
    }

    #[test]
    fn date_labels() {
        let today = today();
        assert_eq!(format_date(today, today), "Today");
        assert_eq!(format_date(today + Duration::days(1), today), "Tomorrow");
        assert_eq!(format_date(today + Duration::days(2), today), "Mar 12");
    }

    #[test]
    fn gestures_route_to_handlers() {
        let a = task("a");
        let b = task("b");
        let list = render_tasks(&[a.clone(), b.clone()], today());
        let cards: Vec<&Element> = list.child_elements().collect();
        let mut recorder = Recorder::default();

        let toggle = cards[0].find_by_class("task-card__checkbox").unwrap();
        assert!(toggle.dispatch(&Gesture::Click, &mut recorder));
        let delete = cards[1].find_by_class("btn-danger").unwrap();
        assert!(delete.dispatch(&Gesture::Click, &mut recorder));
        let edit = cards[1].find_by_class("btn-ghost").unwrap();
        assert!(edit.dispatch(&Gesture::Click, &mut recorder));
        let drop_a = Gesture::Drop { dragged: a.id.clone() };
        assert!(cards[1].dispatch(&drop_a, &mut recorder));
        assert!(!cards[0].dispatch(&drop_a, &mut recorder));
        assert!(!cards[0].dispatch(&Gesture::Click, &mut recorder));

        assert_eq!(
            recorder.calls,
            vec![
                format!("toggle {}", a.id),
                format!("delete {}", b.id),
                format!("edit {}", b.id),
                format!("drop {} {}", a.id, b.id),
            ]
        );
    }

    #[test]
    fn stats_render_four_cards() {
        let stats = Stats {
            total: 4,
            completed: 1,
            pending: 3,
            overdue: 2,
            completion_rate: 25,
        };
        let grid = render_stats(&stats);
        let labels: Vec<String> = grid
            .child_elements()
            .map(|card| card.find_by_class("stat-card__label").unwrap().text_content())
            .collect();
        assert_eq!(labels, vec!["Total", "Done", "Pending", "Overdue"]);
        let overdue = grid.find_by_class("stat-card--overdue").unwrap();
        assert_eq!(overdue.find_by_class("stat-card__value").unwrap().text_content(), "2");
    }
}
