use anyhow::{Context, bail};
use tracing::{debug, info};

use crate::app::App;
use crate::cli::{Command, EditFields, ListArgs, TaskFields, ThemeAction};
use crate::render::{Renderer, SHORT_ID_LEN};
use crate::scheduler::Clock;
use crate::stats::compute_stats;
use crate::storage::KeyValueStorage;
use crate::error::TaskError;
use crate::task::{NewTask, Task, TaskPatch, parse_iso_date};
use crate::view::Node;

#[tracing::instrument(skip(app, renderer))]
pub fn dispatch<S, C>(
    app: &mut App<S, C>,
    renderer: &mut Renderer,
    command: Option<Command>,
) -> anyhow::Result<()>
where
    S: KeyValueStorage,
    C: Clock,
{
    let command = command.unwrap_or_else(|| Command::List(ListArgs::default()));
    debug!(?command, "dispatching command");

    match command {
        Command::Add(fields) => cmd_add(app, fields),
        Command::List(args) => cmd_list(app, renderer, args),
        Command::Show { id } => {
            let task = lookup(app, &id)?;
            renderer.print_task_info(&task)
        }
        Command::Edit { id, fields } => cmd_edit(app, &id, fields),
        Command::Done { id } => {
            let id = app.store().resolve_id(&id)?;
            let task = app
                .store_mut()
                .toggle_complete(&id)
                .with_context(|| format!("task {id} vanished"))?;
            let state = if task.completed { "done" } else { "not done" };
            println!("Marked {} as {state}.", describe(&task));
            Ok(())
        }
        Command::Delete { id } => {
            let task = lookup(app, &id)?;
            if app.store_mut().delete(&task.id) {
                println!("Deleted {}.", describe(&task));
            }
            Ok(())
        }
        Command::Move { id, before } => {
            let moved = app.store().resolve_id(&id)?;
            let target = app.store().resolve_id(&before)?;
            if moved == target {
                bail!("cannot move a task in front of itself");
            }
            app.store_mut().reorder(&moved, &target);
            let task = lookup(app, &id)?;
            println!("Moved {} to position {}.", describe(&task), task.order);
            Ok(())
        }
        Command::Stats => {
            let stats = compute_stats(&app.store().get_all(), app.store().clock().today());
            renderer.print_stats(&stats)
        }
        Command::Html(args) => {
            app.set_filter(args.filter);
            app.set_query(&args.search);
            let view = app.refresh();
            println!("{}", Node::from(view.stats_grid).to_html());
            println!("{}", Node::from(view.task_list).to_html());
            Ok(())
        }
        Command::Theme { action } => {
            if action == Some(ThemeAction::Toggle) {
                let theme = app.toggle_theme();
                info!(%theme, "theme switched");
            }
            println!("{}", app.theme());
            Ok(())
        }
    }
}

fn cmd_add<S: KeyValueStorage, C: Clock>(app: &mut App<S, C>, fields: TaskFields) -> anyhow::Result<()> {
    let new_task = NewTask {
        title: fields.title,
        description: fields.description,
        date: parse_iso_date(&fields.date)?,
        priority: fields.priority,
        tags: fields.tags,
    };
    let task = app.store_mut().add(new_task)?;
    println!("Created {}.", describe(&task));
    Ok(())
}

fn cmd_list<S: KeyValueStorage, C: Clock>(
    app: &mut App<S, C>,
    renderer: &mut Renderer,
    args: ListArgs,
) -> anyhow::Result<()> {
    app.set_filter(args.filter);
    app.set_query(&args.search);
    let visible = app.filter().apply(&app.store().get_all());
    renderer.print_task_table(&visible, app.store().clock().today())
}

fn cmd_edit<S: KeyValueStorage, C: Clock>(
    app: &mut App<S, C>,
    raw_id: &str,
    fields: EditFields,
) -> anyhow::Result<()> {
    let id = app.store().resolve_id(raw_id)?;
    let patch = edit_patch(fields)?;
    if patch.is_empty() {
        bail!("nothing to change; pass at least one field");
    }
    let task = app
        .store_mut()
        .update(&id, patch)
        .with_context(|| format!("task {id} vanished"))?;
    println!("Updated {}.", describe(&task));
    Ok(())
}

fn edit_patch(fields: EditFields) -> anyhow::Result<TaskPatch> {
    if fields.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
        return Err(TaskError::EmptyTitle.into());
    }
    let date = fields.date.as_deref().map(parse_iso_date).transpose()?;
    let tags = if fields.clear_tags {
        Some(Vec::new())
    } else {
        fields.tags
    };
    Ok(TaskPatch {
        title: fields.title,
        description: fields.description,
        date,
        priority: fields.priority,
        tags,
        completed: None,
    })
}

fn lookup<S: KeyValueStorage, C: Clock>(app: &App<S, C>, raw_id: &str) -> anyhow::Result<Task> {
    let id = app.store().resolve_id(raw_id)?;
    app.store()
        .get_one(&id)
        .with_context(|| format!("task {id} vanished"))
}

fn describe(task: &Task) -> String {
    let short: String = task.id.chars().take(SHORT_ID_LEN).collect();
    format!("{short} \"{}\"", task.title)
}
