use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::timers::callback::Timeout;
use taskflow_core::app::{
  EditorMode,
  TaskForm
};
use taskflow_core::config::Config;
use taskflow_core::filter::StatusFilter;
use taskflow_core::scheduler::{
  Clock,
  SystemClock
};
use taskflow_core::theme::Theme;
use wasm_bindgen::JsCast;
use yew::{
  Callback,
  Html,
  Properties,
  function_component,
  html,
  use_effect_with,
  use_force_update,
  use_mut_ref,
  use_state
};

use crate::components::{
  ConfirmDelete,
  FilterTabs,
  SearchBox,
  TaskModal
};
use crate::markup::{
  Fired,
  element_html
};
use crate::storage::LocalStorage;

const SEARCH_DEBOUNCE_MS: u32 = 200;

type Session = taskflow_core::App<
  LocalStorage,
  SystemClock
>;

type TimerSlot = Rc<RefCell<Option<Timeout>>>;

/// Shared handle to the one session of
/// this page.
#[derive(Clone)]
pub struct SessionHandle(
  Rc<RefCell<Session>>
);

impl PartialEq for SessionHandle {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl SessionHandle {
  pub fn open() -> anyhow::Result<Self> {
    let storage = LocalStorage::open()?;
    let app = Session::new(
      storage,
      SystemClock,
      &Config::defaults(),
      prefers_dark()
    )?;
    Ok(Self(Rc::new(RefCell::new(app))))
  }
}

#[derive(Properties, PartialEq)]
pub struct ShellProps {
  pub session: SessionHandle
}

#[function_component(Shell)]
pub fn shell(props: &ShellProps) -> Html {
  let redraw = use_force_update();
  let write_timer: TimerSlot =
    use_mut_ref(|| None);
  let search_timer: TimerSlot =
    use_mut_ref(|| None);
  let search_text =
    use_state(String::new);
  let form_error =
    use_state(|| None::<String>);

  let view = props.session.0.borrow().refresh();

  // every mutation goes through here so
  // the deferred write gets a timer
  let commit = {
    let session = props.session.clone();
    let write_timer = write_timer.clone();
    let redraw = redraw.clone();
    Callback::from(move |()| {
      arm_write(&session, &write_timer);
      redraw.force_update();
    })
  };

  {
    use_effect_with(
      view.theme,
      move |theme| {
        apply_theme(*theme);
        || ()
      }
    );
  }

  {
    let session = props.session.clone();
    let redraw = redraw.clone();
    let form_error = form_error.clone();
    use_effect_with((), move |_| {
      let window = web_sys::window();
      let document = window
        .as_ref()
        .and_then(|w| w.document());

      let keydown = document.map(|doc| {
        let session = session.clone();
        EventListener::new(
          &doc,
          "keydown",
          move |event| {
            let escape = event
              .dyn_ref::<web_sys::KeyboardEvent>()
              .is_some_and(|key| {
                key.key() == "Escape"
              });
            if escape {
              session
                .0
                .borrow_mut()
                .dismiss_dialogs();
              form_error.set(None);
              redraw.force_update();
            }
          }
        )
      });

      let unload = window.map(|win| {
        EventListener::new(
          &win,
          "beforeunload",
          move |_| {
            session
              .0
              .borrow_mut()
              .shutdown();
          }
        )
      });

      tracing::debug!(
        "global listeners attached"
      );
      move || drop((keydown, unload))
    });
  }

  let on_gesture = {
    let session = props.session.clone();
    let commit = commit.clone();
    let form_error = form_error.clone();
    Callback::from(move |fired: Fired| {
      let handled = fired.target.dispatch(
        &fired.gesture,
        &mut *session.0.borrow_mut()
      );
      tracing::debug!(
        ?fired.gesture,
        handled,
        "gesture dispatched"
      );
      if handled
        && !matches!(
          fired.gesture,
          taskflow_core::view::Gesture::DragStart
        )
      {
        form_error.set(None);
        commit.emit(());
      }
    })
  };

  let on_filter = {
    let session = props.session.clone();
    let redraw = redraw.clone();
    Callback::from(
      move |status: StatusFilter| {
        session
          .0
          .borrow_mut()
          .set_filter(status);
        redraw.force_update();
      }
    )
  };

  let on_search = {
    let session = props.session.clone();
    let redraw = redraw.clone();
    let search_text = search_text.clone();
    let search_timer = search_timer.clone();
    Callback::from(move |text: String| {
      search_text.set(text.clone());
      let session = session.clone();
      let redraw = redraw.clone();
      *search_timer.borrow_mut() =
        Some(Timeout::new(
          SEARCH_DEBOUNCE_MS,
          move || {
            session
              .0
              .borrow_mut()
              .set_query(&text);
            redraw.force_update();
          }
        ));
    })
  };

  let on_add = {
    let session = props.session.clone();
    let redraw = redraw.clone();
    let form_error = form_error.clone();
    Callback::from(move |_| {
      session
        .0
        .borrow_mut()
        .open_editor(None);
      form_error.set(None);
      redraw.force_update();
    })
  };

  let on_theme = {
    let session = props.session.clone();
    let redraw = redraw.clone();
    Callback::from(move |_| {
      let theme = session
        .0
        .borrow_mut()
        .toggle_theme();
      tracing::info!(%theme, "theme switched");
      redraw.force_update();
    })
  };

  let on_submit = {
    let session = props.session.clone();
    let commit = commit.clone();
    let form_error = form_error.clone();
    Callback::from(move |form: TaskForm| {
      let saved = session
        .0
        .borrow_mut()
        .submit(form);
      match saved {
        | Ok(task) => {
          tracing::info!(
            id = %task.id,
            "task saved"
          );
          form_error.set(None);
          commit.emit(());
        }
        | Err(err) => {
          tracing::warn!(
            error = %err,
            "task form rejected"
          );
          form_error
            .set(Some(err.to_string()));
        }
      }
    })
  };

  let on_cancel_edit = {
    let session = props.session.clone();
    let redraw = redraw.clone();
    let form_error = form_error.clone();
    Callback::from(move |()| {
      session
        .0
        .borrow_mut()
        .close_editor();
      form_error.set(None);
      redraw.force_update();
    })
  };

  let on_confirm_delete = {
    let session = props.session.clone();
    let commit = commit.clone();
    Callback::from(move |()| {
      let removed = session
        .0
        .borrow_mut()
        .confirm_delete();
      tracing::debug!(
        removed,
        "delete confirmed"
      );
      commit.emit(());
    })
  };

  let on_cancel_delete = {
    let session = props.session.clone();
    let redraw = redraw.clone();
    Callback::from(move |()| {
      session
        .0
        .borrow_mut()
        .cancel_delete();
      redraw.force_update();
    })
  };

  let modal = match &view.editor {
    | Some(editor) => {
      let key = match &editor.mode {
        | EditorMode::Create => {
          "create".to_string()
        }
        | EditorMode::Edit(id) => {
          id.clone()
        }
      };
      html! {
          <TaskModal
              key={key}
              editor={editor.clone()}
              error={(*form_error).clone()}
              on_submit={on_submit}
              on_cancel={on_cancel_edit}
          />
      }
    }
    | None => html! {}
  };

  let confirm = view
    .confirm_delete
    .as_deref()
    .and_then(|id| {
      props
        .session
        .0
        .borrow()
        .store()
        .get_one(id)
    })
    .map(|task| {
      html! {
          <ConfirmDelete
              title={task.title}
              on_confirm={on_confirm_delete}
              on_cancel={on_cancel_delete}
          />
      }
    })
    .unwrap_or_default();

  html! {
      <div class="app">
          <header class="app-header">
              <h1 class="app-title">{ "TaskFlow" }</h1>
              <div class="app-header__actions">
                  <button
                      type="button"
                      class="btn btn-ghost btn-icon theme-toggle"
                      aria-label={view.theme.toggle_label()}
                      title={view.theme.toggle_label()}
                      onclick={on_theme}
                  >
                      { match view.theme { Theme::Light => "🌙", Theme::Dark => "☀️" } }
                  </button>
                  <button type="button" class="btn btn-primary" onclick={on_add}>
                      { "Add Task" }
                  </button>
              </div>
          </header>
          { element_html(&view.stats_grid, &on_gesture) }
          <div class="toolbar">
              <FilterTabs active={view.filter} on_select={on_filter} />
              <SearchBox value={(*search_text).clone()} on_input={on_search} />
          </div>
          { element_html(&view.task_list, &on_gesture) }
          { modal }
          { confirm }
      </div>
  }
}

/// Arms a one-shot timer for the store's
/// pending write. Replacing the previous
/// timer cancels it.
fn arm_write(
  session: &SessionHandle,
  slot: &TimerSlot
) {
  let deadline = session
    .0
    .borrow()
    .next_write_at();
  let Some(deadline) = deadline else {
    return;
  };

  let remaining =
    deadline - SystemClock.now();
  // setTimeout may fire a hair early
  let wait = u32::try_from(
    remaining.num_milliseconds().max(0)
      + 1
  )
  .unwrap_or(u32::MAX);

  let session = session.clone();
  *slot.borrow_mut() =
    Some(Timeout::new(wait, move || {
      if session.0.borrow_mut().tick() {
        tracing::debug!(
          "deferred write landed"
        );
      }
    }));
}

fn prefers_dark() -> bool {
  web_sys::window()
    .and_then(|window| {
      window
        .match_media(
          "(prefers-color-scheme: dark)"
        )
        .ok()
        .flatten()
    })
    .is_some_and(|query| query.matches())
}

fn apply_theme(theme: Theme) {
  let root = web_sys::window()
    .and_then(|window| window.document())
    .and_then(|document| {
      document.document_element()
    });
  if let Some(root) = root {
    let _ = root.set_attribute(
      "data-theme",
      theme.storage_value()
    );
  }
}
