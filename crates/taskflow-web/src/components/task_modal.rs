use taskflow_core::Priority;
use taskflow_core::app::{
  Editor,
  TaskForm
};
use web_sys::{
  HtmlInputElement,
  HtmlSelectElement,
  HtmlTextAreaElement
};
use yew::{
  Callback,
  Html,
  Properties,
  TargetCast,
  function_component,
  html,
  use_state
};

const PRIORITY_CHOICES: [(
  Priority,
  &str
); 4] = [
  (Priority::Low, "Low"),
  (Priority::Medium, "Medium"),
  (Priority::High, "High"),
  (Priority::None, "None")
];

#[derive(Properties, PartialEq)]
pub struct TaskModalProps {
  pub editor:    Editor,
  pub error:     Option<String>,
  pub on_submit: Callback<TaskForm>,
  pub on_cancel: Callback<()>
}

#[function_component(TaskModal)]
pub fn task_modal(
  props: &TaskModalProps
) -> Html {
  let form = {
    let seed = props.editor.form.clone();
    use_state(move || seed)
  };

  let edit = |apply: fn(
    &mut TaskForm,
    String
  )| {
    let form = form.clone();
    move |value: String| {
      let mut next = (*form).clone();
      apply(&mut next, value);
      form.set(next);
    }
  };

  let on_title = {
    let edit = edit(|f, v| f.title = v);
    Callback::from(
      move |e: web_sys::InputEvent| {
        let input: HtmlInputElement =
          e.target_unchecked_into();
        edit(input.value());
      }
    )
  };
  let on_description = {
    let edit =
      edit(|f, v| f.description = v);
    Callback::from(
      move |e: web_sys::InputEvent| {
        let input: HtmlTextAreaElement =
          e.target_unchecked_into();
        edit(input.value());
      }
    )
  };
  let on_date = {
    let edit = edit(|f, v| f.date = v);
    Callback::from(
      move |e: web_sys::InputEvent| {
        let input: HtmlInputElement =
          e.target_unchecked_into();
        edit(input.value());
      }
    )
  };
  let on_tags = {
    let edit = edit(|f, v| f.tags = v);
    Callback::from(
      move |e: web_sys::InputEvent| {
        let input: HtmlInputElement =
          e.target_unchecked_into();
        edit(input.value());
      }
    )
  };
  let on_priority = {
    let edit = edit(|f, v| {
      f.priority =
        v.parse().unwrap_or_default();
    });
    Callback::from(
      move |e: web_sys::Event| {
        let select: HtmlSelectElement =
          e.target_unchecked_into();
        edit(select.value());
      }
    )
  };

  let onsubmit = {
    let form = form.clone();
    let on_submit =
      props.on_submit.clone();
    Callback::from(
      move |e: web_sys::SubmitEvent| {
        e.prevent_default();
        on_submit.emit((*form).clone());
      }
    )
  };
  let on_cancel = {
    let on_cancel =
      props.on_cancel.clone();
    Callback::from(move |_| {
      on_cancel.emit(());
    })
  };

  html! {
      <div class="modal-overlay active">
          <div class="modal" role="dialog" aria-modal="true" aria-labelledby="modal-title">
              <h2 id="modal-title" class="modal__title">{ props.editor.heading() }</h2>
              <form class="modal__form" {onsubmit}>
                  <label class="form-group">
                      <span class="form-label">{ "Title" }</span>
                      <input
                          class="form-input"
                          type="text"
                          required=true
                          value={form.title.clone()}
                          oninput={on_title}
                      />
                  </label>
                  <label class="form-group">
                      <span class="form-label">{ "Description" }</span>
                      <textarea
                          class="form-input"
                          rows="3"
                          value={form.description.clone()}
                          oninput={on_description}
                      />
                  </label>
                  <div class="form-row">
                      <label class="form-group">
                          <span class="form-label">{ "Due date" }</span>
                          <input
                              class="form-input"
                              type="date"
                              value={form.date.clone()}
                              oninput={on_date}
                          />
                      </label>
                      <label class="form-group">
                          <span class="form-label">{ "Priority" }</span>
                          <select class="form-input" onchange={on_priority}>
                              { for PRIORITY_CHOICES.iter().map(|(priority, label)| html! {
                                  <option
                                      value={priority.as_str()}
                                      selected={*priority == form.priority}
                                  >
                                      { *label }
                                  </option>
                              }) }
                          </select>
                      </label>
                  </div>
                  <label class="form-group">
                      <span class="form-label">{ "Tags" }</span>
                      <input
                          class="form-input"
                          type="text"
                          placeholder="work, home"
                          value={form.tags.clone()}
                          oninput={on_tags}
                      />
                  </label>
                  {
                      match &props.error {
                          Some(message) => html! { <p class="form-error" role="alert">{ message.clone() }</p> },
                          None => html! {}
                      }
                  }
                  <div class="modal__actions">
                      <button type="button" class="btn btn-ghost" onclick={on_cancel}>{ "Cancel" }</button>
                      <button type="submit" class="btn btn-primary">{ props.editor.submit_label() }</button>
                  </div>
              </form>
          </div>
      </div>
  }
}
