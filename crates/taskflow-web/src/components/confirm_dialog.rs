use yew::{
  Callback,
  Html,
  Properties,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct ConfirmDeleteProps {
  pub title:      String,
  pub on_confirm: Callback<()>,
  pub on_cancel:  Callback<()>
}

#[function_component(ConfirmDelete)]
pub fn confirm_delete(
  props: &ConfirmDeleteProps
) -> Html {
  let on_confirm = {
    let on_confirm =
      props.on_confirm.clone();
    Callback::from(move |_| {
      on_confirm.emit(());
    })
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
          <div class="modal modal--confirm" role="alertdialog" aria-modal="true">
              <h2 class="modal__title">{ "Delete task?" }</h2>
              <p class="modal__text">
                  { format!("\"{}\" will be removed. This cannot be undone.", props.title) }
              </p>
              <div class="modal__actions">
                  <button type="button" class="btn btn-ghost" onclick={on_cancel}>{ "Cancel" }</button>
                  <button type="button" class="btn btn-danger" onclick={on_confirm}>{ "Delete" }</button>
              </div>
          </div>
      </div>
  }
}
