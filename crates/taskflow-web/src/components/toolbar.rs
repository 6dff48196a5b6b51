use taskflow_core::filter::StatusFilter;
use yew::{
  Callback,
  Html,
  Properties,
  TargetCast,
  classes,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct FilterTabsProps {
  pub active:    StatusFilter,
  pub on_select: Callback<StatusFilter>
}

#[function_component(FilterTabs)]
pub fn filter_tabs(
  props: &FilterTabsProps
) -> Html {
  html! {
      <div class="filter-tabs" role="tablist">
          { for StatusFilter::ALL.iter().map(|status| {
              let status = *status;
              let onclick = {
                  let on_select = props.on_select.clone();
                  Callback::from(move |_| on_select.emit(status))
              };
              html! {
                  <button
                      type="button"
                      role="tab"
                      class={classes!("filter-tab", (status == props.active).then_some("active"))}
                      aria-selected={(status == props.active).to_string()}
                      data-filter={status.as_str()}
                      {onclick}
                  >
                      { status.label() }
                  </button>
              }
          }) }
      </div>
  }
}

#[derive(Properties, PartialEq)]
pub struct SearchBoxProps {
  pub value:    String,
  pub on_input: Callback<String>
}

#[function_component(SearchBox)]
pub fn search_box(
  props: &SearchBoxProps
) -> Html {
  let oninput = {
    let on_input = props.on_input.clone();
    Callback::from(
      move |e: web_sys::InputEvent| {
        let input: web_sys::HtmlInputElement =
          e.target_unchecked_into();
        on_input.emit(input.value());
      }
    )
  };

  html! {
      <div class="search-box">
          <input
              type="search"
              class="search-input"
              placeholder="Search tasks..."
              aria-label="Search tasks"
              value={props.value.clone()}
              {oninput}
          />
      </div>
  }
}
