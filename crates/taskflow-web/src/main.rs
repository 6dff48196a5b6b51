mod app;
mod components;
mod markup;
mod storage;

fn main() {
  console_error_panic_hook::set_once();
  wasm_tracing::set_as_global_default();

  tracing::info!(
    "starting taskflow frontend"
  );

  let session = match app::SessionHandle::open() {
    | Ok(session) => session,
    | Err(err) => {
      tracing::error!(
        error = %err,
        "failed to open task session"
      );
      return;
    }
  };

  let mount = web_sys::window()
    .and_then(|window| {
      window.document()
    })
    .and_then(|document| {
      document.get_element_by_id("app")
    })
    .expect(
      "missing #app mount element"
    );

  yew::Renderer::<app::Shell>::with_root_and_props(
    mount,
    app::ShellProps {
      session
    }
  )
  .render();
}
