use std::rc::Rc;

use taskflow_core::view::{
  Element,
  Gesture,
  Listener,
  Node
};
use web_sys::{
  DragEvent,
  MouseEvent
};
use yew::virtual_dom::{
  AttrValue,
  VNode,
  VText
};
use yew::{
  Callback,
  Html,
  classes,
  html
};

const DRAG_MIME: &str = "text/plain";
const DRAG_PREFIX: &str = "taskflow-task:";

/// A gesture caught on a rendered
/// element, with the listeners that
/// element was built with.
#[derive(Clone)]
pub struct Fired {
  pub target:  Rc<Element>,
  pub gesture: Gesture
}

pub fn node_html(
  node: &Node,
  on_gesture: &Callback<Fired>
) -> Html {
  match node {
    | Node::Text(text) => {
      VNode::from(VText::new(
        text.clone()
      ))
    }
    | Node::Icon(icon) => {
      Html::from_html_unchecked(
        AttrValue::Static(icon.svg())
      )
    }
    | Node::Element(element) => {
      element_html(element, on_gesture)
    }
  }
}

pub fn element_html(
  element: &Element,
  on_gesture: &Callback<Fired>
) -> Html {
  let target = Rc::new(Element {
    listeners: element
      .listeners
      .clone(),
    ..Element::new(element.tag)
  });
  let fire = {
    let on_gesture = on_gesture.clone();
    let target = target.clone();
    move |gesture: Gesture| {
      on_gesture.emit(Fired {
        target: target.clone(),
        gesture
      });
    }
  };

  let clickable =
    element.listeners.iter().any(|l| {
      matches!(l, Listener::Click(_))
    });
  let drag_id = element
    .listeners
    .iter()
    .find_map(|l| match l {
      | Listener::DragStart(id) => {
        Some(id.clone())
      }
      | _ => None
    });
  let droppable =
    element.listeners.iter().any(|l| {
      matches!(l, Listener::Drop(_))
    });

  let onclick = clickable.then(|| {
    let fire = fire.clone();
    Callback::from(
      move |event: MouseEvent| {
        event.stop_propagation();
        fire(Gesture::Click);
      }
    )
  });

  let ondragstart = drag_id.map(|id| {
    let fire = fire.clone();
    Callback::from(
      move |event: DragEvent| {
        if let Some(data_transfer) =
          event.data_transfer()
        {
          let _ = data_transfer
            .set_data(
              DRAG_MIME,
              &drag_payload(&id)
            );
          data_transfer
            .set_effect_allowed("move");
        }
        fire(Gesture::DragStart);
      }
    )
  });

  let ondragover = droppable.then(|| {
    Callback::from(
      |event: DragEvent| {
        event.prevent_default();
        if let Some(data_transfer) =
          event.data_transfer()
        {
          data_transfer
            .set_drop_effect("move");
        }
      }
    )
  });

  let ondrop = droppable.then(|| {
    let fire = fire.clone();
    Callback::from(
      move |event: DragEvent| {
        event.prevent_default();
        let dragged = event
          .data_transfer()
          .and_then(|data_transfer| {
            data_transfer
              .get_data(DRAG_MIME)
              .ok()
          })
          .and_then(|raw| {
            parse_drag_payload(&raw)
          });
        if let Some(dragged) = dragged {
          fire(Gesture::Drop {
            dragged
          });
        }
      }
    )
  });

  let mut html = html! {
      <@{element.tag}
          class={classes!(element.classes.clone())}
          {onclick}
          {ondragstart}
          {ondragover}
          {ondrop}
      >
          { for element.children.iter().map(|child| node_html(child, on_gesture)) }
      </@>
  };

  if let VNode::VTag(tag) = &mut html {
    for (name, value) in &element.attrs {
      tag.add_attribute(
        *name,
        value.clone()
      );
    }
  }

  html
}

fn drag_payload(id: &str) -> String {
  format!("{DRAG_PREFIX}{id}")
}

/// Drags that started outside the list
/// carry arbitrary text; only our own
/// tagged payload counts.
fn parse_drag_payload(
  raw: &str
) -> Option<String> {
  raw
    .trim()
    .strip_prefix(DRAG_PREFIX)
    .filter(|id| !id.is_empty())
    .map(str::to_string)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn drag_payload_must_be_a_task_id() {
    assert_eq!(
      parse_drag_payload(&format!(
        " {}\n",
        drag_payload("task-1")
      )),
      Some("task-1".to_string())
    );
    assert_eq!(
      parse_drag_payload(DRAG_PREFIX),
      None
    );
    assert_eq!(
      parse_drag_payload(
        "https://example.com"
      ),
      None
    );
    assert_eq!(
      parse_drag_payload(""),
      None
    );
  }
}
