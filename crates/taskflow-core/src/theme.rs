use std::fmt;

use serde::{
  Deserialize,
  Serialize
};
use tracing::debug;

use crate::storage::{
  self,
  KeyValueStorage,
  StorageKeys
};

pub const THEME_PREF: &str = "theme";

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  #[default]
  Light,
  Dark
}

impl Theme {
  pub fn storage_value(
    self
  ) -> &'static str {
    match self {
      | Theme::Light => "light",
      | Theme::Dark => "dark"
    }
  }

  pub fn from_storage(
    raw: &str
  ) -> Option<Self> {
    match raw.trim() {
      | "light" => Some(Theme::Light),
      | "dark" => Some(Theme::Dark),
      | _ => None
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      | Theme::Light => Theme::Dark,
      | Theme::Dark => Theme::Light
    }
  }

  pub fn toggle_label(
    self
  ) -> &'static str {
    match self {
      | Theme::Light => {
        "Switch to dark mode"
      }
      | Theme::Dark => {
        "Switch to light mode"
      }
    }
  }
}

impl fmt::Display for Theme {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.storage_value())
  }
}

/// The saved preference wins; without
/// one the host's system preference
/// decides.
pub fn load_theme<S>(
  storage: &S,
  keys: &StorageKeys,
  prefers_dark: bool
) -> Theme
where
  S: KeyValueStorage + ?Sized
{
  let saved = storage::get_pref(
    storage, keys, THEME_PREF
  );
  match saved
    .as_deref()
    .and_then(Theme::from_storage)
  {
    | Some(theme) => theme,
    | None => {
      debug!(
        ?saved,
        prefers_dark,
        "no usable saved theme; \
         following system"
      );
      if prefers_dark {
        Theme::Dark
      } else {
        Theme::Light
      }
    }
  }
}

pub fn save_theme<S>(
  storage: &mut S,
  keys: &StorageKeys,
  theme: Theme
) where
  S: KeyValueStorage + ?Sized
{
  storage::set_pref(
    storage,
    keys,
    THEME_PREF,
    theme.storage_value()
  );
}
