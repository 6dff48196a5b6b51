use anyhow::anyhow;
use taskflow_core::storage::KeyValueStorage;

/// `window.localStorage` behind the
/// store's storage trait.
pub struct LocalStorage {
  inner: web_sys::Storage
}

impl LocalStorage {
  pub fn open() -> anyhow::Result<Self> {
    let inner = web_sys::window()
      .and_then(|window| {
        window
          .local_storage()
          .ok()
          .flatten()
      })
      .ok_or_else(|| {
        anyhow!(
          "localStorage is not available"
        )
      })?;
    Ok(Self {
      inner
    })
  }
}

impl KeyValueStorage for LocalStorage {
  fn get_item(
    &self,
    key: &str
  ) -> anyhow::Result<Option<String>> {
    self.inner.get_item(key).map_err(
      |err| {
        anyhow!(
          "failed to read {key}: {err:?}"
        )
      }
    )
  }

  fn set_item(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    // quota errors surface here as a
    // DOMException
    self
      .inner
      .set_item(key, value)
      .map_err(|err| {
        anyhow!(
          "failed to write {key}: {err:?}"
        )
      })
  }

  fn remove_item(
    &mut self,
    key: &str
  ) -> anyhow::Result<()> {
    self.inner.remove_item(key).map_err(
      |err| {
        anyhow!(
          "failed to remove {key}: {err:?}"
        )
      }
    )
  }
}
