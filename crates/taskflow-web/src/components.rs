mod confirm_dialog;
mod task_modal;
mod toolbar;

pub use confirm_dialog::ConfirmDelete;
pub use task_modal::TaskModal;
pub use toolbar::{
  FilterTabs,
  SearchBox
};
