//! Ratatui front-end: numbered menus, popup forms, confirmation prompts and
//! fixed-width result tables over the data-access layer.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
