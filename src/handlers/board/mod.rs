pub mod actions;
pub mod fragments;

pub use actions::run_action;
pub use fragments::{
    board_column, board_grid, task_card, task_edit_form, task_sidebar, task_timeline,
};
