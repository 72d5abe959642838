//! 前台显示状态

pub mod task_board;

pub use task_board::{BoardObserver, LogObserver, TaskBoard};
