pub mod run;
pub mod task;

pub use run::{BatchRun, RunSummary};
pub use task::{DisplayClass, Progress, Task, TaskStatus, TaskUpdate};
