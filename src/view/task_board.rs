//! 任务面板
//!
//! 前台唯一可以修改显示状态的地方。后台事件先进入通道，
//! 由前台在自己的循环里调用 `drain()` 逐个应用。

use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::{debug, info, warn};

use crate::models::{DisplayClass, RunSummary, Task};
use crate::orchestrator::UiEvent;

/// 显示变化的观察者
///
/// 所有方法都有空实现，按需覆盖。
pub trait BoardObserver {
    fn tasks_reset(&mut self, _tasks: &[Task]) {}
    fn task_changed(&mut self, _task: &Task) {}
    fn run_status(&mut self, _text: &str) {}
    fn run_progress(&mut self, _percent: f64) {}
    fn run_finished(&mut self, _summary: &RunSummary) {}
}

impl BoardObserver for () {}

/// 把显示变化输出为日志的观察者（命令行使用）
#[derive(Debug, Default)]
pub struct LogObserver;

impl BoardObserver for LogObserver {
    fn tasks_reset(&mut self, tasks: &[Task]) {
        info!("📋 已添加 {} 个任务", tasks.len());
    }

    fn task_changed(&mut self, task: &Task) {
        let icon = match task.display_class() {
            DisplayClass::Pending => "⏸️",
            DisplayClass::Active => "⏳",
            DisplayClass::Success => "✅",
            DisplayClass::Error => "❌",
        };
        let progress = task
            .progress
            .as_ref()
            .map(|p| format!(" {}", p))
            .unwrap_or_default();
        debug!("[任务 {}] {} {}{}", task.ordinal, icon, task.status, progress);
    }

    fn run_status(&mut self, text: &str) {
        info!("📌 {}", text);
    }

    fn run_progress(&mut self, percent: f64) {
        debug!("总进度 {:.1}%", percent);
    }
}

/// 任务面板
#[derive(Debug, Clone)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    run_percent: f64,
    status_text: String,
    running: bool,
    last_summary: Option<RunSummary>,
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            run_percent: 0.0,
            status_text: "就绪".to_string(),
            running: false,
            last_summary: None,
        }
    }
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// 按序号查找任务（从 1 开始）
    pub fn task(&self, ordinal: usize) -> Option<&Task> {
        self.tasks.iter().find(|t| t.ordinal == ordinal)
    }

    pub fn run_percent(&self) -> f64 {
        self.run_percent
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    /// 清空任务列表；运行中不允许清空
    pub fn clear(&mut self) -> bool {
        if self.running {
            warn!("⚠️ 下载进行中，无法清空任务列表");
            return false;
        }
        self.tasks.clear();
        self.run_percent = 0.0;
        self.status_text = "就绪".to_string();
        true
    }

    /// 应用通道中所有待处理的事件，返回应用的数量
    pub fn drain(&mut self, rx: &Receiver<UiEvent>, observer: &mut dyn BoardObserver) -> usize {
        let mut applied = 0;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    self.apply(event, observer);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // 发送端全部关闭时运行不可能再继续
                    self.running = false;
                    break;
                }
            }
        }
        applied
    }

    /// 应用单个事件
    pub fn apply(&mut self, event: UiEvent, observer: &mut dyn BoardObserver) {
        match event {
            UiEvent::TasksReset(tasks) => {
                self.tasks = tasks;
                self.run_percent = 0.0;
                self.running = true;
                self.last_summary = None;
                observer.tasks_reset(&self.tasks);
            }
            UiEvent::Task(update) => {
                let Some(task) = self.tasks.iter_mut().find(|t| t.ordinal == update.ordinal) else {
                    debug!("忽略未知任务的更新: {}", update.ordinal);
                    return;
                };

                if let Some(status) = &update.status {
                    if !task.status.can_transition_to(status) {
                        warn!(
                            "[任务 {}] 忽略非法状态变化: {} → {}",
                            task.ordinal, task.status, status
                        );
                        return;
                    }
                }

                if let Some(status) = update.status {
                    task.status = status;
                }
                if let Some(progress) = update.progress {
                    task.progress = Some(progress);
                }
                if let Some(filename) = update.filename {
                    task.resolved_filename = Some(filename);
                }
                observer.task_changed(task);
            }
            UiEvent::RunStatus(text) => {
                observer.run_status(&text);
                self.status_text = text;
            }
            UiEvent::RunProgress(percent) => {
                self.run_percent = percent.clamp(0.0, 100.0);
                observer.run_progress(self.run_percent);
            }
            UiEvent::RunFinished(summary) => {
                self.running = false;
                self.status_text = summary.to_string();
                observer.run_finished(&summary);
                self.last_summary = Some(summary);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Progress, TaskStatus, TaskUpdate};
    use std::sync::mpsc;

    fn board_with_tasks(n: usize) -> TaskBoard {
        let mut board = TaskBoard::new();
        let tasks = (1..=n).map(|i| Task::new(i, format!("https://example.com/{}", i))).collect();
        board.apply(UiEvent::TasksReset(tasks), &mut ());
        board
    }

    #[derive(Default)]
    struct Recorder {
        changed: Vec<(usize, TaskStatus)>,
        finished: usize,
    }

    impl BoardObserver for Recorder {
        fn task_changed(&mut self, task: &Task) {
            self.changed.push((task.ordinal, task.status.clone()));
        }

        fn run_finished(&mut self, _summary: &RunSummary) {
            self.finished += 1;
        }
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let mut board = board_with_tasks(1);
        board.apply(
            UiEvent::Task(TaskUpdate::status(1, TaskStatus::LoadingPage)),
            &mut (),
        );
        board.apply(
            UiEvent::Task(TaskUpdate {
                ordinal: 1,
                status: None,
                progress: Some(Progress::Label("等待3秒".to_string())),
                filename: None,
            }),
            &mut (),
        );

        let task = board.task(1).unwrap();
        assert_eq!(task.status, TaskStatus::LoadingPage);
        assert_eq!(task.progress, Some(Progress::Label("等待3秒".to_string())));
        assert_eq!(task.display_class(), DisplayClass::Active);
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut board = board_with_tasks(1);
        let mut recorder = Recorder::default();
        board.apply(
            UiEvent::Task(TaskUpdate::status(1, TaskStatus::Completed).with_filename("a.pdf")),
            &mut recorder,
        );
        board.apply(
            UiEvent::Task(TaskUpdate::status(1, TaskStatus::FetchingBytes)),
            &mut recorder,
        );

        let task = board.task(1).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.resolved_filename.as_deref(), Some("a.pdf"));
        assert_eq!(recorder.changed, vec![(1, TaskStatus::Completed)]);
    }

    #[test]
    fn test_drain_applies_in_order_and_tracks_run_state() {
        let (tx, rx) = mpsc::channel();
        let mut board = TaskBoard::new();
        let mut recorder = Recorder::default();

        tx.send(UiEvent::TasksReset(vec![Task::new(1, "https://a.com/x.pdf")])).unwrap();
        tx.send(UiEvent::Task(TaskUpdate::status(1, TaskStatus::Starting))).unwrap();
        tx.send(UiEvent::RunStatus("下载中 (1/1)".to_string())).unwrap();
        tx.send(UiEvent::Task(
            TaskUpdate::status(1, TaskStatus::FetchingBytes).with_progress(Progress::Percent(50.0)),
        ))
        .unwrap();

        assert_eq!(board.drain(&rx, &mut recorder), 4);
        assert!(board.is_running());
        assert_eq!(board.status_text(), "下载中 (1/1)");
        assert!(!board.clear());

        tx.send(UiEvent::Task(TaskUpdate::status(1, TaskStatus::Completed))).unwrap();
        tx.send(UiEvent::RunProgress(100.0)).unwrap();
        tx.send(UiEvent::RunFinished(RunSummary {
            total: 1,
            completed: 1,
            failed: 0,
            stopped: 0,
            cancelled: false,
        }))
        .unwrap();

        assert_eq!(board.drain(&rx, &mut recorder), 3);
        assert!(!board.is_running());
        assert_eq!(board.run_percent(), 100.0);
        assert_eq!(board.status_text(), "全部完成 (1/1)");
        assert_eq!(recorder.finished, 1);
        assert_eq!(recorder.changed.len(), 3);

        assert!(board.clear());
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn test_unknown_ordinal_is_ignored() {
        let mut board = board_with_tasks(2);
        board.apply(
            UiEvent::Task(TaskUpdate::status(7, TaskStatus::Starting)),
            &mut (),
        );
        assert!(board.tasks().iter().all(|t| t.status == TaskStatus::Queued));
    }
}
