//! 任务状态通知
//!
//! 后台线程只通过通道发送事件，前台在自己的循环里消费并更新显示状态。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use tracing::debug;

use crate::models::{Progress, RunSummary, Task, TaskStatus, TaskUpdate};

/// 前台可见的事件
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// 新批次开始，任务列表被替换
    TasksReset(Vec<Task>),
    /// 单个任务的部分更新
    Task(TaskUpdate),
    /// 状态栏文字
    RunStatus(String),
    /// 总体进度百分比
    RunProgress(f64),
    /// 运行结束
    RunFinished(RunSummary),
}

/// 取消标志
///
/// 唯一的跨线程共享状态，后台在各检查点读取。
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 状态追踪器（后台一侧）
#[derive(Debug, Clone)]
pub struct StatusTracker {
    tx: Sender<UiEvent>,
}

impl StatusTracker {
    pub fn new(tx: Sender<UiEvent>) -> Self {
        Self { tx }
    }

    /// 发送部分更新
    pub fn update(
        &self,
        ordinal: usize,
        status: Option<TaskStatus>,
        progress: Option<Progress>,
        filename: Option<String>,
    ) {
        self.emit(UiEvent::Task(TaskUpdate {
            ordinal,
            status,
            progress,
            filename,
        }));
    }

    /// 绑定到单个任务
    pub fn for_task(&self, ordinal: usize) -> TaskTracker {
        TaskTracker {
            ordinal,
            tracker: self.clone(),
        }
    }

    pub fn emit(&self, event: UiEvent) {
        // 前台已退出时丢弃事件
        if self.tx.send(event).is_err() {
            debug!("前台已关闭，丢弃事件");
        }
    }
}

/// 绑定到某个任务的追踪器
#[derive(Debug, Clone)]
pub struct TaskTracker {
    ordinal: usize,
    tracker: StatusTracker,
}

impl TaskTracker {
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn status(&self, status: TaskStatus) {
        self.tracker.update(self.ordinal, Some(status), None, None);
    }

    pub fn status_with_progress(&self, status: TaskStatus, progress: Progress) {
        self.tracker
            .update(self.ordinal, Some(status), Some(progress), None);
    }

    pub fn progress(&self, progress: Progress) {
        self.tracker.update(self.ordinal, None, Some(progress), None);
    }

    pub fn finish(&self, status: TaskStatus, progress: Option<Progress>, filename: Option<String>) {
        self.tracker
            .update(self.ordinal, Some(status), progress, filename);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_task_tracker_sends_partial_updates() {
        let (tx, rx) = mpsc::channel();
        let tracker = StatusTracker::new(tx).for_task(2);

        tracker.status(TaskStatus::Starting);
        tracker.progress(Progress::Label("等待3秒".to_string()));

        assert_eq!(
            rx.recv().unwrap(),
            UiEvent::Task(TaskUpdate::status(2, TaskStatus::Starting))
        );
        assert_eq!(
            rx.recv().unwrap(),
            UiEvent::Task(TaskUpdate {
                ordinal: 2,
                status: None,
                progress: Some(Progress::Label("等待3秒".to_string())),
                filename: None,
            })
        );
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());
        flag.cancel();
        assert!(observer.is_cancelled());
        flag.reset();
        assert!(!observer.is_cancelled());
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_silent() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        StatusTracker::new(tx).emit(UiEvent::RunProgress(10.0));
    }
}
