//! 批次运行统计

use std::fmt;

/// 单次运行的计数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRun {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub stopped_tasks: usize,
    pub cancel_requested: bool,
}

impl BatchRun {
    pub fn new(total_tasks: usize) -> Self {
        Self {
            total_tasks,
            ..Default::default()
        }
    }

    /// 已经结束（无论成功与否）的任务数
    pub fn processed(&self) -> usize {
        self.completed_tasks + self.failed_tasks + self.stopped_tasks
    }

    /// 总体进度百分比
    pub fn percent(&self) -> f64 {
        if self.total_tasks == 0 {
            return 0.0;
        }
        self.processed() as f64 / self.total_tasks as f64 * 100.0
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.total_tasks,
            completed: self.completed_tasks,
            failed: self.failed_tasks,
            stopped: self.stopped_tasks,
            cancelled: self.cancel_requested,
        }
    }
}

/// 运行结束时的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub stopped: usize,
    /// 是否因取消而结束
    pub cancelled: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            write!(f, "已停止 (完成 {}/{})", self.completed, self.total)
        } else {
            write!(f, "全部完成 ({}/{})", self.completed, self.total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_text() {
        let mut run = BatchRun::new(3);
        run.completed_tasks = 2;
        run.failed_tasks = 1;
        assert_eq!(run.summary().to_string(), "全部完成 (2/3)");
        assert_eq!(run.percent(), 100.0);

        run.cancel_requested = true;
        assert_eq!(run.summary().to_string(), "已停止 (完成 2/3)");
    }
}
