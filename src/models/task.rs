//! 任务与状态
//!
//! 每个 URL 对应一个任务，状态只能向前推进，三种终止状态不再变化。

use std::fmt;
use std::mem::discriminant;

/// 任务状态
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Queued,
    Starting,
    Probing,
    FetchingBytes,
    LaunchingBrowser,
    LoadingPage,
    RemovingPopups,
    ActivatingLazyContent,
    ScrollingToStabilize,
    RenderingPdf,
    Completed,
    Failed(String),
    Stopped,
}

impl TaskStatus {
    /// 状态在流水线中的位置
    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Queued => 0,
            TaskStatus::Starting => 1,
            TaskStatus::Probing => 2,
            TaskStatus::FetchingBytes | TaskStatus::LaunchingBrowser => 3,
            TaskStatus::LoadingPage => 4,
            TaskStatus::RemovingPopups => 5,
            TaskStatus::ActivatingLazyContent => 6,
            TaskStatus::ScrollingToStabilize => 7,
            TaskStatus::RenderingPdf => 8,
            TaskStatus::Completed | TaskStatus::Failed(_) | TaskStatus::Stopped => 9,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed(_) | TaskStatus::Stopped
        )
    }

    /// 是否允许从当前状态转到 `next`
    ///
    /// 同一状态可以重复出现（例如下载进度刷新），其余必须严格向前。
    pub fn can_transition_to(&self, next: &TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if discriminant(self) == discriminant(next) {
            return true;
        }
        if matches!(self, TaskStatus::FetchingBytes) && !next.is_terminal() {
            return false;
        }
        next.rank() > self.rank()
    }

    /// 显示在任务列表中的文字
    pub fn label(&self) -> String {
        match self {
            TaskStatus::Queued => "等待中".to_string(),
            TaskStatus::Starting => "准备中".to_string(),
            TaskStatus::Probing => "检测类型".to_string(),
            TaskStatus::FetchingBytes => "下载中".to_string(),
            TaskStatus::LaunchingBrowser => "启动浏览器".to_string(),
            TaskStatus::LoadingPage => "加载页面".to_string(),
            TaskStatus::RemovingPopups => "移除弹窗".to_string(),
            TaskStatus::ActivatingLazyContent => "加载内容".to_string(),
            TaskStatus::ScrollingToStabilize => "滚动加载".to_string(),
            TaskStatus::RenderingPdf => "生成PDF".to_string(),
            TaskStatus::Completed => "完成".to_string(),
            TaskStatus::Failed(reason) => format!("失败: {}", reason),
            TaskStatus::Stopped => "已停止".to_string(),
        }
    }

    pub fn display_class(&self) -> DisplayClass {
        DisplayClass::from_status_text(&self.label())
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// 任务列表中的显示分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayClass {
    Pending,
    Active,
    Success,
    Error,
}

impl DisplayClass {
    /// 根据状态文字推导分类
    pub fn from_status_text(text: &str) -> Self {
        if text == "完成" {
            DisplayClass::Success
        } else if text.contains("失败") || text.contains("错误") {
            DisplayClass::Error
        } else if text == "等待中" || text == "已停止" {
            DisplayClass::Pending
        } else {
            DisplayClass::Active
        }
    }
}

/// 任务进度：百分比或自由文本
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Percent(f64),
    Label(String),
}

impl Progress {
    /// 保留一位小数的百分比
    pub fn percent(done: u64, total: u64) -> Self {
        let raw = done as f64 / total as f64 * 100.0;
        Progress::Percent((raw * 10.0).round() / 10.0)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Percent(p) => write!(f, "{:.1}%", p),
            Progress::Label(text) => f.write_str(text),
        }
    }
}

/// 任务记录
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// 从 1 开始的序号
    pub ordinal: usize,
    pub url: String,
    pub status: TaskStatus,
    pub progress: Option<Progress>,
    pub resolved_filename: Option<String>,
}

impl Task {
    pub fn new(ordinal: usize, url: impl Into<String>) -> Self {
        Self {
            ordinal,
            url: url.into(),
            status: TaskStatus::Queued,
            progress: None,
            resolved_filename: None,
        }
    }

    pub fn display_class(&self) -> DisplayClass {
        self.status.display_class()
    }
}

/// 部分更新：只有提供的字段会被修改
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub ordinal: usize,
    pub status: Option<TaskStatus>,
    pub progress: Option<Progress>,
    pub filename: Option<String>,
}

impl TaskUpdate {
    #[cfg(test)]
    pub fn status(ordinal: usize, status: TaskStatus) -> Self {
        Self {
            ordinal,
            status: Some(status),
            progress: None,
            filename: None,
        }
    }

    #[cfg(test)]
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    #[cfg(test)]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}
