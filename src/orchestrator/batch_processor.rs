//! 批量下载处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **受理**：校验地址列表、快照配置、创建保存目录
//! 2. **调度**：在独立的后台线程里按顺序处理每个任务
//! 3. **分发**：PDF 资源走直接下载，网页走浏览器渲染
//! 4. **统计**：汇总完成 / 失败 / 停止的数量
//!
//! ## 线程模型
//!
//! 前台只持有 `BatchOrchestrator`；后台线程拥有自己的 tokio 运行时，
//! 所有显示相关的变化都以 `UiEvent` 发回前台。

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::clients::HttpClient;
use crate::config::{RunConfiguration, Settings};
use crate::error::{ConfigError, TransportError};
use crate::models::{BatchRun, Progress, RunSummary, Task, TaskStatus};
use crate::orchestrator::tracker::{CancelFlag, StatusTracker, TaskTracker, UiEvent};
use crate::services::filename::{filename_from_url, unique_path};
use crate::services::{DirectTransfer, ResourceClassifier, ResourceKind, TransferOutcome};
use crate::utils::logging::{log_run_start, print_final_stats, truncate_text};
use crate::utils::normalize_url;
use crate::workflow::{PageRenderer, RenderOutcome};

/// 单个任务的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { filename: String },
    Failed(String),
    Stopped,
}

/// 批量下载处理器
pub struct BatchOrchestrator {
    http: HttpClient,
    renderer: Arc<dyn PageRenderer>,
    active: Arc<AtomicBool>,
    cancel: CancelFlag,
    tracker: StatusTracker,
    worker: Option<JoinHandle<()>>,
}

impl BatchOrchestrator {
    /// 创建处理器，同时建立共享的 HTTP 会话
    pub fn new(renderer: Arc<dyn PageRenderer>, events: Sender<UiEvent>) -> Result<Self, TransportError> {
        let http = HttpClient::new()?;
        info!("🌐 HTTP 会话已建立 (UA: {})", truncate_text(http.user_agent(), 40));
        Ok(Self::with_http_client(http, renderer, events))
    }

    pub fn with_http_client(
        http: HttpClient,
        renderer: Arc<dyn PageRenderer>,
        events: Sender<UiEvent>,
    ) -> Self {
        Self {
            http,
            renderer,
            active: Arc::new(AtomicBool::new(false)),
            cancel: CancelFlag::new(),
            tracker: StatusTracker::new(events),
            worker: None,
        }
    }

    /// 是否有任务正在运行
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// 开始一批下载
    ///
    /// 受理后立即返回新建的任务列表，处理在后台线程进行。
    pub fn start(&mut self, urls: &[String], settings: &Settings) -> Result<Vec<Task>, ConfigError> {
        if self.is_active() {
            warn!("⚠️ 已有下载任务进行中，忽略本次请求");
            return Err(ConfigError::RunAlreadyActive);
        }

        let urls: Vec<String> = urls.iter().filter_map(|u| normalize_url(u)).collect();
        if urls.is_empty() {
            return Err(ConfigError::EmptyUrlList);
        }

        let config = RunConfiguration::from_settings(settings);
        ensure_destination(&config.destination)?;

        // 上一批的线程已经结束，回收句柄
        if let Some(previous) = self.worker.take() {
            if previous.join().is_err() {
                warn!("上一批后台线程异常退出");
            }
        }

        let tasks: Vec<Task> = urls
            .iter()
            .enumerate()
            .map(|(i, url)| Task::new(i + 1, url.clone()))
            .collect();

        self.cancel.reset();
        self.active.store(true, Ordering::SeqCst);
        self.tracker.emit(UiEvent::TasksReset(tasks.clone()));
        self.tracker.emit(UiEvent::RunProgress(0.0));

        let worker = BatchWorker {
            tasks: tasks.clone(),
            config,
            classifier: ResourceClassifier::new(self.http.clone()),
            transfer: DirectTransfer::new(self.http.clone()),
            renderer: Arc::clone(&self.renderer),
            cancel: self.cancel.clone(),
            tracker: self.tracker.clone(),
        };
        let active = Arc::clone(&self.active);

        let handle = std::thread::Builder::new()
            .name("batch-worker".to_string())
            .spawn(move || worker.run_on_own_runtime(active))
            .map_err(|e| {
                self.active.store(false, Ordering::SeqCst);
                error!("❌ 无法启动后台线程: {}", e);
                ConfigError::WorkerSpawnFailed(e.to_string())
            })?;

        self.worker = Some(handle);
        Ok(tasks)
    }

    /// 请求停止，当前任务在下一个检查点结束
    pub fn stop(&self) {
        if self.is_active() {
            info!("⏹️ 收到停止请求，等待当前任务结束...");
        }
        self.cancel.cancel();
    }

    /// 等待后台线程退出
    pub fn wait(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("后台线程异常退出");
            }
        }
    }
}

fn ensure_destination(dir: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        error!("❌ 无法创建保存目录 {}: {}", dir.display(), e);
        ConfigError::DestinationUnavailable {
            path: dir.display().to_string(),
            reason: e.to_string(),
        }
    })
}

/// 后台线程持有的全部状态
struct BatchWorker {
    tasks: Vec<Task>,
    config: RunConfiguration,
    classifier: ResourceClassifier,
    transfer: DirectTransfer,
    renderer: Arc<dyn PageRenderer>,
    cancel: CancelFlag,
    tracker: StatusTracker,
}

impl BatchWorker {
    fn run_on_own_runtime(self, active: Arc<AtomicBool>) {
        let tracker = self.tracker.clone();
        let destination = self.config.destination.clone();

        let summary = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.run()),
            Err(e) => {
                error!("❌ 无法创建异步运行时: {}", e);
                self.fail_all(&format!("无法创建异步运行时: {}", e))
            }
        };

        print_final_stats(&summary, &destination);

        // 先清除运行标志，前台收到结束事件时即可开始新一批
        active.store(false, Ordering::SeqCst);
        tracker.emit(UiEvent::RunStatus(summary.to_string()));
        tracker.emit(UiEvent::RunFinished(summary));
    }

    async fn run(&self) -> RunSummary {
        let total = self.tasks.len();
        let mut run = BatchRun::new(total);
        log_run_start(total, &self.config);

        for task in &self.tasks {
            if self.cancel.is_cancelled() {
                break;
            }

            let tracker = self.tracker.for_task(task.ordinal);
            tracker.status(TaskStatus::Starting);
            self.tracker
                .emit(UiEvent::RunStatus(format!("下载中 ({}/{})", task.ordinal, total)));
            info!("[任务 {}] 🔗 {}", task.ordinal, truncate_text(&task.url, 80));

            match self.process(task, &tracker).await {
                TaskOutcome::Completed { filename } => {
                    info!("[任务 {}] ✅ 完成: {}", task.ordinal, filename);
                    run.completed_tasks += 1;
                    tracker.finish(
                        TaskStatus::Completed,
                        Some(Progress::Percent(100.0)),
                        Some(filename),
                    );
                }
                TaskOutcome::Failed(reason) => {
                    error!("[任务 {}] ❌ 失败: {}", task.ordinal, reason);
                    run.failed_tasks += 1;
                    tracker.finish(TaskStatus::Failed(reason), None, None);
                }
                TaskOutcome::Stopped => {
                    info!("[任务 {}] ⏹️ 已停止", task.ordinal);
                    run.stopped_tasks += 1;
                    tracker.finish(TaskStatus::Stopped, None, None);
                }
            }

            self.tracker.emit(UiEvent::RunProgress(run.percent()));
        }

        // 取消后尚未开始的任务
        for task in self.tasks.iter().skip(run.processed()) {
            run.stopped_tasks += 1;
            self.tracker.for_task(task.ordinal).finish(TaskStatus::Stopped, None, None);
        }
        if run.stopped_tasks > 0 {
            self.tracker.emit(UiEvent::RunProgress(run.percent()));
        }

        run.cancel_requested = self.cancel.is_cancelled();
        run.summary()
    }

    /// 处理单个任务：判断类型 → 确定文件名 → 分发
    async fn process(&self, task: &Task, tracker: &TaskTracker) -> TaskOutcome {
        let kind = self.classifier.classify(&task.url, Some(tracker)).await;
        debug!("[任务 {}] 资源类型: {:?}", task.ordinal, kind);

        if self.cancel.is_cancelled() {
            return TaskOutcome::Stopped;
        }

        let filename = filename_from_url(&task.url, kind, Local::now());
        let destination = unique_path(&self.config.destination, &filename);

        match kind {
            ResourceKind::DirectPdf => {
                match self
                    .transfer
                    .fetch(&task.url, &destination, &self.cancel, tracker)
                    .await
                {
                    TransferOutcome::Completed { path, bytes } => {
                        debug!("[任务 {}] 已写入 {} 字节", task.ordinal, bytes);
                        TaskOutcome::Completed {
                            filename: display_name(&path),
                        }
                    }
                    TransferOutcome::Failed(e) => TaskOutcome::Failed(e.to_string()),
                    TransferOutcome::Cancelled { .. } => TaskOutcome::Stopped,
                }
            }
            ResourceKind::Rendered => {
                match self
                    .renderer
                    .render(&task.url, &destination, &self.config, &self.cancel, tracker)
                    .await
                {
                    RenderOutcome::Written(path) => TaskOutcome::Completed {
                        filename: display_name(&path),
                    },
                    RenderOutcome::Failed(e) => TaskOutcome::Failed(e.to_string()),
                    RenderOutcome::Cancelled => TaskOutcome::Stopped,
                }
            }
        }
    }

    /// 运行时都无法创建时，所有任务直接失败
    fn fail_all(&self, reason: &str) -> RunSummary {
        let mut run = BatchRun::new(self.tasks.len());
        for task in &self.tasks {
            self.tracker
                .for_task(task.ordinal)
                .finish(TaskStatus::Failed(reason.to_string()), None, None);
            run.failed_tasks += 1;
        }
        run.summary()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
