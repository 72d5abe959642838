//! # Batch PDF Downloader
//!
//! 批量下载 PDF 文件，或用无头浏览器把网页打印成 PDF
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `clients/` - HTTP 会话（HEAD 探测、流式下载）和 User-Agent 轮换
//! - `browser/` - 无头浏览器会话，持有浏览器进程，任何出口都会关闭
//! - `infrastructure/` - `JsExecutor`，页面脚本执行，统一超时
//!
//! ### ② 业务能力层（Services）
//! - `ResourceClassifier` - 判断 URL 是 PDF 还是网页
//! - `DirectTransfer` - 分块写入的 PDF 下载
//! - `filename` - 文件名推导与去重
//!
//! ### ③ 流程层（Workflow）
//! - `ChromeRenderer` - 导航 → 弹窗 → 懒加载 → 滚动 → 打印
//!
//! ### ④ 编排层（Orchestration）
//! - `BatchOrchestrator` - 唯一的后台线程，按顺序处理任务
//! - `tracker` - 后台到前台的事件通道和取消标志
//!
//! ### ⑤ 显示层（View）
//! - `TaskBoard` - 前台唯一修改显示状态的地方

pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod view;
pub mod workflow;

// 重新导出常用类型
pub use config::{AppConfig, PageFormat, RunConfiguration, Settings};
pub use error::{AppError, AppResult};
pub use models::{Task, TaskStatus};
pub use orchestrator::{BatchOrchestrator, CancelFlag, UiEvent};
pub use view::TaskBoard;
pub use workflow::{ChromeRenderer, PageRenderer, RenderOutcome};
