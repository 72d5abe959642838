//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量下载处理器
//! - 受理一批地址，快照配置
//! - 拥有唯一的后台线程，按顺序处理任务
//! - 汇总运行结果
//!
//! ### `tracker` - 状态通知
//! - 后台通过通道发送任务更新
//! - 取消标志
//!
//! ## 层次关系
//!
//! ```text
//! view::TaskBoard (前台，消费事件)
//!     ↑ UiEvent
//! batch_processor (处理 Vec<Task>)
//!     ↓
//! services (类型判断 / 直接下载) + workflow (网页渲染)
//!     ↓
//! clients / infrastructure (HTTP、JsExecutor)
//! ```

pub mod batch_processor;
pub mod tracker;

pub use batch_processor::{BatchOrchestrator, TaskOutcome};
pub use tracker::{CancelFlag, StatusTracker, TaskTracker, UiEvent};
