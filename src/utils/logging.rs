/// 日志工具模块
///
/// 提供日志初始化和批次横幅输出的辅助函数
use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::RunConfiguration;
use crate::models::RunSummary;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 `info`，`verbose` 时为 `debug`。
/// 重复调用不会报错（测试中可能多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 任务总数
/// - `config`: 本次运行的配置快照
pub fn log_run_start(total: usize, config: &RunConfiguration) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始批量下载 - 共 {} 个任务", total);
    info!("📁 保存目录: {}", config.destination.display());
    info!(
        "📄 页面: {:?}{} 缩放 {:.1}",
        config.page_format,
        if config.landscape { " 横向" } else { "" },
        config.scale
    );
    info!(
        "⚙️ 等待 {} 秒 | 屏蔽图片: {} | 移除弹窗: {} | 完整加载: {}",
        config.initial_wait_secs, config.block_images, config.remove_popups, config.full_load
    );
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `summary`: 运行汇总
/// - `destination`: 保存目录
pub fn print_final_stats(summary: &RunSummary, destination: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 {}", summary);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.completed, summary.total);
    info!("❌ 失败: {}", summary.failed);
    if summary.stopped > 0 {
        info!("⏹️ 已停止: {}", summary.stopped);
    }
    info!("{}", "=".repeat(60));
    info!("\n文件已保存至: {}", destination.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
