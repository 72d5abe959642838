//! 网页转 PDF 流程 - 流程层
//!
//! 流程顺序：
//! 1. 启动浏览器（身份、Cookie、安全策略）
//! 2. 可选：拦截图片
//! 3. 导航，只等 DOM 构建完成
//! 4. 可选：点击同意按钮
//! 5. 等待 load（失败不致命）
//! 6. 额外等待
//! 7. 可选：清除遮罩层
//! 8. 可选：激活懒加载 + 滚动直到高度稳定
//! 9. 用网页标题命名
//! 10. 打印 PDF
//!
//! 每一步之前检查取消标志；无论从哪里退出，浏览器都会被关闭。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{NavigateParams, PrintToPdfParams};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::browser::{launch_headless_browser, BrowserOptions, BrowserSession};
use crate::clients::random_user_agent;
use crate::config::{PageFormat, RunConfiguration};
use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::JsExecutor;
use crate::models::{Progress, TaskStatus};
use crate::orchestrator::tracker::{CancelFlag, TaskTracker};
use crate::services::filename::{title_filename, unique_path};
use crate::workflow::popups::{dismiss_consent, sweep_overlays, PopupDismissal};
use crate::workflow::scripts::{ACTIVATE_LAZY_CONTENT, DOM_READY, LOAD_COMPLETE};
use crate::workflow::scroll::{scroll_until_stable, ScrollOutcome, ScrollSettings};

pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(45);
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// 点击同意按钮前等待横幅出现
const BANNER_RENDER_WAIT: Duration = Duration::from_secs(1);
/// 回到顶部后等待首屏内容重新稳定
const SETTLE_AFTER_SCROLL: Duration = Duration::from_secs(1);
/// 四边 1cm 页边距（英寸）
const MARGIN_INCHES: f64 = 1.0 / 2.54;

/// 渲染结果
#[derive(Debug)]
pub enum RenderOutcome {
    /// 实际写入的路径（可能因网页标题而与目标路径不同）
    Written(PathBuf),
    Cancelled,
    Failed(AutomationError),
}

/// 网页渲染能力
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(
        &self,
        url: &str,
        destination: &Path,
        config: &RunConfiguration,
        cancel: &CancelFlag,
        tracker: &TaskTracker,
    ) -> RenderOutcome;
}

/// 基于 Chromium 的渲染器
pub struct ChromeRenderer {
    options: BrowserOptions,
}

impl ChromeRenderer {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(
        &self,
        url: &str,
        destination: &Path,
        config: &RunConfiguration,
        cancel: &CancelFlag,
        tracker: &TaskTracker,
    ) -> RenderOutcome {
        if cancel.is_cancelled() {
            return RenderOutcome::Cancelled;
        }

        tracker.status(TaskStatus::LaunchingBrowser);
        let mut session = match launch_headless_browser(&self.options, random_user_agent()).await {
            Ok(session) => session,
            Err(e) => return RenderOutcome::Failed(e),
        };

        let result = drive_page(&mut session, url, destination, config, cancel, tracker).await;
        session.close().await;

        match result {
            Ok(Some(path)) => RenderOutcome::Written(path),
            Ok(None) => RenderOutcome::Cancelled,
            Err(e) => RenderOutcome::Failed(e),
        }
    }
}

/// 执行页面流程，取消时返回 `Ok(None)`
async fn drive_page(
    session: &mut BrowserSession,
    url: &str,
    destination: &Path,
    config: &RunConfiguration,
    cancel: &CancelFlag,
    tracker: &TaskTracker,
) -> AutomationResult<Option<PathBuf>> {
    let ordinal = tracker.ordinal();

    if config.block_images {
        session.block_images().await?;
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }
    tracker.status(TaskStatus::LoadingPage);
    let executor = session.executor();
    navigate(session, &executor, url).await?;
    info!("[任务 {}] ✓ 页面 DOM 已加载: {}", ordinal, url);

    if cancel.is_cancelled() {
        return Ok(None);
    }
    if config.remove_popups {
        sleep(BANNER_RENDER_WAIT).await;
        match dismiss_consent(&executor).await {
            PopupDismissal::Clicked(target) => info!("[任务 {}] 已点击同意按钮 {:?}", ordinal, target),
            PopupDismissal::NotFound => debug!("[任务 {}] 未发现同意按钮", ordinal),
        }
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }
    if let Err(e) = executor.wait_until("等待页面加载", LOAD_COMPLETE, LOAD_TIMEOUT).await {
        warn!("[任务 {}] ⚠️ {}，继续处理", ordinal, e);
    }

    if config.initial_wait_secs > 0 {
        tracker.progress(Progress::Label(format!("等待{}秒", config.initial_wait_secs)));
        for _ in 0..config.initial_wait_secs {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            sleep(Duration::from_secs(1)).await;
        }
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }
    if config.remove_popups {
        tracker.status(TaskStatus::RemovingPopups);
        sweep_overlays(&executor).await?;
    }

    if config.full_load {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        tracker.status(TaskStatus::ActivatingLazyContent);
        executor.eval(ACTIVATE_LAZY_CONTENT).await?;

        tracker.status(TaskStatus::ScrollingToStabilize);
        let settings = ScrollSettings {
            pause: config.scroll_pause,
            max_time: config.max_scroll_time,
            settle: SETTLE_AFTER_SCROLL,
        };
        match scroll_until_stable(&executor, settings, cancel).await? {
            ScrollOutcome::Cancelled => return Ok(None),
            outcome => debug!("[任务 {}] {:?}", ordinal, outcome),
        }
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }
    tracker.status(TaskStatus::RenderingPdf);
    let output = titled_destination(&executor, destination).await;

    let params = pdf_params(config);
    let limit = session.operation_timeout();
    let bytes = timeout(limit, session.page().pdf(params))
        .await
        .map_err(|_| AutomationError::timeout("生成PDF", limit))?
        .map_err(|e| AutomationError::RenderFailed(e.to_string()))?;

    tokio::fs::write(&output, &bytes)
        .await
        .map_err(|e| AutomationError::RenderFailed(format!("写入 {} 失败: {}", output.display(), e)))?;

    info!("[任务 {}] ✓ PDF 已生成 ({} 字节): {}", ordinal, bytes.len(), output.display());
    Ok(Some(output))
}

/// 导航到 URL，只等待 DOM 构建完成
async fn navigate(session: &BrowserSession, executor: &JsExecutor, url: &str) -> AutomationResult<()> {
    let started = Instant::now();
    let response = timeout(NAVIGATION_TIMEOUT, session.page().execute(NavigateParams::new(url)))
        .await
        .map_err(|_| AutomationError::timeout("页面导航", NAVIGATION_TIMEOUT))?
        .map_err(|e| AutomationError::NavigationFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if let Some(reason) = response.result.error_text.clone() {
        return Err(AutomationError::NavigationFailed {
            url: url.to_string(),
            reason,
        });
    }

    let remaining = NAVIGATION_TIMEOUT.saturating_sub(started.elapsed());
    executor.wait_until("页面导航", DOM_READY, remaining).await
}

/// 用网页标题替换目标文件名，失败时沿用原路径
async fn titled_destination(executor: &JsExecutor, destination: &Path) -> PathBuf {
    let title = match executor.title().await {
        Ok(Some(title)) => title,
        Ok(None) => return destination.to_path_buf(),
        Err(e) => {
            debug!("读取标题失败: {}", e);
            return destination.to_path_buf();
        }
    };

    let Some(dir) = destination.parent() else {
        return destination.to_path_buf();
    };

    match title_filename(&title, chrono::Local::now()) {
        Some(name) => unique_path(dir, &name),
        None => destination.to_path_buf(),
    }
}

/// 生成打印参数
pub fn pdf_params(config: &RunConfiguration) -> PrintToPdfParams {
    let (width, height) = paper_size(config.page_format);
    PrintToPdfParams::builder()
        .landscape(config.landscape)
        .print_background(config.print_background)
        .scale(config.scale)
        .paper_width(width)
        .paper_height(height)
        .margin_top(MARGIN_INCHES)
        .margin_bottom(MARGIN_INCHES)
        .margin_left(MARGIN_INCHES)
        .margin_right(MARGIN_INCHES)
        .prefer_css_page_size(true)
        .build()
}

fn paper_size(format: PageFormat) -> (f64, f64) {
    format.size_inches()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn test_pdf_params_follow_run_configuration() {
        let config = RunConfiguration::from_settings(&Settings {
            page_size: PageFormat::Letter,
            landscape: true,
            scale: 1.5,
            print_background: false,
            ..Settings::default()
        });

        let params = pdf_params(&config);
        assert_eq!(params.landscape, Some(true));
        assert_eq!(params.print_background, Some(false));
        assert_eq!(params.scale, Some(1.5));
        assert_eq!(params.paper_width, Some(8.5));
        assert_eq!(params.paper_height, Some(11.0));
        assert_eq!(params.prefer_css_page_size, Some(true));
        let margin = params.margin_left.unwrap();
        assert!((margin * 2.54 - 1.0).abs() < 1e-9);
    }
}
