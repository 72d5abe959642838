use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::SetLocaleOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, ErrorReason, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::SetBypassCspParams;
use chromiumoxide::cdp::browser_protocol::security::SetIgnoreCertificateErrorsParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::JsExecutor;

pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// 页面操作的默认超时
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// 屏蔽图片时拦截的 URL 模式
pub const IMAGE_PATTERNS: &[&str] = &["*.png*", "*.jpg*", "*.jpeg*", "*.gif*", "*.webp*", "*.svg*"];

const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-web-security",
    "--disable-features=IsolateOrigins,site-per-process",
    "--disable-setuid-sandbox",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
    "--ignore-certificate-errors",
];

/// 预置的同意 Cookie，用于跳过特定站点的同意横幅
const CONSENT_COOKIES: &[(&str, &str, &str)] = &[
    ("CONSENT", "YES+", ".kaggle.com"),
    ("kaggle_cookie_consent", "accepted", ".kaggle.com"),
];

/// 浏览器启动选项
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// 浏览器可执行文件，为空时自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 浏览器语言
    pub locale: String,
    /// 页面操作的默认超时
    pub operation_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            locale: "zh-CN".to_string(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

/// 会话专用的浏览器配置目录
///
/// Cookie、缓存、localStorage 都只存在于这里，目录在值被丢弃时删除。
#[derive(Debug)]
pub struct BrowserProfile {
    dir: TempDir,
}

impl BrowserProfile {
    pub fn create() -> AutomationResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("pdf-render-profile-")
            .tempdir()
            .map_err(|e| AutomationError::ConfigurationFailed(format!("创建浏览器配置目录失败: {}", e)))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// 一次独立的无头浏览器会话
///
/// 持有浏览器进程、事件处理任务、唯一的页面和专用配置目录，必须通过 `close()` 释放。
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    interceptor: Option<JoinHandle<()>>,
    operation_timeout: Duration,
    profile: BrowserProfile,
}

/// 生成浏览器启动配置，每个会话使用自己的配置目录
fn browser_config(options: &BrowserOptions, profile: &BrowserProfile) -> AutomationResult<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .new_headless_mode()
        .user_data_dir(profile.path())
        .viewport(Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            ..Viewport::default()
        })
        .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .request_timeout(options.operation_timeout)
        .args(LAUNCH_ARGS.iter().copied());

    if let Some(path) = &options.chrome_executable {
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(|e| {
        error!("配置无头浏览器失败: {}", e);
        AutomationError::ConfigurationFailed(e)
    })
}

/// 启动无头浏览器并准备好空白页面
pub async fn launch_headless_browser(
    options: &BrowserOptions,
    user_agent: &str,
) -> AutomationResult<BrowserSession> {
    info!("🚀 启动无头浏览器...");

    let profile = BrowserProfile::create()?;
    debug!("浏览器配置目录: {}", profile.path().display());
    let config = browser_config(options, &profile)?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        AutomationError::LaunchFailed { source: e }
    })?;
    debug!("无头浏览器启动成功");

    // 在后台处理浏览器事件
    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("创建页面失败: {}", e);
            let mut browser = browser;
            if let Err(e) = browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("等待浏览器进程退出失败: {}", e);
            }
            handler.abort();
            return Err(e.into());
        }
    };

    let session = BrowserSession {
        browser,
        page,
        handler,
        interceptor: None,
        operation_timeout: options.operation_timeout,
        profile,
    };

    // 配置失败时也要关闭浏览器
    match session.prepare_context(options, user_agent).await {
        Ok(()) => Ok(session),
        Err(e) => {
            session.close().await;
            Err(e)
        }
    }
}

impl BrowserSession {
    /// 设置身份、语言、安全策略和预置 Cookie
    async fn prepare_context(&self, options: &BrowserOptions, user_agent: &str) -> AutomationResult<()> {
        let mut ua = SetUserAgentOverrideParams::new(user_agent.to_string());
        ua.accept_language = Some(accept_language(&options.locale));
        self.page.execute(ua).await?;

        self.page
            .execute(SetLocaleOverrideParams::builder().locale(options.locale.clone()).build())
            .await?;
        self.page.execute(SetBypassCspParams::new(true)).await?;
        self.page
            .execute(SetIgnoreCertificateErrorsParams::new(true))
            .await?;

        let mut cookies = Vec::with_capacity(CONSENT_COOKIES.len());
        for (name, value, domain) in CONSENT_COOKIES {
            let cookie = CookieParam::builder()
                .name(*name)
                .value(*value)
                .domain(*domain)
                .path("/")
                .build()
                .map_err(AutomationError::ConfigurationFailed)?;
            cookies.push(cookie);
        }
        self.page.set_cookies(cookies).await?;

        debug!("浏览器上下文已配置 (UA: {})", user_agent);
        Ok(())
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// 基于当前页面创建 JS 执行器
    pub fn executor(&self) -> JsExecutor {
        JsExecutor::new(self.page.clone(), self.operation_timeout)
    }

    /// 拦截并中止所有图片请求
    pub async fn block_images(&mut self) -> AutomationResult<()> {
        let patterns = IMAGE_PATTERNS
            .iter()
            .map(|p| {
                RequestPattern::builder()
                    .url_pattern(*p)
                    .request_stage(RequestStage::Request)
                    .build()
            })
            .collect::<Vec<_>>();

        let mut paused = self.page.event_listener::<EventRequestPaused>().await?;
        self.page
            .execute(EnableParams::builder().patterns(patterns).build())
            .await?;

        let page = self.page.clone();
        self.interceptor = Some(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let abort = FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
                if let Err(e) = page.execute(abort).await {
                    debug!("中止图片请求失败: {}", e);
                }
            }
        }));

        debug!("已启用图片拦截");
        Ok(())
    }

    /// 关闭浏览器，任何出口都必须调用
    pub async fn close(mut self) {
        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }
        if let Err(e) = self.browser.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("等待浏览器进程退出失败: {}", e);
        }
        self.handler.abort();
        // 进程退出后再删除配置目录
        debug!("浏览器已关闭，删除配置目录 {}", self.profile.path().display());
    }
}

fn accept_language(locale: &str) -> String {
    let primary = locale.split('-').next().unwrap_or(locale);
    if primary == locale {
        locale.to_string()
    } else {
        format!("{},{};q=0.9,en;q=0.8", locale, primary)
    }
}
