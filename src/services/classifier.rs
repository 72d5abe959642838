//! 资源类型判断 - 业务能力层
//!
//! 先看扩展名，再用 HEAD 请求探测，探测失败一律按网页处理。

use tracing::{debug, info};

use crate::clients::{HttpClient, ProbeOutcome};
use crate::models::TaskStatus;
use crate::orchestrator::tracker::TaskTracker;

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// 直接是 PDF 文件
    DirectPdf,
    /// 需要浏览器渲染的网页
    Rendered,
}

/// 资源类型判断服务
pub struct ResourceClassifier {
    http: HttpClient,
}

impl ResourceClassifier {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// 判断 URL 指向的资源类型
    ///
    /// 只有真正发出探测请求时才会上报 `Probing` 状态。
    pub async fn classify(&self, url: &str, tracker: Option<&TaskTracker>) -> ResourceKind {
        if has_pdf_extension(url) {
            debug!("扩展名为 .pdf，跳过探测: {}", url);
            return ResourceKind::DirectPdf;
        }

        if let Some(tracker) = tracker {
            tracker.status(TaskStatus::Probing);
        }

        match self.http.probe(url).await {
            ProbeOutcome::Pdf => ResourceKind::DirectPdf,
            ProbeOutcome::NotPdf { content_type } => {
                debug!("非 PDF 资源 ({:?}): {}", content_type, url);
                ResourceKind::Rendered
            }
            ProbeOutcome::Failed(reason) => {
                info!("探测失败，按网页处理: {} ({})", url, reason);
                ResourceKind::Rendered
            }
        }
    }
}

/// URL 路径是否以 `.pdf` 结尾（不区分大小写）
pub fn has_pdf_extension(url: &str) -> bool {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.to_ascii_lowercase().ends_with(".pdf")
}
