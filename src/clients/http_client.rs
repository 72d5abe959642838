//! HTTP 客户端
//!
//! 提供两种能力：仅请求头的类型探测，以及流式 GET 下载。

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use tracing::debug;

use crate::clients::user_agent::random_user_agent;
use crate::error::TransportError;

/// 类型探测超时
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// 下载请求及每次读取的超时
pub const BODY_TIMEOUT: Duration = Duration::from_secs(30);

/// 探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 声明的类型包含 application/pdf
    Pdf,
    /// 探测成功但不是 PDF
    NotPdf { content_type: Option<String> },
    /// 探测失败（超时、连接错误、非 2xx）
    Failed(String),
}

/// 共享的 HTTP 会话
///
/// 创建时随机选定一个 User-Agent，之后所有请求复用。
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new() -> Result<Self, TransportError> {
        let user_agent = random_user_agent().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .user_agent(user_agent.clone())
            .default_headers(headers)
            .connect_timeout(BODY_TIMEOUT)
            .build()
            .map_err(|e| TransportError::from_reqwest("", e))?;

        Ok(Self { client, user_agent })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// 发送 HEAD 请求探测资源类型
    ///
    /// 不会返回错误，所有失败都折叠为 `ProbeOutcome::Failed`。
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let response = match self.client.head(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::Failed(TransportError::from_reqwest(url, e).to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeOutcome::Failed(
                TransportError::Status {
                    url: url.to_string(),
                    code: status.as_u16(),
                }
                .to_string(),
            );
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase());
        debug!("探测 {} -> {:?}", url, content_type);

        match content_type {
            Some(ct) if ct.contains("application/pdf") => ProbeOutcome::Pdf,
            content_type => ProbeOutcome::NotPdf { content_type },
        }
    }

    /// 发起 GET 请求并返回尚未读取正文的响应
    pub async fn get_stream(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        let send = self.client.get(url).send();
        let response = tokio::time::timeout(BODY_TIMEOUT, send)
            .await
            .map_err(|_| TransportError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        Ok(response)
    }
}
