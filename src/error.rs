use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 网络传输错误
    #[error("网络错误: {0}")]
    Transport(#[from] TransportError),
    /// 浏览器自动化错误
    #[error("浏览器错误: {0}")]
    Automation(#[from] AutomationError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 网络传输错误
///
/// 探测阶段出现时降级为网页渲染，下载阶段出现时任务失败，都不会中断整个批次。
#[derive(Debug, Error)]
pub enum TransportError {
    /// 请求超时
    #[error("请求超时 ({url})")]
    Timeout { url: String },
    /// 服务器返回非 2xx 状态码
    #[error("HTTP {code} ({url})")]
    Status { url: String, code: u16 },
    /// 连接、DNS 等请求失败
    #[error("{source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 写入目标文件失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 浏览器自动化错误
#[derive(Debug, Error)]
pub enum AutomationError {
    /// 浏览器配置失败
    #[error("浏览器配置失败: {0}")]
    ConfigurationFailed(String),
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {reason}")]
    NavigationFailed { url: String, reason: String },
    /// 操作超时
    #[error("{operation} 超时 ({seconds}秒)")]
    Timeout { operation: String, seconds: u64 },
    /// 执行脚本失败
    #[error("执行脚本失败: {0}")]
    ScriptFailed(String),
    /// 生成 PDF 失败
    #[error("生成PDF失败: {0}")]
    RenderFailed(String),
    /// 底层 CDP 协议错误
    #[error("{0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 创建目录失败
    #[error("创建目录失败 ({}): {source}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 序列化配置失败
    #[error("序列化配置失败: {0}")]
    SerializeFailed(String),
}

/// 配置错误
///
/// 在 `start()` 中同步返回，此时尚未创建任何任务。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 没有任何下载地址
    #[error("请输入下载地址")]
    EmptyUrlList,
    /// 已有任务在运行
    #[error("已有下载任务进行中")]
    RunAlreadyActive,
    /// 保存目录无法创建
    #[error("无法创建保存目录 {path}: {reason}")]
    DestinationUnavailable { path: String, reason: String },
    /// 无法创建后台线程
    #[error("无法启动后台任务: {0}")]
    WorkerSpawnFailed(String),
}

impl From<serde_json::Error> for FileError {
    fn from(err: serde_json::Error) -> Self {
        FileError::SerializeFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for FileError {
    fn from(err: toml::ser::Error) -> Self {
        FileError::SerializeFailed(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl TransportError {
    /// 根据 reqwest 错误构造，超时单独归类
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            TransportError::Timeout { url }
        } else if let Some(status) = source.status() {
            TransportError::Status {
                url,
                code: status.as_u16(),
            }
        } else {
            TransportError::Request { url, source }
        }
    }
}

impl AutomationError {
    /// 创建超时错误
    pub fn timeout(operation: impl Into<String>, limit: std::time::Duration) -> Self {
        AutomationError::Timeout {
            operation: operation.into(),
            seconds: limit.as_secs(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 浏览器操作结果类型
pub type AutomationResult<T> = Result<T, AutomationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        assert_eq!(ConfigError::EmptyUrlList.to_string(), "请输入下载地址");
        assert_eq!(
            ConfigError::RunAlreadyActive.to_string(),
            "已有下载任务进行中"
        );
    }

    #[test]
    fn test_app_error_wraps_layer_message() {
        let err: AppError = TransportError::Status {
            url: "https://example.com/a.pdf".to_string(),
            code: 404,
        }
        .into();
        assert_eq!(err.to_string(), "网络错误: HTTP 404 (https://example.com/a.pdf)");
    }

    #[test]
    fn test_timeout_error_reports_seconds() {
        let err = AutomationError::timeout("页面导航", std::time::Duration::from_secs(45));
        assert_eq!(err.to_string(), "页面导航 超时 (45秒)");
    }
}
