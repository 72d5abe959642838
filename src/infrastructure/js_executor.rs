//! JS 执行器 - 基础设施层
//!
//! 持有页面资源，只暴露"在页面里执行 JS"的能力，每次执行都受默认超时约束。

use std::time::Duration;

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::error::{AutomationError, AutomationResult};

/// 等待条件时的轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// JS 执行器
///
/// 职责：
/// - 持有 Page 的一个句柄
/// - 暴露 eval() 能力，并套上统一的超时
/// - 不认识任务、不处理流程
#[derive(Clone)]
pub struct JsExecutor {
    page: Page,
    operation_timeout: Duration,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page, operation_timeout: Duration) -> Self {
        Self {
            page,
            operation_timeout,
        }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AutomationResult<JsonValue> {
        let js_code = js_code.into();
        let result = timeout(self.operation_timeout, self.page.evaluate(js_code))
            .await
            .map_err(|_| AutomationError::timeout("执行脚本", self.operation_timeout))??;

        // 无返回值的脚本得到 undefined，统一视为 null
        Ok(result.into_value().unwrap_or(JsonValue::Null))
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AutomationResult<T> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(|e| AutomationError::ScriptFailed(e.to_string()))
    }

    /// 反复执行返回布尔值的脚本，直到为真或超过 `limit`
    ///
    /// 导航过程中执行上下文可能被销毁，此时的错误视为"尚未满足"。
    pub async fn wait_until(
        &self,
        operation: &str,
        condition_js: &str,
        limit: Duration,
    ) -> AutomationResult<()> {
        let deadline = Instant::now() + limit;
        loop {
            match self.eval_as::<bool>(condition_js).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => debug!("{} 条件检查失败: {}", operation, e),
            }
            if Instant::now() >= deadline {
                return Err(AutomationError::timeout(operation, limit));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// 读取页面标题
    pub async fn title(&self) -> AutomationResult<Option<String>> {
        let title = timeout(self.operation_timeout, self.page.get_title())
            .await
            .map_err(|_| AutomationError::timeout("读取标题", self.operation_timeout))??;
        Ok(title)
    }

    /// 当前文档的滚动高度
    pub async fn scroll_height(&self) -> AutomationResult<u64> {
        let height: f64 = self
            .eval_as("Math.max(document.body ? document.body.scrollHeight : 0, document.documentElement.scrollHeight)")
            .await?;
        Ok(height.max(0.0) as u64)
    }

    pub async fn scroll_to_bottom(&self) -> AutomationResult<()> {
        self.eval("window.scrollTo(0, document.body.scrollHeight)").await?;
        Ok(())
    }

    pub async fn scroll_to_top(&self) -> AutomationResult<()> {
        self.eval("window.scrollTo(0, 0)").await?;
        Ok(())
    }
}
