//! 弹窗处理
//!
//! 同意按钮的点击是尽力而为：找不到或点不动都不影响任务。

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::AutomationResult;
use crate::infrastructure::JsExecutor;
use crate::workflow::scripts::{CLICK_FIRST_VISIBLE, SWEEP_OVERLAYS};

/// 点击后等待横幅消失的时间
const AFTER_CLICK_PAUSE: Duration = Duration::from_millis(500);

/// 同意按钮的定位方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentTarget {
    /// 按钮文字包含
    ButtonText(&'static str),
    /// CSS 选择器
    Css(&'static str),
}

/// 按顺序探测的同意按钮
pub const CONSENT_TARGETS: &[ConsentTarget] = &[
    ConsentTarget::ButtonText("OK, Got it"),
    ConsentTarget::ButtonText("Accept"),
    ConsentTarget::ButtonText("Accept all"),
    ConsentTarget::ButtonText("I agree"),
    ConsentTarget::ButtonText("同意"),
    ConsentTarget::Css(r#"[aria-label*="accept"]"#),
    ConsentTarget::Css(r#"[aria-label*="Accept"]"#),
];

impl ConsentTarget {
    fn script(&self) -> String {
        let (kind, needle) = match self {
            ConsentTarget::ButtonText(text) => ("text", *text),
            ConsentTarget::Css(selector) => ("css", *selector),
        };
        let kind = serde_json::Value::from(kind).to_string();
        let needle = serde_json::Value::from(needle).to_string();
        CLICK_FIRST_VISIBLE
            .replace("__KIND__", &kind)
            .replace("__NEEDLE__", &needle)
    }
}

/// 同意按钮处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupDismissal {
    Clicked(ConsentTarget),
    NotFound,
}

/// 点击第一个可见的同意按钮，找到后立即停止
pub async fn dismiss_consent(executor: &JsExecutor) -> PopupDismissal {
    for target in CONSENT_TARGETS {
        match executor.eval_as::<bool>(target.script()).await {
            Ok(true) => {
                debug!("已点击同意按钮: {:?}", target);
                sleep(AFTER_CLICK_PAUSE).await;
                return PopupDismissal::Clicked(*target);
            }
            Ok(false) => {}
            Err(e) => debug!("探测同意按钮 {:?} 失败: {}", target, e),
        }
    }
    PopupDismissal::NotFound
}

/// 清除遮罩层并恢复滚动，返回移除的元素数
pub async fn sweep_overlays(executor: &JsExecutor) -> AutomationResult<u64> {
    let removed: u64 = executor.eval_as(SWEEP_OVERLAYS).await?;
    debug!("已移除 {} 个遮罩元素", removed);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_text_match_ignores_case() {
        let script = ConsentTarget::ButtonText("Accept all").script();
        assert!(script.contains("const wanted = needle.toLowerCase();"));
        assert!(script.contains(".toLowerCase().includes(wanted)"));
        assert!(!script.contains(".includes(needle)"));
    }

    #[test]
    fn test_consent_script_embeds_escaped_needle() {
        let script = ConsentTarget::Css(r#"[aria-label*="accept"]"#).script();
        assert!(script.contains(r#"const kind = "css";"#));
        assert!(script.contains(r#"const needle = "[aria-label*=\"accept\"]";"#));

        let script = ConsentTarget::ButtonText("同意").script();
        assert!(script.contains(r#"const needle = "同意";"#));
    }

    #[test]
    fn test_text_targets_come_before_selectors() {
        let first_css = CONSENT_TARGETS
            .iter()
            .position(|t| matches!(t, ConsentTarget::Css(_)))
            .unwrap();
        assert!(CONSENT_TARGETS[..first_css]
            .iter()
            .all(|t| matches!(t, ConsentTarget::ButtonText(_))));
        assert_eq!(CONSENT_TARGETS[0], ConsentTarget::ButtonText("OK, Got it"));
    }
}
