//! 滚动加载
//!
//! 页面没有"已全部加载"的信号，只能反复滚到底部观察高度：
//! 连续 3 次高度不变，或者总时间超过上限，就认为加载结束。

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::AutomationResult;
use crate::infrastructure::JsExecutor;
use crate::orchestrator::tracker::CancelFlag;

/// 连续多少次高度不变视为稳定
pub const STABLE_ROUNDS: u32 = 3;

/// 可滚动的页面
#[async_trait]
pub trait ScrollSurface: Send + Sync {
    async fn scroll_height(&self) -> AutomationResult<u64>;
    async fn scroll_to_bottom(&self) -> AutomationResult<()>;
    async fn scroll_to_top(&self) -> AutomationResult<()>;
}

#[async_trait]
impl ScrollSurface for JsExecutor {
    async fn scroll_height(&self) -> AutomationResult<u64> {
        JsExecutor::scroll_height(self).await
    }

    async fn scroll_to_bottom(&self) -> AutomationResult<()> {
        JsExecutor::scroll_to_bottom(self).await
    }

    async fn scroll_to_top(&self) -> AutomationResult<()> {
        JsExecutor::scroll_to_top(self).await
    }
}

/// 滚动参数
#[derive(Debug, Clone, Copy)]
pub struct ScrollSettings {
    /// 每次滚动后的停顿
    pub pause: Duration,
    /// 循环的最长时间
    pub max_time: Duration,
    /// 回到顶部后的停顿
    pub settle: Duration,
}

/// 滚动结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// 高度连续稳定
    Stabilized { rounds: u32, height: u64 },
    /// 达到时间上限
    TimedOut { rounds: u32, height: u64 },
    Cancelled,
}

/// 滚动直到页面高度稳定
pub async fn scroll_until_stable<S: ScrollSurface + ?Sized>(
    surface: &S,
    settings: ScrollSettings,
    cancel: &CancelFlag,
) -> AutomationResult<ScrollOutcome> {
    let started = Instant::now();
    let mut last_height = 0;
    let mut unchanged = 0;
    let mut rounds = 0;

    let outcome = loop {
        if cancel.is_cancelled() {
            return Ok(ScrollOutcome::Cancelled);
        }

        let height = surface.scroll_height().await?;
        rounds += 1;

        if height == last_height {
            unchanged += 1;
            if unchanged >= STABLE_ROUNDS {
                break ScrollOutcome::Stabilized { rounds, height };
            }
        } else {
            unchanged = 0;
        }
        last_height = height;

        surface.scroll_to_bottom().await?;
        sleep(settings.pause).await;

        if started.elapsed() > settings.max_time {
            break ScrollOutcome::TimedOut { rounds, height };
        }
    };

    debug!("滚动结束: {:?}，耗时 {:?}", outcome, started.elapsed());

    surface.scroll_to_top().await?;
    sleep(settings.settle).await;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 模拟页面：高度按给定规则变化
    struct FakePage {
        heights: Vec<u64>,
        reads: AtomicUsize,
        grow: Option<AtomicU64>,
        scrolled_to_top: AtomicUsize,
    }

    impl FakePage {
        fn with_heights(heights: Vec<u64>) -> Self {
            Self {
                heights,
                reads: AtomicUsize::new(0),
                grow: None,
                scrolled_to_top: AtomicUsize::new(0),
            }
        }

        fn always_growing() -> Self {
            Self {
                heights: Vec::new(),
                reads: AtomicUsize::new(0),
                grow: Some(AtomicU64::new(1000)),
                scrolled_to_top: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ScrollSurface for FakePage {
        async fn scroll_height(&self) -> AutomationResult<u64> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            if let Some(grow) = &self.grow {
                return Ok(grow.fetch_add(500, Ordering::SeqCst));
            }
            Ok(*self.heights.get(n).or(self.heights.last()).unwrap_or(&0))
        }

        async fn scroll_to_bottom(&self) -> AutomationResult<()> {
            Ok(())
        }

        async fn scroll_to_top(&self) -> AutomationResult<()> {
            self.scrolled_to_top.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fast_settings(max_time: Duration) -> ScrollSettings {
        ScrollSettings {
            pause: Duration::from_millis(10),
            max_time,
            settle: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_stops_after_three_stable_readings() {
        let page = FakePage::with_heights(vec![1000, 1500, 2000, 2000, 2000, 2000, 9999]);
        let outcome = scroll_until_stable(&page, fast_settings(Duration::from_secs(10)), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ScrollOutcome::Stabilized {
                rounds: 6,
                height: 2000
            }
        );
        assert_eq!(page.reads.load(Ordering::SeqCst), 6);
        assert_eq!(page.scrolled_to_top.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_growing_page_is_bounded_by_max_time() {
        let page = FakePage::always_growing();
        let settings = fast_settings(Duration::from_millis(100));
        let started = std::time::Instant::now();

        let outcome = scroll_until_stable(&page, settings, &CancelFlag::new())
            .await
            .unwrap();

        assert!(matches!(outcome, ScrollOutcome::TimedOut { .. }));
        // 上限 + 一次停顿，再留出调度余量
        assert!(started.elapsed() < settings.max_time + settings.pause + Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_cancel_before_iteration() {
        let page = Arc::new(FakePage::with_heights(vec![100]));
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = scroll_until_stable(page.as_ref(), fast_settings(Duration::from_secs(1)), &cancel)
            .await
            .unwrap();

        assert_eq!(outcome, ScrollOutcome::Cancelled);
        assert_eq!(page.reads.load(Ordering::SeqCst), 0);
        assert_eq!(page.scrolled_to_top.load(Ordering::SeqCst), 0);
    }
}
