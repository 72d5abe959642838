//! 注入页面的脚本

/// 页面 DOM 已构建（已离开 about:blank 且 readyState 不再是 loading）
pub const DOM_READY: &str =
    "location.href !== 'about:blank' && document.readyState !== 'loading'";

/// 页面 load 事件已触发
pub const LOAD_COMPLETE: &str = "document.readyState === 'complete'";

/// 移除遮罩层、弹窗、Cookie 横幅，并恢复页面滚动
pub const SWEEP_OVERLAYS: &str = r#"
(() => {
    const selectors = [
        '.modal', '.popup', '.overlay', '.dialog',
        '[class*="modal"]', '[class*="popup"]', '[role="dialog"]',
        '[class*="cookie"]', '[class*="consent"]', '[class*="gdpr"]',
        '.alert', '.banner', '.notification',
        'div[style*="position: fixed"]', 'div[style*="position:fixed"]'
    ];

    let removed = 0;
    selectors.forEach(s => {
        document.querySelectorAll(s).forEach(el => {
            const style = getComputedStyle(el);
            const z = parseInt(style.zIndex, 10);
            if ((!isNaN(z) && z > 100) || style.position === 'fixed') {
                el.remove();
                removed += 1;
            }
        });
    });

    if (document.body) {
        document.body.style.overflow = '';
        document.body.classList.remove('modal-open', 'no-scroll');
    }
    document.documentElement.style.overflow = '';
    return removed;
})()
"#;

/// 把常见懒加载属性改写为真实属性，并触发 scroll / resize 监听
pub const ACTIVATE_LAZY_CONTENT: &str = r#"
(() => {
    const lazySelectors = [
        'img[data-src]', 'img[data-lazy]', 'img[data-original]',
        'img.lazy', 'img.lazyload', '[data-background-image]',
        'img[loading="lazy"]', 'img[data-lazy-src]'
    ];

    let touched = 0;
    lazySelectors.forEach(selector => {
        document.querySelectorAll(selector).forEach(img => {
            if (img.dataset.src) img.src = img.dataset.src;
            if (img.dataset.lazy) img.src = img.dataset.lazy;
            if (img.dataset.lazySrc) img.src = img.dataset.lazySrc;
            if (img.dataset.original) img.src = img.dataset.original;
            if (img.dataset.backgroundImage) {
                img.style.backgroundImage = `url(${img.dataset.backgroundImage})`;
            }
            img.removeAttribute('loading');
            touched += 1;
        });
    });

    window.dispatchEvent(new Event('scroll'));
    window.dispatchEvent(new Event('resize'));
    return touched;
})()
"#;

/// 在页面中查找第一个可见的匹配元素并点击
///
/// `__KIND__` 为 `css` 或 `text`，`__NEEDLE__` 为 JSON 字符串。
pub const CLICK_FIRST_VISIBLE: &str = r#"
(() => {
    const kind = __KIND__;
    const needle = __NEEDLE__;
    const visible = el => {
        const rect = el.getBoundingClientRect();
        const style = getComputedStyle(el);
        return rect.width > 0 && rect.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none';
    };

    let candidates = [];
    if (kind === 'css') {
        candidates = Array.from(document.querySelectorAll(needle));
    } else {
        const wanted = needle.toLowerCase();
        candidates = Array.from(document.querySelectorAll('button, [role="button"]'))
            .filter(el => (el.innerText || el.textContent || '').toLowerCase().includes(wanted));
    }

    const target = candidates.find(visible);
    if (!target) return false;
    target.click();
    return true;
})()
"#;
