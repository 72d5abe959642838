//! 文件名解析
//!
//! 从 URL 或网页标题得到保存文件名，并保证不会覆盖已有文件。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::services::classifier::ResourceKind;

/// 标题文件名的最大字符数
pub const MAX_TITLE_CHARS: usize = 50;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 根据 URL 推导文件名
///
/// 网页一律使用 `webpage_时间戳.pdf`；PDF 资源取路径最后一段，
/// 取不到或不以 `.pdf` 结尾时使用 `download_时间戳.pdf`。
pub fn filename_from_url(url: &str, kind: ResourceKind, now: DateTime<Local>) -> String {
    let timestamp = now.format(TIMESTAMP_FORMAT);

    if kind == ResourceKind::Rendered {
        return format!("webpage_{}.pdf", timestamp);
    }

    match last_path_segment(url) {
        Some(name) if name.to_ascii_lowercase().ends_with(".pdf") => name,
        _ => format!("download_{}.pdf", timestamp),
    }
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(segment).ok()?;
    let cleaned = strip_forbidden(&decoded);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// 清理网页标题：去除非法字符、首尾空白，截断到 50 个字符
pub fn sanitize_title(title: &str) -> Option<String> {
    let cleaned = strip_forbidden(title);
    let truncated: String = cleaned.trim().chars().take(MAX_TITLE_CHARS).collect();
    let truncated = truncated.trim_end();
    if truncated.is_empty() {
        None
    } else {
        Some(truncated.to_string())
    }
}

/// 由网页标题生成 `标题_时间戳.pdf`
pub fn title_filename(title: &str, now: DateTime<Local>) -> Option<String> {
    sanitize_title(title).map(|t| format!("{}_{}.pdf", t, now.format(TIMESTAMP_FORMAT)))
}

fn strip_forbidden(input: &str) -> String {
    input.chars().filter(|c| !is_forbidden(*c)).collect()
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '\0'..='\u{1F}')
}

/// 在目录中为文件名找到一个未被占用的路径
///
/// 已存在时依次追加 `_1`、`_2`……
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(filename);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::fs;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn test_pdf_url_keeps_decoded_name() {
        let name = filename_from_url(
            "https://example.com/docs/annual%20report.pdf",
            ResourceKind::DirectPdf,
            fixed_now(),
        );
        assert_eq!(name, "annual report.pdf");
    }

    #[test]
    fn test_pdf_without_name_uses_timestamp() {
        let name = filename_from_url(
            "https://example.com/download?id=3",
            ResourceKind::DirectPdf,
            fixed_now(),
        );
        assert_eq!(name, "download_20240305_140709.pdf");

        let root = filename_from_url("https://example.com/", ResourceKind::DirectPdf, fixed_now());
        assert_eq!(root, "download_20240305_140709.pdf");
    }

    #[test]
    fn test_rendered_always_uses_webpage_name() {
        let name = filename_from_url(
            "https://example.com/paper.pdf",
            ResourceKind::Rendered,
            fixed_now(),
        );
        assert_eq!(name, "webpage_20240305_140709.pdf");
    }

    #[test]
    fn test_sanitize_title_strips_and_truncates() {
        assert_eq!(
            sanitize_title("  A <b>Title</b>: what?  ").as_deref(),
            Some("A bTitleb what")
        );
        assert_eq!(sanitize_title("???"), None);

        let long = "标".repeat(80);
        assert_eq!(sanitize_title(&long).unwrap().chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_title_filename_appends_timestamp() {
        assert_eq!(
            title_filename("Rust | Blog", fixed_now()).as_deref(),
            Some("Rust  Blog_20240305_140709.pdf")
        );
    }

    #[test]
    fn test_unique_path_never_reuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut seen = HashSet::new();

        for _ in 0..5 {
            let path = unique_path(dir.path(), "report.pdf");
            assert!(!path.exists());
            fs::write(&path, b"x").unwrap();
            assert!(seen.insert(path));
        }

        assert!(seen.contains(&dir.path().join("report_4.pdf")));
    }
}
