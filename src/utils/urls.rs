//! 下载地址列表处理

use std::path::Path;

use crate::error::FileError;

/// 补全协议：没有 `http://` / `https://` 前缀时加上 `https://`
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{}", trimmed))
    }
}

/// 按行拆分地址文本，去掉首尾空白和空行
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 从文本文件导入地址
pub fn read_url_file(path: &Path) -> Result<Vec<String>, FileError> {
    let content = std::fs::read_to_string(path).map_err(|source| FileError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_url_list(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_adds_default_scheme() {
        assert_eq!(
            normalize_url("example.com/a.pdf").as_deref(),
            Some("https://example.com/a.pdf")
        );
        assert_eq!(
            normalize_url("  http://example.com ").as_deref(),
            Some("http://example.com")
        );
        assert_eq!(
            normalize_url("HTTPS://Example.com").as_deref(),
            Some("HTTPS://Example.com")
        );
        assert_eq!(normalize_url("   "), None);
    }

    #[test]
    fn test_parse_url_list_drops_blank_lines() {
        let text = "https://a.com/x.pdf\n\n   \r\n  https://b.com/article  \n";
        assert_eq!(
            parse_url_list(text),
            vec!["https://a.com/x.pdf", "https://b.com/article"]
        );
    }

    #[test]
    fn test_read_url_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "a.com\nb.com\n").unwrap();

        assert_eq!(read_url_file(&path).unwrap(), vec!["a.com", "b.com"]);
        assert!(read_url_file(&dir.path().join("missing.txt")).is_err());
    }
}
