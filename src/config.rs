use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FileError;

/// 程序运行配置（来自环境变量）
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// 用户设置文件路径
    pub settings_file: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 浏览器可执行文件（为空时由 chromiumoxide 自动查找）
    pub chrome_executable: Option<PathBuf>,
    /// 浏览器语言
    pub browser_locale: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_file: PathBuf::from("config.json"),
            verbose_logging: false,
            chrome_executable: None,
            browser_locale: "zh-CN".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            settings_file: std::env::var("SETTINGS_FILE").map(PathBuf::from).unwrap_or(default.settings_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().filter(|v| !v.is_empty()).map(PathBuf::from),
            browser_locale: std::env::var("BROWSER_LOCALE").unwrap_or(default.browser_locale),
        }
    }
}

/// 纸张尺寸
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFormat {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
}

impl PageFormat {
    /// 纵向纸张宽高（英寸）
    pub fn size_inches(self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (8.27, 11.69),
            PageFormat::A3 => (11.69, 16.54),
            PageFormat::A5 => (5.83, 8.27),
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
        }
    }
}

impl std::str::FromStr for PageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageFormat::A4),
            "a3" => Ok(PageFormat::A3),
            "a5" => Ok(PageFormat::A5),
            "letter" => Ok(PageFormat::Letter),
            "legal" => Ok(PageFormat::Legal),
            other => Err(format!("未知纸张尺寸: {}", other)),
        }
    }
}

/// 用户设置文档
///
/// 扁平的键值文档，缺失的键使用默认值，未知的键被忽略。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 保存目录
    pub save_path: PathBuf,
    /// 页面加载后的额外等待（秒）
    pub wait_time: u64,
    pub page_size: PageFormat,
    pub landscape: bool,
    /// 缩放比例 0.5–2.0
    pub scale: f64,
    pub print_background: bool,
    pub block_images: bool,
    pub remove_popups: bool,
    pub full_load: bool,
    /// 每次滚动后的停顿（秒）
    pub scroll_pause: u64,
    /// 滚动加载的最长时间（秒）
    pub max_scroll_time: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            save_path: cwd.join("downloads"),
            wait_time: 3,
            page_size: PageFormat::A4,
            landscape: false,
            scale: 1.0,
            print_background: true,
            block_images: false,
            remove_popups: true,
            full_load: true,
            scroll_pause: 2,
            max_scroll_time: 60,
        }
    }
}

impl Settings {
    /// 从文件加载设置
    ///
    /// 文件不存在或格式错误时静默返回默认设置。
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("未读取设置文件 {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::parse(path, &content) {
            Some(settings) => settings,
            None => {
                warn!("⚠️ 设置文件格式错误，使用默认设置: {}", path.display());
                Self::default()
            }
        }
    }

    fn parse(path: &Path, content: &str) -> Option<Self> {
        if is_toml(path) {
            toml::from_str(content).ok()
        } else {
            serde_json::from_str(content).ok()
        }
    }

    /// 保存设置到文件
    pub fn save(&self, path: &Path) -> Result<(), FileError> {
        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| FileError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, content).map_err(|source| FileError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 2.0;

/// 单次运行的配置快照
///
/// 在 `start()` 时从设置生成，运行期间不会改变。
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfiguration {
    pub destination: PathBuf,
    pub initial_wait_secs: u64,
    pub page_format: PageFormat,
    pub landscape: bool,
    pub scale: f64,
    pub print_background: bool,
    pub block_images: bool,
    pub remove_popups: bool,
    pub full_load: bool,
    pub scroll_pause: Duration,
    pub max_scroll_time: Duration,
}

impl RunConfiguration {
    pub fn from_settings(settings: &Settings) -> Self {
        let scale = if settings.scale.is_finite() {
            settings.scale.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            1.0
        };

        Self {
            destination: settings.save_path.clone(),
            initial_wait_secs: settings.wait_time,
            page_format: settings.page_size,
            landscape: settings.landscape,
            scale,
            print_background: settings.print_background,
            block_images: settings.block_images,
            remove_popups: settings.remove_popups,
            full_load: settings.full_load,
            scroll_pause: Duration::from_secs(settings.scroll_pause),
            max_scroll_time: Duration::from_secs(settings.max_scroll_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_scroll_pause_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"wait_time": 5, "page_size": "Letter"}"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.scroll_pause, 2);
        assert_eq!(settings.wait_time, 5);
        assert_eq!(settings.page_size, PageFormat::Letter);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"landscape": true, "theme": "dark"}"#).unwrap();

        let settings = Settings::load(&path);
        assert!(settings.landscape);
        assert_eq!(settings.max_scroll_time, 60);
    }

    #[test]
    fn test_malformed_document_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load(&path), Settings::default());
        assert_eq!(Settings::load(&dir.path().join("missing.json")), Settings::default());
    }

    #[test]
    fn test_toml_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let settings = Settings {
            page_size: PageFormat::A3,
            block_images: true,
            ..Settings::default()
        };

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_snapshot_clamps_scale() {
        let settings = Settings {
            scale: 3.5,
            scroll_pause: 4,
            ..Settings::default()
        };
        let run = RunConfiguration::from_settings(&settings);
        assert_eq!(run.scale, MAX_SCALE);
        assert_eq!(run.scroll_pause, Duration::from_secs(4));

        let tiny = RunConfiguration::from_settings(&Settings {
            scale: 0.1,
            ..Settings::default()
        });
        assert_eq!(tiny.scale, MIN_SCALE);
    }

    #[test]
    fn test_page_format_parse() {
        assert_eq!("legal".parse::<PageFormat>().unwrap(), PageFormat::Legal);
        assert!("B5".parse::<PageFormat>().is_err());
    }
}
