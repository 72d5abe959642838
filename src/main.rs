use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use batch_pdf_downloader::browser::BrowserOptions;
use batch_pdf_downloader::utils::{logging, parse_url_list, read_url_file};
use batch_pdf_downloader::view::LogObserver;
use batch_pdf_downloader::{
    AppConfig, AppResult, BatchOrchestrator, ChromeRenderer, PageFormat, Settings, TaskBoard,
};
use clap::Parser;
use tracing::{info, warn};

/// 前台刷新间隔
const TICK: Duration = Duration::from_millis(100);

/// 批量下载 PDF，或将网页保存为 PDF
#[derive(Parser, Debug)]
#[command(name = "batch_pdf_downloader", version)]
struct Cli {
    /// 下载地址（可以多个）
    urls: Vec<String>,

    /// 从文本文件导入地址，每行一个
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 设置文件（默认取 SETTINGS_FILE 或 config.json）
    #[arg(long)]
    settings: Option<PathBuf>,

    /// 保存目录
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// 页面加载后的额外等待秒数
    #[arg(long)]
    wait: Option<u64>,

    /// 纸张尺寸：A4 / A3 / A5 / Letter / Legal
    #[arg(long)]
    page_size: Option<PageFormat>,

    #[arg(long)]
    landscape: Option<bool>,

    /// 缩放比例（0.5 - 2.0）
    #[arg(long)]
    scale: Option<f64>,

    #[arg(long)]
    print_background: Option<bool>,

    #[arg(long)]
    block_images: Option<bool>,

    #[arg(long)]
    remove_popups: Option<bool>,

    /// 是否滚动加载完整页面
    #[arg(long)]
    full_load: Option<bool>,

    /// 每次滚动后的停顿秒数
    #[arg(long)]
    scroll_pause: Option<u64>,

    /// 滚动的最长秒数
    #[arg(long)]
    max_scroll_time: Option<u64>,
}

impl Cli {
    /// 命令行参数覆盖设置文件中的值
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(dir) = &self.output_dir {
            settings.save_path = dir.clone();
        }
        if let Some(v) = self.wait {
            settings.wait_time = v;
        }
        if let Some(v) = self.page_size {
            settings.page_size = v;
        }
        if let Some(v) = self.landscape {
            settings.landscape = v;
        }
        if let Some(v) = self.scale {
            settings.scale = v;
        }
        if let Some(v) = self.print_background {
            settings.print_background = v;
        }
        if let Some(v) = self.block_images {
            settings.block_images = v;
        }
        if let Some(v) = self.remove_popups {
            settings.remove_popups = v;
        }
        if let Some(v) = self.full_load {
            settings.full_load = v;
        }
        if let Some(v) = self.scroll_pause {
            settings.scroll_pause = v;
        }
        if let Some(v) = self.max_scroll_time {
            settings.max_scroll_time = v;
        }
    }

    /// 合并命令行地址和导入文件中的地址
    fn collect_urls(&self) -> AppResult<Vec<String>> {
        let mut urls = parse_url_list(&self.urls.join("\n"));
        if let Some(path) = &self.input {
            let imported = read_url_file(path)?;
            info!("📥 从 {} 导入 {} 个地址", path.display(), imported.len());
            urls.extend(imported);
        }
        Ok(urls)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let app_config = AppConfig::from_env();
    logging::init(app_config.verbose_logging);

    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(|| app_config.settings_file.clone());
    let mut settings = Settings::load(&settings_path);
    cli.apply_to(&mut settings);

    let urls = cli.collect_urls()?;

    let renderer = Arc::new(ChromeRenderer::new(BrowserOptions {
        chrome_executable: app_config.chrome_executable.clone(),
        locale: app_config.browser_locale.clone(),
        ..BrowserOptions::default()
    }));
    let (tx, rx) = mpsc::channel();
    let mut orchestrator = BatchOrchestrator::new(renderer, tx)?;

    orchestrator.start(&urls, &settings)?;

    // 开始一批时保存设置
    match settings.save(&settings_path) {
        Ok(()) => info!("💾 设置已保存: {}", settings_path.display()),
        Err(e) => warn!("⚠️ 保存设置失败: {}", e),
    }

    let mut board = TaskBoard::new();
    let mut observer = LogObserver;
    let mut ticker = tokio::time::interval(TICK);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                board.drain(&rx, &mut observer);
                if !board.is_running() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                orchestrator.stop();
            }
        }
    }

    tokio::task::block_in_place(|| orchestrator.wait());

    if let Some(summary) = board.last_summary() {
        info!("🏁 {}", summary);
    }

    Ok(())
}
