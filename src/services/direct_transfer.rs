//! PDF 直接下载 - 业务能力层
//!
//! 流式读取响应正文并逐块写入目标文件，每块之前检查取消标志。

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::clients::http_client::BODY_TIMEOUT;
use crate::clients::HttpClient;
use crate::error::TransportError;
use crate::models::{Progress, TaskStatus};
use crate::orchestrator::tracker::{CancelFlag, TaskTracker};

/// 每次写入的最大字节数
pub const CHUNK_SIZE: usize = 8192;

/// 下载结果
#[derive(Debug)]
pub enum TransferOutcome {
    Completed { path: PathBuf, bytes: u64 },
    Failed(TransportError),
    /// 已取消，部分文件保留在磁盘上
    Cancelled { bytes: u64 },
}

/// PDF 直接下载服务
pub struct DirectTransfer {
    http: HttpClient,
}

impl DirectTransfer {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// 下载 `url` 到 `destination`
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        cancel: &CancelFlag,
        tracker: &TaskTracker,
    ) -> TransferOutcome {
        tracker.status(TaskStatus::FetchingBytes);

        match self.stream_to_file(url, destination, cancel, tracker).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("[任务 {}] ❌ 下载失败: {}", tracker.ordinal(), e);
                TransferOutcome::Failed(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        url: &str,
        destination: &Path,
        cancel: &CancelFlag,
        tracker: &TaskTracker,
    ) -> Result<TransferOutcome, TransportError> {
        let response = self.http.get_stream(url).await?;
        let total = response.content_length().filter(|len| *len > 0);
        debug!("[任务 {}] 内容长度: {:?}", tracker.ordinal(), total);

        let write_err = |source| TransportError::Write {
            path: destination.to_path_buf(),
            source,
        };

        let mut file = File::create(destination).await.map_err(write_err)?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::time::timeout(BODY_TIMEOUT, stream.next())
                .await
                .map_err(|_| TransportError::Timeout {
                    url: url.to_string(),
                })?;
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| TransportError::from_reqwest(url, e))?;

            for piece in chunk.chunks(CHUNK_SIZE) {
                if cancel.is_cancelled() {
                    file.flush().await.map_err(write_err)?;
                    debug!("[任务 {}] 下载被取消，已写入 {} 字节", tracker.ordinal(), written);
                    return Ok(TransferOutcome::Cancelled { bytes: written });
                }

                file.write_all(piece).await.map_err(write_err)?;
                written += piece.len() as u64;

                if let Some(total) = total {
                    tracker.status_with_progress(
                        TaskStatus::FetchingBytes,
                        Progress::percent(written, total),
                    );
                }
            }
        }

        file.flush().await.map_err(write_err)?;

        Ok(TransferOutcome::Completed {
            path: destination.to_path_buf(),
            bytes: written,
        })
    }
}
