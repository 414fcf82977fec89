// 批量下载器
//
// 固定窗口并发：窗口内任务同时执行，整个窗口结束后才进入下一个窗口

use crate::downloader::{BatchReport, DownloadTask, MilestoneTracker, ProgressMode};
use crate::fetcher::{FetchError, RemoteFetcher};
use futures::future::join_all;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// 默认窗口大小
pub const DEFAULT_WINDOW: usize = 5;

/// 单个条目的失败原因
#[derive(Debug)]
enum ItemError {
    Fetch(FetchError),
    /// 写入后校验发现为空文件
    EmptyFile,
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemError::Fetch(e) => write!(f, "{}", e),
            ItemError::EmptyFile => write!(f, "文件大小为 0"),
        }
    }
}

/// 批量下载器
#[derive(Clone)]
pub struct BatchDownloader {
    fetcher: Arc<dyn RemoteFetcher>,
    window: usize,
}

impl BatchDownloader {
    pub fn new(fetcher: Arc<dyn RemoteFetcher>, window: usize) -> Self {
        Self {
            fetcher,
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// 下载一批任务到目标目录
    ///
    /// 单个条目失败不会中断批次，也不会在本轮重试
    pub async fn run(
        &self,
        tasks: &[DownloadTask],
        dest_dir: &Path,
        mode: ProgressMode,
    ) -> BatchReport {
        let mut report = BatchReport {
            total: tasks.len(),
            ..Default::default()
        };
        if tasks.is_empty() {
            return report;
        }

        info!("开始批量下载 {} 个文件...", tasks.len());
        let tracker = Mutex::new(MilestoneTracker::new(tasks.len()));

        for window in tasks.chunks(self.window) {
            let results = join_all(
                window
                    .iter()
                    .map(|task| self.run_item(task, dest_dir, mode, &tracker)),
            )
            .await;

            for (task, ok) in window.iter().zip(results) {
                if ok {
                    report.succeeded.push(task.filename.clone());
                } else {
                    report.failed.push(task.filename.clone());
                }
            }
        }

        info!(
            "批量下载完成: 成功 {}/{}",
            report.succeeded.len(),
            report.total
        );
        report
    }

    async fn run_item(
        &self,
        task: &DownloadTask,
        dest_dir: &Path,
        mode: ProgressMode,
        tracker: &Mutex<MilestoneTracker>,
    ) -> bool {
        let result = self.fetch_one(task, dest_dir).await;

        // 锁只在同步代码块内持有
        let milestone = {
            let mut tracker = tracker.lock();
            tracker
                .record()
                .map(|percent| (percent, tracker.completed(), tracker.total()))
        };

        match &result {
            Ok(()) => {
                if mode == ProgressMode::Verbose {
                    info!("[OK] {}", task.filename);
                }
            }
            Err(e) => warn!("[FAIL] {}: {}", task.filename, e),
        }

        if mode == ProgressMode::Bulk {
            if let Some((percent, completed, total)) = milestone {
                info!("进度: {}% ({}/{})", percent, completed, total);
            }
        }

        result.is_ok()
    }

    async fn fetch_one(&self, task: &DownloadTask, dest_dir: &Path) -> Result<(), ItemError> {
        let dest = dest_dir.join(&task.filename);

        self.fetcher
            .download_to(&task.url, &dest)
            .await
            .map_err(ItemError::Fetch)?;

        // 写入后校验：空文件视为失败并删除
        let size = tokio::fs::metadata(&dest)
            .await
            .map(|m| m.len())
            .map_err(|e| ItemError::Fetch(FetchError::Io(e)))?;
        if size == 0 {
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(ItemError::EmptyFile);
        }

        Ok(())
    }
}
