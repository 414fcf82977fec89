//! 测试用的内存拉取器与编码器

use crate::assembler::{render_concat_list, EncodeRequest, VideoEncoder};
use crate::fetcher::{FetchError, RemoteFetcher};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

fn not_found(url: &str) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status: 404,
    }
}

/// 内存拉取器：URL -> 页面文本 / 二进制内容
#[derive(Default)]
pub(crate) struct FakeFetcher {
    pages: Mutex<HashMap<String, String>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    downloaded: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate_url: Mutex<Option<String>>,
    entered: Notify,
    release: Notify,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_page(&self, url: &str, body: &str) {
        self.pages.lock().insert(url.to_string(), body.to_string());
    }

    pub(crate) fn remove_page(&self, url: &str) {
        self.pages.lock().remove(url);
    }

    pub(crate) fn add_blob(&self, url: &str, bytes: &[u8]) {
        self.blobs.lock().insert(url.to_string(), bytes.to_vec());
    }

    pub(crate) fn download_count(&self) -> usize {
        self.downloaded.lock().len()
    }

    pub(crate) fn downloaded_urls(&self) -> Vec<String> {
        self.downloaded.lock().clone()
    }

    /// 某个页面被请求的次数
    pub(crate) fn fetch_count(&self, url: &str) -> usize {
        self.fetched.lock().iter().filter(|u| *u == url).count()
    }

    pub(crate) fn clear_downloads(&self) {
        self.downloaded.lock().clear();
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// 请求该 URL 时挂起，直到调用 `release`
    pub(crate) fn pause_on(&self, url: &str) {
        *self.gate_url.lock() = Some(url.to_string());
    }

    /// 等待挂起点被触发
    pub(crate) async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub(crate) fn release(&self) {
        *self.gate_url.lock() = None;
        self.release.notify_one();
    }
}

#[async_trait]
impl RemoteFetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.fetched.lock().push(url.to_string());
        let gated = self.gate_url.lock().as_deref() == Some(url);
        if gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.pages.lock().get(url).cloned().ok_or_else(|| not_found(url))
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        let blob = self.blobs.lock().get(url).cloned();
        let result = match blob {
            Some(bytes) => {
                self.downloaded.lock().push(url.to_string());
                tokio::fs::write(dest, &bytes)
                    .await
                    .map(|_| bytes.len() as u64)
                    .map_err(FetchError::Io)
            }
            None => Err(not_found(url)),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// 记录编码请求的编码器，输出内容为帧文件名列表
#[derive(Default)]
pub(crate) struct RecordingEncoder {
    requests: Mutex<Vec<EncodeRequest>>,
    fail: AtomicBool,
}

impl RecordingEncoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn requests(&self) -> Vec<EncodeRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn clear(&self) {
        self.requests.lock().clear();
    }
}

#[async_trait]
impl VideoEncoder for RecordingEncoder {
    async fn encode(&self, request: &EncodeRequest) -> anyhow::Result<()> {
        self.requests.lock().push(request.clone());
        // 与 ffmpeg 编码器一致：先写帧列表，再产出视频
        tokio::fs::write(
            &request.list_path,
            render_concat_list(&request.frames, request.frame_duration),
        )
        .await?;
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("模拟编码失败");
        }

        let body = request
            .frames
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join("\n");
        tokio::fs::write(&request.output, body).await?;
        Ok(())
    }
}
