// HTTP 拉取实现

use super::FetchError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const USER_AGENT: &str = concat!("solar-station/", env!("CARGO_PKG_VERSION"));

/// 远端拉取能力
///
/// 同步流程只依赖这两个操作，测试中用内存实现替换
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// 获取文本内容（列表页、JSON 接口）
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// 流式下载到目标路径，返回写入字节数
    ///
    /// 失败（含零字节响应）时目标路径保持原状
    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// 基于 reqwest 的拉取器
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// 创建拉取器，所有请求共用同一个超时
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| anyhow::anyhow!("创建HTTP客户端失败: {}", e))?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }

    async fn stream_to_file(
        &self,
        resp: reqwest::Response,
        url: &str,
        part_path: &Path,
    ) -> Result<u64, FetchError> {
        let mut file = File::create(part_path).await?;
        let mut stream = resp.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::from_reqwest(url, e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.get(url).await?;
        resp.text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }

    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let resp = self.get(url).await?;
        let part_path = part_path_for(dest);

        match self.stream_to_file(resp, url, &part_path).await {
            Ok(0) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(FetchError::Empty {
                    url: url.to_string(),
                })
            }
            Ok(written) => {
                tokio::fs::rename(&part_path, dest).await?;
                debug!("下载完成: {} -> {:?} ({} bytes)", url, dest, written);
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(e)
            }
        }
    }
}

/// 下载中间文件路径（同目录下的隐藏文件）
pub(crate) fn part_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.part", name))
}
