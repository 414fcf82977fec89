use crate::source::RemoteFrame;
use serde::{Deserialize, Serialize};

/// 下载任务
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadTask {
    /// 下载地址
    pub url: String,
    /// 目标文件名（相对于目标目录）
    pub filename: String,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }
}

impl From<&RemoteFrame> for DownloadTask {
    fn from(frame: &RemoteFrame) -> Self {
        Self::new(frame.url.clone(), frame.filename.clone())
    }
}

/// 进度日志模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// 每个文件完成都打印
    Verbose,
    /// 只在跨过新的 10% 里程碑时打印
    Bulk,
}

impl ProgressMode {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            ProgressMode::Verbose
        } else {
            ProgressMode::Bulk
        }
    }
}

/// 批量下载结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 任务总数
    pub total: usize,
    /// 成功的文件名（按任务顺序）
    pub succeeded: Vec<String>,
    /// 失败的文件名（按任务顺序）
    pub failed: Vec<String>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
