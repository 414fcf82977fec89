//! 数据源类型定义

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 远端列表中的一帧（每轮同步重新解析，不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFrame {
    /// 绝对下载地址
    pub url: String,
    /// 本地文件名
    pub filename: String,
}

impl RemoteFrame {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }
}

/// 列表解析规则
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseRule {
    /// 单页正则匹配，捕获组 1 为相对文件名
    FlatPattern {
        pattern: String,
        base_url: String,
        filename_prefix: String,
    },
    /// 匹配 `<img src>` / 链接中固定前缀的绝对路径，捕获组 1 为站内路径
    AnchorTag {
        pattern: String,
        base_url: String,
        filename_prefix: String,
    },
    /// 递归目录索引（耀斑区域）
    RecursiveDirectory {
        base_url: String,
        root: String,
        join_char: char,
    },
}

/// 本地文件命名约定
///
/// 只有满足约定的文件才被视为镜像帧，渲染产物和列表文件不受裁剪影响
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameConvention {
    /// 文件名前缀
    pub prefix: String,
    /// 允许的扩展名（不含点，小写）
    pub extensions: Vec<String>,
}

impl FrameConvention {
    pub fn new(prefix: &str, extensions: &[&str]) -> Self {
        Self {
            prefix: prefix.to_string(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    /// 文件名是否属于该数据源的帧
    pub fn matches(&self, filename: &str) -> bool {
        if !filename.starts_with(&self.prefix) {
            return false;
        }
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            }
            None => false,
        }
    }
}

/// 同步模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// 只下载本地缺失的帧
    Incremental,
    /// 每次都重新拉取全部帧（远端复用 "latest" 文件名）
    Snapshot,
}

/// 帧发布策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePublish {
    /// 只发布视频
    None,
    /// 额外发布时间上最新的一帧
    Latest,
    /// 逐帧发布
    All,
}

/// 视频布局
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnimationLayout {
    /// 整个工作目录合成一个视频
    Single { output_name: String },
    /// 按耀斑区域分组，每组一个视频
    FlareGroups { min_frames: usize },
}

/// 动画合成参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    pub layout: AnimationLayout,
    /// 每帧显示时长（秒）
    pub frame_duration: f64,
    /// x264 CRF
    pub crf: u8,
}

/// 数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 数据源 ID，同时是工作目录名
    pub id: String,
    /// 日志标签
    pub tag: String,
    /// 列表页地址
    pub listing_url: String,
    pub rule: ParseRule,
    pub convention: FrameConvention,
    pub mode: SyncMode,
    /// 逐条打印下载日志
    pub verbose: bool,
    pub animation: Option<AnimationSpec>,
    pub frame_publish: FramePublish,
}

impl SourceConfig {
    /// 工作目录
    pub fn work_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.id)
    }
}
