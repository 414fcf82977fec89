// 元数据清单
//
// 每轮完整重建，不做增量修补，清单内容始终与发布目录一致

use super::cache::write_atomic;
use super::classify::Classifier;
use crate::config::PinnedResource;
use crate::mirror::list_local;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// 清单文件名
pub const MANIFEST_FILENAME: &str = "meta.json";

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Video,
    Image,
}

impl AssetType {
    pub fn from_filename(filename: &str) -> Self {
        if filename.ends_with(".mp4") {
            AssetType::Video
        } else {
            AssetType::Image
        }
    }
}

/// 已发布资源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedAsset {
    pub filename: String,
    pub category: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
}

/// 清单文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub last_updated: String,
    pub pinned: Vec<PinnedResource>,
    pub files: Vec<PublishedAsset>,
}

/// 发布目录中参与分类的文件
///
/// 点号开头的临时文件和 JSON 数据文件（清单本身、事件数据）不计入
fn is_listed(filename: &str) -> bool {
    !filename.starts_with('.') && !filename.ends_with(".json")
}

/// 由文件名集合构建清单，文件按文件名排序
pub fn build_manifest<'a>(
    filenames: impl IntoIterator<Item = &'a str>,
    classifier: &Classifier,
    pinned: &[PinnedResource],
    last_updated: String,
) -> Manifest {
    let mut files: Vec<PublishedAsset> = filenames
        .into_iter()
        .filter(|name| is_listed(name))
        .map(|name| PublishedAsset {
            filename: name.to_string(),
            category: classifier.classify(name).to_string(),
            asset_type: AssetType::from_filename(name),
        })
        .collect();
    files.sort_by(|a, b| a.filename.cmp(&b.filename));

    Manifest {
        last_updated,
        pinned: pinned.to_vec(),
        files,
    }
}

/// 清单发布器
#[derive(Debug, Clone)]
pub struct ManifestPublisher {
    cache_dir: PathBuf,
    classifier: Classifier,
    pinned: Vec<PinnedResource>,
    /// 完整同步与轻量同步可能同时重建清单，共用同一个临时文件
    write_lock: std::sync::Arc<tokio::sync::Mutex<()>>,
}

impl ManifestPublisher {
    pub fn new(cache_dir: impl Into<PathBuf>, classifier: Classifier, pinned: Vec<PinnedResource>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            classifier,
            pinned,
            write_lock: std::sync::Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.cache_dir.join(MANIFEST_FILENAME)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// 扫描发布目录并重写清单
    pub async fn regenerate(&self) -> Result<Manifest> {
        let _lock = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .with_context(|| format!("创建发布目录失败: {:?}", self.cache_dir))?;

        let names = list_local(&self.cache_dir).await?;
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let manifest = build_manifest(
            names.iter().map(String::as_str),
            &self.classifier,
            &self.pinned,
            timestamp,
        );

        let body = serde_json::to_vec(&manifest).context("序列化清单失败")?;
        write_atomic(&self.cache_dir, MANIFEST_FILENAME, &body).await?;

        info!("清单已更新: {} 个文件", manifest.files.len());
        Ok(manifest)
    }
}
