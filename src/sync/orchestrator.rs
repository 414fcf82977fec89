//! 同步编排
//!
//! 完整同步：事件数据 → 静态图表 → 逐个数据源 → 清单。
//! 数据源之间严格串行，单个数据源失败只影响它自己，清单总是最后重建。
//!
//! 轻量同步只刷新低延迟数据源并重建清单，与完整同步各自使用独立的重入锁。

use super::feed::refresh_event_feed;
use super::guard::CycleGuard;
use crate::assembler::{
    collect_frames, flare_list_name, flare_output_name, FrameSequencer, VideoEncoder,
    FRAME_LIST_NAME,
};
use crate::config::{AppConfig, Catalog, FeedConfig};
use crate::downloader::{BatchDownloader, BatchReport, ProgressMode};
use crate::fetcher::RemoteFetcher;
use crate::mirror::{list_local, prune, MirrorDiff};
use crate::publisher::{publish_file, Classifier, ManifestPublisher};
use crate::source::{
    group_frames, AnimationLayout, AnimationSpec, FramePublish, SourceConfig, SyncMode,
};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, info_span, warn, Instrument};

/// 静态图表在数据目录下的子目录
pub const CHARTS_DIR: &str = "charts";

/// 单个数据源的同步结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceReport {
    pub id: String,
    /// 远端文件数（去重后）
    pub remote: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub pruned: usize,
    /// 本轮成功渲染的视频
    pub rendered: Vec<String>,
    /// 本轮发布到发布目录的文件数
    pub published: usize,
}

/// 一轮同步的结果
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub sources: Vec<SourceReport>,
    /// 本轮同步失败的数据源 ID
    pub failed_sources: Vec<String>,
    /// 清单中的文件数，清单写入失败时为 None
    pub manifest_files: Option<usize>,
}

/// 同步编排器
pub struct SyncOrchestrator {
    fetcher: Arc<dyn RemoteFetcher>,
    downloader: BatchDownloader,
    sequencer: FrameSequencer,
    manifest: ManifestPublisher,
    catalog: Catalog,
    data_dir: PathBuf,
    cache_dir: PathBuf,
    feed: FeedConfig,
    mini_source: String,
    full_guard: CycleGuard,
    mini_guard: CycleGuard,
    /// 按数据源 ID 串行化：两种同步可能同时处理同一个工作目录
    source_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SyncOrchestrator {
    pub fn new(
        config: &AppConfig,
        catalog: Catalog,
        fetcher: Arc<dyn RemoteFetcher>,
        encoder: Arc<dyn VideoEncoder>,
    ) -> Self {
        let classifier = Classifier::standard(catalog.dashboard_filenames());
        let manifest = ManifestPublisher::new(
            config.storage.cache_dir.clone(),
            classifier,
            catalog.pinned.clone(),
        );

        Self {
            downloader: BatchDownloader::new(fetcher.clone(), config.sync.download_window),
            fetcher,
            sequencer: FrameSequencer::new(encoder),
            manifest,
            catalog,
            data_dir: config.storage.data_dir.clone(),
            cache_dir: config.storage.cache_dir.clone(),
            feed: config.feed.clone(),
            mini_source: config.sync.mini_source.clone(),
            full_guard: CycleGuard::new(),
            mini_guard: CycleGuard::new(),
            source_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.manifest.manifest_path()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// 完整同步
    ///
    /// 已有完整同步在运行时直接返回 `None`
    pub async fn run_full_cycle(&self) -> Option<CycleReport> {
        let Some(_permit) = self.full_guard.try_acquire() else {
            info!("上一轮完整同步仍在运行，跳过本次触发");
            return None;
        };

        info!("========== 开始完整同步 ==========");
        let mut report = CycleReport::default();

        if self.feed.enabled {
            let today = chrono::Utc::now().date_naive();
            if let Err(e) = refresh_event_feed(self.fetcher.as_ref(), &self.feed, &self.cache_dir, today)
                .instrument(info_span!("source", tag = "DONKI"))
                .await
            {
                warn!("[DONKI] 刷新失败: {:#}", e);
            }
        }

        if let Err(e) = self
            .refresh_charts()
            .instrument(info_span!("source", tag = "CHARTS"))
            .await
        {
            warn!("[CHARTS] 刷新失败: {:#}", e);
        }

        for source in &self.catalog.sources {
            match self.sync_source(source).await {
                Ok(source_report) => report.sources.push(source_report),
                Err(e) => {
                    warn!("[{}] 本轮同步失败: {:#}", source.tag, e);
                    report.failed_sources.push(source.id.clone());
                }
            }
        }

        report.manifest_files = self.regenerate_manifest().await;
        info!(
            "========== 完整同步结束: 成功 {} 个数据源, 失败 {} 个 ==========",
            report.sources.len(),
            report.failed_sources.len()
        );
        Some(report)
    }

    /// 轻量同步
    ///
    /// 只受自身的重入锁约束，可以与完整同步并行
    pub async fn run_mini_cycle(&self) -> Option<CycleReport> {
        let Some(_permit) = self.mini_guard.try_acquire() else {
            info!("上一轮轻量同步仍在运行，跳过本次触发");
            return None;
        };

        info!("开始轻量同步: {}", self.mini_source);
        let mut report = CycleReport::default();

        match self.catalog.source(&self.mini_source) {
            Some(source) => match self.sync_source(source).await {
                Ok(source_report) => report.sources.push(source_report),
                Err(e) => {
                    warn!("[{}] 轻量同步失败: {:#}", source.tag, e);
                    report.failed_sources.push(source.id.clone());
                }
            },
            None => {
                warn!("轻量同步数据源不存在: {}", self.mini_source);
                report.failed_sources.push(self.mini_source.clone());
            }
        }

        report.manifest_files = self.regenerate_manifest().await;
        Some(report)
    }

    /// 同步单个数据源：解析 → 差异 → 下载 → 裁剪 → 合成 → 发布
    ///
    /// 同一数据源同一时刻只有一个同步在处理，后到的等待前一个完成
    pub async fn sync_source(&self, source: &SourceConfig) -> Result<SourceReport> {
        let lock = self.source_lock(&source.id);
        let _held = lock.lock().await;

        self.sync_source_inner(source)
            .instrument(info_span!("source", tag = %source.tag))
            .await
    }

    fn source_lock(&self, id: &str) -> Arc<AsyncMutex<()>> {
        self.source_locks
            .lock()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    async fn sync_source_inner(&self, source: &SourceConfig) -> Result<SourceReport> {
        info!("同步中...");
        let work_dir = source.work_dir(&self.data_dir);
        tokio::fs::create_dir_all(&work_dir)
            .await
            .with_context(|| format!("创建工作目录失败: {:?}", work_dir))?;

        // 列表获取或解析失败时直接返回，本地镜像保持不变
        let remote = source
            .rule
            .collect(self.fetcher.as_ref(), &source.listing_url)
            .await?;
        let diff = MirrorDiff::new(&remote);

        let local = list_local(&work_dir).await?;
        let tasks = match source.mode {
            SyncMode::Incremental => diff.missing(&local),
            SyncMode::Snapshot => diff.all(),
        };

        let mut report = SourceReport {
            id: source.id.clone(),
            remote: diff.remote_len(),
            ..Default::default()
        };

        let batch = if tasks.is_empty() {
            info!("帧已是最新 (远端 {} 个)", diff.remote_len());
            BatchReport::default()
        } else {
            self.downloader
                .run(&tasks, &work_dir, ProgressMode::from_verbose(source.verbose))
                .await
        };
        report.downloaded = batch.succeeded.len();
        report.failed = batch.failed.len();

        // 下载结束后重新列目录，刚下载的帧不会被当成孤儿
        let local = list_local(&work_dir).await?;
        let orphans = diff.orphans(&local, &source.convention);
        if !orphans.is_empty() {
            report.pruned = prune(&work_dir, &orphans).await?;
            info!("已清理 {} 个过期帧", report.pruned);
        }

        let frames = collect_frames(&work_dir, &source.convention).await?;

        if let Some(spec) = &source.animation {
            let (rendered, published) = match &spec.layout {
                AnimationLayout::Single { output_name } => {
                    self.assemble_single(&work_dir, &frames, spec, output_name)
                        .await?
                }
                AnimationLayout::FlareGroups { min_frames } => {
                    self.assemble_flare_groups(&work_dir, &frames, spec, *min_frames)
                        .await?
                }
            };
            report.rendered = rendered;
            report.published += published;
        }

        report.published += self
            .publish_frames(&work_dir, &frames, &diff, source.frame_publish)
            .await?;

        info!(
            "完成: 远端 {}, 下载 {}, 失败 {}, 清理 {}, 渲染 {}, 发布 {}",
            report.remote,
            report.downloaded,
            report.failed,
            report.pruned,
            report.rendered.len(),
            report.published
        );
        Ok(report)
    }

    /// 单视频：视频相对当前帧集合过期时重新渲染，然后发布当前视频
    ///
    /// 上一轮渲染失败或中断的视频始终是过期的，下一轮会自动重试
    async fn assemble_single(
        &self,
        work_dir: &Path,
        frames: &[String],
        spec: &AnimationSpec,
        output_name: &str,
    ) -> Result<(Vec<String>, usize)> {
        let mut rendered = Vec::new();

        if self
            .sequencer
            .is_stale(work_dir, frames, spec, output_name, FRAME_LIST_NAME)
            .await
        {
            if self
                .sequencer
                .assemble(work_dir, frames, 1, spec, output_name, FRAME_LIST_NAME)
                .await
                .is_some()
            {
                rendered.push(output_name.to_string());
            }
        }

        // 渲染失败时发布的仍是上一版视频
        let published = publish_file(work_dir, output_name, &self.cache_dir).await? as usize;
        Ok((rendered, published))
    }

    /// 耀斑分组：只重新渲染过期的分组
    async fn assemble_flare_groups(
        &self,
        work_dir: &Path,
        frames: &[String],
        spec: &AnimationSpec,
        min_frames: usize,
    ) -> Result<(Vec<String>, usize)> {
        let groups = group_frames(frames.iter().map(String::as_str));
        let mut rendered = Vec::new();
        let mut published = 0;

        for (key, members) in &groups {
            if members.len() < min_frames {
                continue;
            }

            let output_name = flare_output_name(key);
            let list_name = flare_list_name(key);

            if self
                .sequencer
                .is_stale(work_dir, members, spec, &output_name, &list_name)
                .await
            {
                if self
                    .sequencer
                    .assemble(
                        work_dir,
                        members,
                        min_frames,
                        spec,
                        &output_name,
                        &list_name,
                    )
                    .await
                    .is_some()
                {
                    rendered.push(output_name.clone());
                }
            }

            if publish_file(work_dir, &output_name, &self.cache_dir).await? {
                published += 1;
            }
        }

        if !rendered.is_empty() {
            info!("已渲染 {} 个耀斑区域视频", rendered.len());
        }
        Ok((rendered, published))
    }

    async fn publish_frames(
        &self,
        work_dir: &Path,
        frames: &[String],
        diff: &MirrorDiff,
        policy: FramePublish,
    ) -> Result<usize> {
        let targets: Vec<&String> = match policy {
            FramePublish::None => Vec::new(),
            // frames 已排序，最后一帧即最新
            FramePublish::Latest => frames.last().into_iter().collect(),
            FramePublish::All => frames.iter().filter(|f| diff.contains(f)).collect(),
        };

        let mut published = 0;
        for filename in targets {
            if publish_file(work_dir, filename, &self.cache_dir).await? {
                published += 1;
            }
        }
        Ok(published)
    }

    /// 静态图表：每次覆盖下载，逐个发布
    async fn refresh_charts(&self) -> Result<()> {
        info!("更新静态图表...");
        let chart_dir = self.data_dir.join(CHARTS_DIR);
        tokio::fs::create_dir_all(&chart_dir)
            .await
            .with_context(|| format!("创建图表目录失败: {:?}", chart_dir))?;

        self.downloader
            .run(&self.catalog.charts, &chart_dir, ProgressMode::Verbose)
            .await;

        let mut published = 0;
        for chart in &self.catalog.charts {
            if publish_file(&chart_dir, &chart.filename, &self.cache_dir).await? {
                published += 1;
            }
        }
        info!("已发布 {}/{} 个静态图表", published, self.catalog.charts.len());
        Ok(())
    }

    async fn regenerate_manifest(&self) -> Option<usize> {
        match self.manifest.regenerate().await {
            Ok(manifest) => Some(manifest.files.len()),
            Err(e) => {
                warn!("清单重建失败: {:#}", e);
                None
            }
        }
    }
}
