//! 帧序列整理与视频合成
//!
//! 文件名按字典序即时间序，合成前统一排序。编码失败只记录日志，
//! 旧视频保持不变。

use super::{render_concat_list, EncodeRequest, VideoEncoder};
use crate::mirror::list_local;
use crate::source::{AnimationSpec, FrameConvention};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// 单视频数据源的帧列表文件名
pub const FRAME_LIST_NAME: &str = "input.txt";

/// 耀斑分组视频文件名
pub fn flare_output_name(key: &str) -> String {
    format!("flare_anim_{}.mp4", key)
}

/// 耀斑分组帧列表文件名
pub fn flare_list_name(key: &str) -> String {
    format!("{}.txt", key)
}

/// 收集工作目录中符合命名约定的帧，按文件名排序
pub async fn collect_frames(work_dir: &Path, convention: &FrameConvention) -> Result<Vec<String>> {
    let mut frames: Vec<String> = list_local(work_dir)
        .await?
        .into_iter()
        .filter(|name| convention.matches(name))
        .collect();
    frames.sort();
    Ok(frames)
}

async fn modified(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

fn ordered_frames(work_dir: &Path, frames: &[String]) -> Vec<PathBuf> {
    let mut ordered = frames.to_vec();
    ordered.sort();
    ordered.dedup();
    ordered.iter().map(|f| work_dir.join(f)).collect()
}

/// 视频合成器
#[derive(Clone)]
pub struct FrameSequencer {
    encoder: Arc<dyn VideoEncoder>,
}

impl FrameSequencer {
    pub fn new(encoder: Arc<dyn VideoEncoder>) -> Self {
        Self { encoder }
    }

    /// 判断视频是否需要重新渲染
    ///
    /// 帧列表文件记录的是上一次成功渲染所用的帧，以下任一情况视为过期：
    /// - 视频或帧列表缺失
    /// - 帧列表与当前帧集合不一致
    /// - 视频比帧列表或任一成员帧更旧（上次渲染中途中断）
    pub async fn is_stale(
        &self,
        work_dir: &Path,
        frames: &[String],
        spec: &AnimationSpec,
        output_name: &str,
        list_name: &str,
    ) -> bool {
        let Some(output_time) = modified(&work_dir.join(output_name)).await else {
            return true;
        };
        let list_path = work_dir.join(list_name);
        let Ok(recorded) = tokio::fs::read_to_string(&list_path).await else {
            return true;
        };

        let ordered = ordered_frames(work_dir, frames);
        if recorded != render_concat_list(&ordered, spec.frame_duration) {
            debug!("帧集合已变化: {}", output_name);
            return true;
        }

        if modified(&list_path).await.is_some_and(|t| t > output_time) {
            return true;
        }
        for frame in &ordered {
            if modified(frame).await.is_some_and(|t| t > output_time) {
                debug!("帧比视频新: {:?}", frame);
                return true;
            }
        }
        false
    }

    /// 合成一个视频
    ///
    /// 帧数不足 `min_frames`（至少为 1）时不调用编码器。
    ///
    /// # 返回
    /// - `Some(path)`: 输出视频路径（位于工作目录）
    /// - `None`: 帧数不足或编码失败（失败时帧列表被删除）
    pub async fn assemble(
        &self,
        work_dir: &Path,
        frames: &[String],
        min_frames: usize,
        spec: &AnimationSpec,
        output_name: &str,
        list_name: &str,
    ) -> Option<PathBuf> {
        if frames.is_empty() || frames.len() < min_frames {
            return None;
        }

        let request = EncodeRequest {
            frames: ordered_frames(work_dir, frames),
            frame_duration: spec.frame_duration,
            crf: spec.crf,
            list_path: work_dir.join(list_name),
            output: work_dir.join(output_name),
        };

        info!("渲染视频 {} ({} 帧)...", output_name, request.frames.len());
        match self.encoder.encode(&request).await {
            Ok(()) => Some(request.output),
            Err(e) => {
                warn!("视频渲染失败 {}: {:#}", output_name, e);
                // 删除帧列表，下一轮必然判定为过期并重试
                let _ = tokio::fs::remove_file(&request.list_path).await;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::AnimationLayout;
    use crate::testing::RecordingEncoder;
    use tempfile::TempDir;

    fn spec() -> AnimationSpec {
        AnimationSpec {
            layout: AnimationLayout::FlareGroups { min_frames: 5 },
            frame_duration: 0.15,
            crf: 23,
        }
    }

    fn names(n: usize) -> Vec<String> {
        // 逆序给出，验证合成前排序
        (0..n).rev().map(|i| format!("flares_g_s{:04}.png", i)).collect()
    }

    #[tokio::test]
    async fn test_zero_frames_never_encodes() {
        let encoder = Arc::new(RecordingEncoder::new());
        let sequencer = FrameSequencer::new(encoder.clone());
        let dir = TempDir::new().unwrap();

        let out = sequencer
            .assemble(dir.path(), &[], 1, &spec(), "x.mp4", "x.txt")
            .await;
        assert!(out.is_none());
        assert!(encoder.requests().is_empty());
    }

    #[tokio::test]
    async fn test_group_with_four_frames_is_skipped() {
        let encoder = Arc::new(RecordingEncoder::new());
        let sequencer = FrameSequencer::new(encoder.clone());
        let dir = TempDir::new().unwrap();

        let out = sequencer
            .assemble(dir.path(), &names(4), 5, &spec(), "g.mp4", "g.txt")
            .await;
        assert!(out.is_none());
        assert!(encoder.requests().is_empty());
    }

    #[tokio::test]
    async fn test_group_with_five_frames_encodes_in_order() {
        let encoder = Arc::new(RecordingEncoder::new());
        let sequencer = FrameSequencer::new(encoder.clone());
        let dir = TempDir::new().unwrap();

        let out = sequencer
            .assemble(
                dir.path(),
                &names(5),
                5,
                &spec(),
                &flare_output_name("flares_g"),
                &flare_list_name("flares_g"),
            )
            .await;

        assert_eq!(out, Some(dir.path().join("flare_anim_flares_g.mp4")));
        let requests = encoder.requests();
        assert_eq!(requests.len(), 1);
        let frames: Vec<PathBuf> = (0..5)
            .map(|i| dir.path().join(format!("flares_g_s{:04}.png", i)))
            .collect();
        assert_eq!(requests[0].frames, frames);
        assert_eq!(requests[0].frame_duration, 0.15);
        assert_eq!(requests[0].crf, 23);
        assert_eq!(requests[0].list_path, dir.path().join("flares_g.txt"));
    }

    #[tokio::test]
    async fn test_encode_failure_returns_none() {
        let encoder = Arc::new(RecordingEncoder::new());
        encoder.set_fail(true);
        let sequencer = FrameSequencer::new(encoder.clone());
        let dir = TempDir::new().unwrap();

        let out = sequencer
            .assemble(dir.path(), &names(1), 1, &spec(), "x.mp4", FRAME_LIST_NAME)
            .await;
        assert!(out.is_none());
        assert_eq!(encoder.requests().len(), 1);
        assert!(!dir.path().join(FRAME_LIST_NAME).exists());
    }

    fn write_frames(dir: &Path, frames: &[String]) {
        for name in frames {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
    }

    fn backdate(path: &Path, secs: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - std::time::Duration::from_secs(secs))
            .unwrap();
    }

    #[tokio::test]
    async fn test_fresh_render_is_not_stale() {
        let encoder = Arc::new(RecordingEncoder::new());
        let sequencer = FrameSequencer::new(encoder.clone());
        let dir = TempDir::new().unwrap();
        let frames = names(5);
        write_frames(dir.path(), &frames);

        assert!(sequencer.is_stale(dir.path(), &frames, &spec(), "g.mp4", "g.txt").await);
        sequencer
            .assemble(dir.path(), &frames, 5, &spec(), "g.mp4", "g.txt")
            .await
            .unwrap();
        assert!(!sequencer.is_stale(dir.path(), &frames, &spec(), "g.mp4", "g.txt").await);
    }

    #[tokio::test]
    async fn test_changed_frame_set_is_stale() {
        let encoder = Arc::new(RecordingEncoder::new());
        let sequencer = FrameSequencer::new(encoder.clone());
        let dir = TempDir::new().unwrap();
        let frames = names(5);
        write_frames(dir.path(), &frames);
        sequencer
            .assemble(dir.path(), &frames, 5, &spec(), "g.mp4", "g.txt")
            .await
            .unwrap();

        let grown = names(6);
        write_frames(dir.path(), &grown);
        assert!(sequencer.is_stale(dir.path(), &grown, &spec(), "g.mp4", "g.txt").await);
        assert!(sequencer.is_stale(dir.path(), &frames[1..], &spec(), "g.mp4", "g.txt").await);
    }

    #[tokio::test]
    async fn test_frame_newer_than_video_is_stale() {
        let encoder = Arc::new(RecordingEncoder::new());
        let sequencer = FrameSequencer::new(encoder.clone());
        let dir = TempDir::new().unwrap();
        let frames = names(5);
        write_frames(dir.path(), &frames);
        for name in &frames {
            backdate(&dir.path().join(name), 120);
        }
        sequencer
            .assemble(dir.path(), &frames, 5, &spec(), "g.mp4", "g.txt")
            .await
            .unwrap();
        backdate(&dir.path().join("g.txt"), 120);
        backdate(&dir.path().join("g.mp4"), 60);
        assert!(!sequencer.is_stale(dir.path(), &frames, &spec(), "g.mp4", "g.txt").await);

        // 同名帧被覆盖，视频已经落后
        std::fs::write(dir.path().join(&frames[0]), b"y").unwrap();
        assert!(sequencer.is_stale(dir.path(), &frames, &spec(), "g.mp4", "g.txt").await);
    }

    #[tokio::test]
    async fn test_failed_render_stays_stale() {
        let encoder = Arc::new(RecordingEncoder::new());
        let sequencer = FrameSequencer::new(encoder.clone());
        let dir = TempDir::new().unwrap();
        let frames = names(5);
        write_frames(dir.path(), &frames);
        sequencer
            .assemble(dir.path(), &frames[..4], 1, &spec(), "g.mp4", "g.txt")
            .await
            .unwrap();

        encoder.set_fail(true);
        assert!(sequencer
            .assemble(dir.path(), &frames, 1, &spec(), "g.mp4", "g.txt")
            .await
            .is_none());
        // 旧视频保留，但一直是过期状态，直到渲染成功
        assert!(dir.path().join("g.mp4").exists());
        assert!(sequencer.is_stale(dir.path(), &frames, &spec(), "g.mp4", "g.txt").await);
    }

    #[tokio::test]
    async fn test_collect_frames_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["gong_b.jpg", "gong_a.jpg", "gong_anim.mp4", "input.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let frames = collect_frames(dir.path(), &FrameConvention::new("gong_", &["jpg"]))
            .await
            .unwrap();
        assert_eq!(frames, vec!["gong_a.jpg".to_string(), "gong_b.jpg".to_string()]);
    }
}
