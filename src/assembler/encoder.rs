// 视频编码
//
// 使用 ffmpeg concat 分离器把有序帧列表合成 H.264 视频

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::debug;

/// 偶数尺寸约束（libx264 + yuv420p 要求宽高为偶数）
pub const EVEN_SCALE_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// 编码请求
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    /// 按播放顺序排列的帧
    pub frames: Vec<PathBuf>,
    /// 每帧显示时长（秒）
    pub frame_duration: f64,
    pub crf: u8,
    /// 帧列表文件路径
    pub list_path: PathBuf,
    /// 输出视频路径（已存在则覆盖）
    pub output: PathBuf,
}

/// 视频编码器
///
/// 失败时不得改动已存在的输出文件
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    async fn encode(&self, request: &EncodeRequest) -> Result<()>;
}

/// 调用外部 ffmpeg 进程的编码器
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg_path: PathBuf,
    preset: String,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, preset: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            preset: preset.into(),
        }
    }

    /// ffmpeg 命令行参数
    fn build_args(&self, request: &EncodeRequest, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            request.list_path.to_string_lossy().into_owned(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-vf".to_string(),
            EVEN_SCALE_FILTER.to_string(),
            "-crf".to_string(),
            request.crf.to_string(),
            "-preset".to_string(),
            self.preset.clone(),
            "-y".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(&self, request: &EncodeRequest) -> Result<()> {
        if request.frames.is_empty() {
            anyhow::bail!("帧列表为空");
        }

        let list = render_concat_list(&request.frames, request.frame_duration);
        tokio::fs::write(&request.list_path, list)
            .await
            .with_context(|| format!("写入帧列表失败: {:?}", request.list_path))?;

        // 先写临时文件，成功后再替换，失败不影响旧视频
        let staging = staging_path_for(&request.output);
        let args = self.build_args(request, &staging);
        debug!("执行 ffmpeg: {:?} {}", self.ffmpeg_path, args.join(" "));

        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("启动 ffmpeg 失败: {:?}", self.ffmpeg_path))?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&staging).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            anyhow::bail!(
                "ffmpeg 退出码 {:?}: {}",
                output.status.code(),
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            );
        }

        tokio::fs::rename(&staging, &request.output)
            .await
            .with_context(|| format!("替换输出视频失败: {:?}", request.output))?;
        Ok(())
    }
}

/// 生成 concat 列表
///
/// 最后一帧重复一次，concat 分离器才会应用它的 duration
pub fn render_concat_list(frames: &[PathBuf], frame_duration: f64) -> String {
    let mut lines = Vec::with_capacity(frames.len() * 2 + 1);
    for frame in frames {
        lines.push(format!("file '{}'", escape_path(frame)));
        lines.push(format!("duration {}", frame_duration));
    }
    if let Some(last) = frames.last() {
        lines.push(format!("file '{}'", escape_path(last)));
    }
    lines.join("\n")
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

fn staging_path_for(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{}.encoding.mp4", name))
}
