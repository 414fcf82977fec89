// 本地镜像差异计算
//
// 目录列表本身就是持久状态，这里只在内存里按文件名做集合运算

use crate::downloader::DownloadTask;
use crate::source::{FrameConvention, RemoteFrame};
use std::collections::HashSet;

/// 一轮同步中的远端文件集合
///
/// 下载前用它求缺失集，下载后重新列目录再求孤儿集
#[derive(Debug, Clone)]
pub struct MirrorDiff {
    /// 按远端出现顺序去重后的帧
    frames: Vec<RemoteFrame>,
    names: HashSet<String>,
}

impl MirrorDiff {
    pub fn new(remote: &[RemoteFrame]) -> Self {
        let mut names = HashSet::with_capacity(remote.len());
        let mut frames = Vec::with_capacity(remote.len());
        for frame in remote {
            if names.insert(frame.filename.clone()) {
                frames.push(frame.clone());
            }
        }
        Self { frames, names }
    }

    /// 远端文件数（去重后）
    pub fn remote_len(&self) -> usize {
        self.frames.len()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.names.contains(filename)
    }

    /// missing = remote − local
    pub fn missing(&self, local: &HashSet<String>) -> Vec<DownloadTask> {
        self.frames
            .iter()
            .filter(|f| !local.contains(&f.filename))
            .map(DownloadTask::from)
            .collect()
    }

    /// 全部远端帧（快照模式每次全量拉取）
    pub fn all(&self) -> Vec<DownloadTask> {
        self.frames.iter().map(DownloadTask::from).collect()
    }

    /// orphan = local − remote，仅限符合命名约定的文件，按文件名排序
    pub fn orphans(&self, local: &HashSet<String>, convention: &FrameConvention) -> Vec<String> {
        let mut orphans: Vec<String> = local
            .iter()
            .filter(|name| convention.matches(name) && !self.names.contains(*name))
            .cloned()
            .collect();
        orphans.sort();
        orphans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str) -> RemoteFrame {
        RemoteFrame::new(format!("https://noaa.test/{}", name), name)
    }

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_dedups_and_keeps_order() {
        let remote = vec![frame("ccor1_b.jpg"), frame("ccor1_a.jpg"), frame("ccor1_b.jpg")];
        let diff = MirrorDiff::new(&remote);
        assert_eq!(diff.remote_len(), 2);

        let missing = diff.missing(&set(&["ccor1_a.jpg"]));
        assert_eq!(missing, vec![DownloadTask::new("https://noaa.test/ccor1_b.jpg", "ccor1_b.jpg")]);
        assert_eq!(diff.all().len(), 2);
    }

    #[test]
    fn test_orphans_respect_convention() {
        let convention = FrameConvention::new("ccor1_", &["jpg"]);
        let diff = MirrorDiff::new(&[frame("ccor1_new.jpg")]);
        let local = set(&[
            "ccor1_new.jpg",
            "ccor1_old2.jpg",
            "ccor1_old1.jpg",
            "ccor1_anim.mp4",
            "input.txt",
            ".ccor1_x.jpg.part",
        ]);

        assert_eq!(
            diff.orphans(&local, &convention),
            vec!["ccor1_old1.jpg".to_string(), "ccor1_old2.jpg".to_string()]
        );
    }

    #[test]
    fn test_empty_remote_orphans_everything_in_convention() {
        let convention = FrameConvention::new("drap_anim_", &["png"]);
        let diff = MirrorDiff::new(&[]);
        let local = set(&["drap_anim_1.png", "drap_global_anim.mp4"]);
        assert_eq!(diff.orphans(&local, &convention), vec!["drap_anim_1.png".to_string()]);
        assert!(diff.missing(&local).is_empty());
    }
}
