//! 耀斑区域递归抓取
//!
//! 远端按事件区域分目录存放图片，层级不固定。抓取时把相对路径扁平化为
//! 文件名（`/` 替换为连接符），避免不同目录下的同名文件互相覆盖。
//!
//! 文件名中 `<前缀>_s<4位数字>` 的前缀即区域分组键，同组帧合成一个视频。
//! 该约定来自提供方的命名习惯，格式变化时新文件将无法分组。

use super::RemoteFrame;
use crate::fetcher::RemoteFetcher;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// 递归目录抓取器
pub struct FlareCrawler<'a> {
    fetcher: &'a dyn RemoteFetcher,
    base_url: String,
    join_char: char,
    file_re: Regex,
    dir_re: Regex,
}

impl<'a> FlareCrawler<'a> {
    pub fn new(fetcher: &'a dyn RemoteFetcher, base_url: &str, join_char: char) -> Result<Self> {
        Ok(Self {
            fetcher,
            base_url: base_url.to_string(),
            join_char,
            file_re: Regex::new(r#"href="([^"]+\.(?:png|jpg))""#)?,
            dir_re: Regex::new(r#"href="([^"]+/)""#)?,
        })
    }

    /// 从根目录开始抓取全部帧
    ///
    /// 任意一级目录获取失败都会整体失败，避免把未抓到的文件当成远端已删除
    pub async fn crawl_all(&self, root: &str) -> Result<Vec<RemoteFrame>> {
        let mut visited = HashSet::new();
        let mut frames = Vec::new();
        self.crawl(root, &mut visited, &mut frames).await?;
        Ok(frames)
    }

    #[async_recursion::async_recursion]
    async fn crawl(
        &self,
        rel_path: &str,
        visited: &mut HashSet<String>,
        frames: &mut Vec<RemoteFrame>,
    ) -> Result<()> {
        if !visited.insert(rel_path.to_string()) {
            return Ok(());
        }

        let url = format!("{}{}", self.base_url, rel_path);
        let body = self
            .fetcher
            .fetch_text(&url)
            .await
            .with_context(|| format!("获取目录索引失败: {}", url))?;

        let (files, dirs) = self.parse_page(&body);
        debug!("目录 {}: {} 个文件, {} 个子目录", rel_path, files.len(), dirs.len());

        for file in files {
            let rel = format!("{}{}", rel_path, file);
            frames.push(RemoteFrame::new(
                format!("{}{}", self.base_url, rel),
                flatten_path(&rel, self.join_char),
            ));
        }

        for dir in dirs {
            self.crawl(&format!("{}{}", rel_path, dir), visited, frames)
                .await?;
        }

        Ok(())
    }

    fn parse_page(&self, body: &str) -> (Vec<String>, Vec<String>) {
        let files = self
            .file_re
            .captures_iter(body)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|href| is_relative_child(href))
            .map(str::to_string)
            .collect();

        let dirs = self
            .dir_re
            .captures_iter(body)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|href| is_relative_child(href))
            .map(str::to_string)
            .collect();

        (files, dirs)
    }
}

/// 只跟随当前目录下的相对链接
fn is_relative_child(href: &str) -> bool {
    !(href.starts_with('/')
        || href.starts_with('?')
        || href.starts_with('#')
        || href.starts_with("./")
        || href.starts_with("../")
        || href.contains("://"))
}

/// 相对路径扁平化为文件名
pub fn flatten_path(rel_path: &str, join_char: char) -> String {
    rel_path.replace('/', &join_char.to_string())
}

/// 提取区域分组键：第一个 `_s` 后跟 4 位数字之前的部分
pub fn group_key(filename: &str) -> Option<&str> {
    let bytes = filename.as_bytes();
    filename.match_indices("_s").find_map(|(idx, _)| {
        let digits = bytes.get(idx + 2..idx + 6)?;
        if digits.iter().all(u8::is_ascii_digit) {
            Some(&filename[..idx])
        } else {
            None
        }
    })
}

/// 按分组键归类，组内按文件名排序；无法分组的文件被忽略
pub fn group_frames<'f>(filenames: impl IntoIterator<Item = &'f str>) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in filenames {
        if let Some(key) = group_key(name) {
            groups
                .entry(key.to_string())
                .or_default()
                .push(name.to_string());
        }
    }
    for members in groups.values_mut() {
        members.sort();
        members.dedup();
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFetcher;

    const BASE: &str = "https://noaa.test/images/";

    #[test]
    fn test_group_key() {
        assert_eq!(
            group_key("flares_2025_ar3664_s0001.png"),
            Some("flares_2025_ar3664")
        );
        assert_eq!(
            group_key("flares_a_sun_s0042_extra_s1234.png"),
            Some("flares_a_sun")
        );
        assert_eq!(group_key("flares_summary.png"), None);
        assert_eq!(group_key("flares_x_s12.png"), None);
        assert_eq!(group_key("flares_x_s123a.png"), None);
    }

    #[test]
    fn test_group_frames_sorts_members() {
        let groups = group_frames([
            "flares_b_s0002.png",
            "flares_a_s0002.png",
            "flares_a_s0001.png",
            "flares_readme.png",
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups["flares_a"],
            vec!["flares_a_s0001.png".to_string(), "flares_a_s0002.png".to_string()]
        );
        assert_eq!(groups["flares_b"], vec!["flares_b_s0002.png".to_string()]);
    }

    #[test]
    fn test_flatten_path() {
        assert_eq!(
            flatten_path("flares/2025/ar1/img_s0001.png", '_'),
            "flares_2025_ar1_img_s0001.png"
        );
    }

    #[test]
    fn test_relative_child_filter() {
        assert!(is_relative_child("2025/"));
        assert!(is_relative_child("img.png"));
        assert!(!is_relative_child("/images/"));
        assert!(!is_relative_child("../"));
        assert!(!is_relative_child("?C=N;O=D"));
        assert!(!is_relative_child("https://elsewhere/x/"));
    }

    #[tokio::test]
    async fn test_crawl_nested_directories() {
        let fetcher = FakeFetcher::new();
        fetcher.set_page(
            &format!("{}flares/", BASE),
            r#"<a href="/images/">Parent</a>
               <a href="2025/">2025/</a>
               <a href="overview.png">overview.png</a>"#,
        );
        fetcher.set_page(
            &format!("{}flares/2025/", BASE),
            r#"<a href="../">Up</a>
               <a href="ar3664/">ar3664/</a>"#,
        );
        fetcher.set_page(
            &format!("{}flares/2025/ar3664/", BASE),
            r#"<a href="m1_s0001.png">a</a>
               <a href="m1_s0002.jpg">b</a>
               <a href="notes.txt">c</a>"#,
        );

        let crawler = FlareCrawler::new(&fetcher, BASE, '_').unwrap();
        let frames = crawler.crawl_all("flares/").await.unwrap();

        let names: Vec<&str> = frames.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "flares_overview.png",
                "flares_2025_ar3664_m1_s0001.png",
                "flares_2025_ar3664_m1_s0002.jpg",
            ]
        );
        assert_eq!(
            frames[1].url,
            "https://noaa.test/images/flares/2025/ar3664/m1_s0001.png"
        );
        assert_eq!(group_key(names[1]), Some("flares_2025_ar3664_m1"));
    }

    #[tokio::test]
    async fn test_crawl_fails_when_subdirectory_fails() {
        let fetcher = FakeFetcher::new();
        fetcher.set_page(&format!("{}flares/", BASE), r#"<a href="gone/">gone/</a>"#);

        let crawler = FlareCrawler::new(&fetcher, BASE, '_').unwrap();
        assert!(crawler.crawl_all("flares/").await.is_err());
    }
}
