// 列表页解析
//
// 每种规则只负责把页面内容变成 (绝对地址, 本地文件名) 列表，
// 重复和乱序由差异阶段处理

use super::flare::FlareCrawler;
use super::{ParseRule, RemoteFrame};
use crate::fetcher::RemoteFetcher;
use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

impl ParseRule {
    /// 拉取并解析远端列表
    ///
    /// 任何拉取或解析失败都向上返回，调用方据此跳过本轮该数据源
    pub async fn collect(
        &self,
        fetcher: &dyn RemoteFetcher,
        listing_url: &str,
    ) -> Result<Vec<RemoteFrame>> {
        let frames = match self {
            ParseRule::FlatPattern {
                pattern,
                base_url,
                filename_prefix,
            } => {
                let body = fetcher
                    .fetch_text(listing_url)
                    .await
                    .with_context(|| format!("获取列表页失败: {}", listing_url))?;
                parse_flat(&body, pattern, base_url, filename_prefix)?
            }
            ParseRule::AnchorTag {
                pattern,
                base_url,
                filename_prefix,
            } => {
                let body = fetcher
                    .fetch_text(listing_url)
                    .await
                    .with_context(|| format!("获取列表页失败: {}", listing_url))?;
                parse_anchor(&body, pattern, base_url, filename_prefix)?
            }
            ParseRule::RecursiveDirectory {
                base_url,
                root,
                join_char,
            } => {
                FlareCrawler::new(fetcher, base_url, *join_char)?
                    .crawl_all(root)
                    .await?
            }
        };

        debug!("列表解析完成: {} 条", frames.len());
        Ok(frames)
    }
}

/// 单页匹配：捕获组 1 是相对于 `base_url` 的文件名
pub fn parse_flat(
    body: &str,
    pattern: &str,
    base_url: &str,
    filename_prefix: &str,
) -> Result<Vec<RemoteFrame>> {
    let re = Regex::new(pattern).with_context(|| format!("无效的匹配规则: {}", pattern))?;

    Ok(re
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let name = m.as_str();
            RemoteFrame::new(
                format!("{}{}", base_url, name),
                format!("{}{}", filename_prefix, name),
            )
        })
        .collect())
}

/// 站内绝对路径匹配：捕获组 1 是以 `/` 开头的路径，文件名取最后一段
pub fn parse_anchor(
    body: &str,
    pattern: &str,
    base_url: &str,
    filename_prefix: &str,
) -> Result<Vec<RemoteFrame>> {
    let re = Regex::new(pattern).with_context(|| format!("无效的匹配规则: {}", pattern))?;
    let base = base_url.trim_end_matches('/');

    Ok(re
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| {
            let path = m.as_str();
            let last = path.rsplit('/').next().filter(|s| !s.is_empty())?;
            Some(RemoteFrame::new(
                format!("{}{}", base, path),
                format!("{}{}", filename_prefix, last),
            ))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFetcher;

    const ENLIL_PAGE: &str = r#"
        <a href="?C=N;O=D">Name</a>
        <a href="/images/animations/">Parent Directory</a>
        <a href="enlil_com2_20250101T0000.jpg">enlil_com2_20250101T0000.jpg</a>
        <a href="enlil_com2_20250101T0100.jpg">enlil_com2_20250101T0100.jpg</a>
        <a href="enlil_com2_20250101T0100.jpg">duplicate</a>
        <a href="other_20250101.jpg">other</a>
    "#;

    #[test]
    fn test_parse_flat() {
        let frames = parse_flat(
            ENLIL_PAGE,
            r#"href="(enlil_com2_[^"]+\.jpg)""#,
            "https://noaa.test/animations/enlil/",
            "enlil_",
        )
        .unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames[0],
            RemoteFrame::new(
                "https://noaa.test/animations/enlil/enlil_com2_20250101T0000.jpg",
                "enlil_enlil_com2_20250101T0000.jpg"
            )
        );
        // 重复项保留，由差异阶段去重
        assert_eq!(frames[1].filename, frames[2].filename);
    }

    #[test]
    fn test_parse_anchor_case_insensitive() {
        let body = r#"
            <IMG SRC="/oQR/fqg/2025/01/01/farside_0000.jpg">
            <img src="/oQR/fqg/2025/01/01/farside_1200.jpg" alt="">
            <img src="/other/thing.jpg">
        "#;
        let frames = parse_anchor(
            body,
            r#"(?i)src="(/oQR/fqg/[^"]+\.jpg)""#,
            "https://farside.test",
            "gong_",
        )
        .unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0].url,
            "https://farside.test/oQR/fqg/2025/01/01/farside_0000.jpg"
        );
        assert_eq!(frames[0].filename, "gong_farside_0000.jpg");
        assert_eq!(frames[1].filename, "gong_farside_1200.jpg");
    }

    #[test]
    fn test_parse_anchor_mixed_extensions() {
        let body = r#"<img src="/beacon/latest_256/ahead_euvi_195_latest.jpg">
            <img src="/beacon/latest_256/behind_cor2_latest.gif">"#;
        let frames = parse_anchor(
            body,
            r#"(?i)src="(/beacon/[^"]+\.(?:jpg|gif))""#,
            "https://stereo.test/",
            "stereo_",
        )
        .unwrap();

        let names: Vec<&str> = frames.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["stereo_ahead_euvi_195_latest.jpg", "stereo_behind_cor2_latest.gif"]
        );
        assert_eq!(
            frames[1].url,
            "https://stereo.test/beacon/latest_256/behind_cor2_latest.gif"
        );
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(parse_flat("", "(unclosed", "", "").is_err());
    }

    #[tokio::test]
    async fn test_collect_propagates_fetch_error() {
        let fetcher = FakeFetcher::new();
        let rule = ParseRule::FlatPattern {
            pattern: r#"href="([^"]+\.jpg)""#.to_string(),
            base_url: "https://noaa.test/".to_string(),
            filename_prefix: "x_".to_string(),
        };

        assert!(rule.collect(&fetcher, "https://noaa.test/").await.is_err());

        fetcher.set_page("https://noaa.test/", r#"<a href="a.jpg">"#);
        let frames = rule.collect(&fetcher, "https://noaa.test/").await.unwrap();
        assert_eq!(frames, vec![RemoteFrame::new("https://noaa.test/a.jpg", "x_a.jpg")]);
    }
}
