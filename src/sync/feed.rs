// 事件数据（NASA DONKI CME）
//
// 每轮拉取一次，校验为合法 JSON 后原样写入发布目录，不做差异比较

use crate::config::{FeedConfig, MAX_FEED_LOOKBACK_DAYS};
use crate::fetcher::RemoteFetcher;
use crate::publisher::write_atomic;
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use std::path::Path;
use tracing::info;

/// 拼接查询地址，日期区间为 [today - lookback_days, today]
///
/// 回溯天数限制在 [0, MAX_FEED_LOOKBACK_DAYS]
pub fn feed_url(config: &FeedConfig, today: NaiveDate) -> String {
    let days = config.lookback_days.clamp(0, MAX_FEED_LOOKBACK_DAYS) as u64;
    let start = today.checked_sub_days(Days::new(days)).unwrap_or(today);
    format!(
        "{}?startDate={}&endDate={}&api_key={}",
        config.endpoint,
        start.format("%Y-%m-%d"),
        today.format("%Y-%m-%d"),
        config.api_key
    )
}

/// 刷新事件数据缓存
///
/// 拉取失败或返回内容不是 JSON 时保留旧缓存
pub async fn refresh_event_feed(
    fetcher: &dyn RemoteFetcher,
    config: &FeedConfig,
    cache_dir: &Path,
    today: NaiveDate,
) -> Result<()> {
    let url = feed_url(config, today);
    let body = fetcher
        .fetch_text(&url)
        .await
        .with_context(|| format!("获取事件数据失败: {}", config.endpoint))?;

    serde_json::from_str::<serde_json::Value>(&body).context("事件数据不是合法 JSON")?;

    write_atomic(cache_dir, &config.filename, body.as_bytes()).await?;
    info!("事件数据已更新: {} ({} 字节)", config.filename, body.len());
    Ok(())
}
