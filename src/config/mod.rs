// 配置管理模块

pub mod catalog;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub use catalog::{Catalog, PinnedResource};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 静态托管配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 存储目录配置
    #[serde(default)]
    pub storage: StorageConfig,
    /// 同步周期配置
    #[serde(default)]
    pub sync: SyncConfig,
    /// 视频编码配置
    #[serde(default)]
    pub encoder: EncoderConfig,
    /// 事件数据接口配置
    #[serde(default)]
    pub feed: FeedConfig,
    /// 🔥 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 最多保留的日志文件数（按天滚动）
    #[serde(default = "default_log_max_files")]
    pub max_files: usize,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_files() -> usize {
    7
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            level: default_log_level(),
            max_files: default_log_max_files(),
        }
    }
}

/// 静态托管配置
///
/// 只负责把发布目录原样暴露出去，不参与同步逻辑
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 是否启动内置静态服务
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_server_enabled() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// 存储目录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 发布目录（静态服务器直接托管）
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// 各数据源的工作目录根
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("public/cache")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data_storage")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            data_dir: default_data_dir(),
        }
    }
}

/// 同步周期配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// 完整同步间隔（秒），默认30分钟
    #[serde(default = "default_full_interval_secs")]
    pub full_interval_secs: u64,
    /// 轻量同步间隔（秒），默认10分钟
    #[serde(default = "default_mini_interval_secs")]
    pub mini_interval_secs: u64,
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 每批并发下载数
    #[serde(default = "default_download_window")]
    pub download_window: usize,
    /// 轻量同步刷新的数据源 ID
    #[serde(default = "default_mini_source")]
    pub mini_source: String,
    /// 启动时发布目录缺少清单则立即执行一次完整同步
    #[serde(default = "default_sync_on_startup")]
    pub sync_on_startup: bool,
}

fn default_full_interval_secs() -> u64 {
    30 * 60
}

fn default_mini_interval_secs() -> u64 {
    10 * 60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_download_window() -> usize {
    5
}

fn default_mini_source() -> String {
    "stereo".to_string()
}

fn default_sync_on_startup() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            full_interval_secs: default_full_interval_secs(),
            mini_interval_secs: default_mini_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            download_window: default_download_window(),
            mini_source: default_mini_source(),
            sync_on_startup: default_sync_on_startup(),
        }
    }
}

/// 视频编码配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// ffmpeg 可执行文件路径
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// x264 预设
    #[serde(default = "default_preset")]
    pub preset: String,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_preset() -> String {
    "fast".to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            preset: default_preset(),
        }
    }
}

/// 事件数据接口配置（NASA DONKI）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// 是否启用
    #[serde(default = "default_feed_enabled")]
    pub enabled: bool,
    /// 接口地址
    #[serde(default = "default_feed_endpoint")]
    pub endpoint: String,
    /// API Key
    #[serde(default = "default_feed_api_key")]
    pub api_key: String,
    /// 向前回溯天数
    #[serde(default = "default_feed_lookback_days")]
    pub lookback_days: i64,
    /// 发布目录中的缓存文件名
    #[serde(default = "default_feed_filename")]
    pub filename: String,
}

fn default_feed_enabled() -> bool {
    true
}

fn default_feed_endpoint() -> String {
    "https://api.nasa.gov/DONKI/CME".to_string()
}

fn default_feed_api_key() -> String {
    "DEMO_KEY".to_string()
}

/// 回溯天数上限
pub const MAX_FEED_LOOKBACK_DAYS: i64 = 3650;

fn default_feed_lookback_days() -> i64 {
    30
}

fn default_feed_filename() -> String {
    "donki.json".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: default_feed_enabled(),
            endpoint: default_feed_endpoint(),
            api_key: default_feed_api_key(),
            lookback_days: default_feed_lookback_days(),
            filename: default_feed_filename(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("读取配置文件失败: {:?}", path))?;

        let config: AppConfig = toml::from_str(&content).context("解析配置文件失败")?;
        config.validate().context("配置校验失败")?;

        Ok(config)
    }

    /// 保存配置到文件
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;

        // 确保父目录存在
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("创建配置目录失败")?;
        }

        fs::write(path, content)
            .await
            .with_context(|| format!("写入配置文件失败: {:?}", path))?;

        tracing::info!("✓ 配置已保存: {:?}", path);
        Ok(())
    }

    /// 加载或创建默认配置
    ///
    /// 文件不存在时写出一份默认配置；文件存在但无效时使用默认值并保留原文件
    pub async fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("配置文件加载成功: {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("配置文件加载失败，使用默认配置: {:#}", e);
                let default_config = Self::default();

                if !path.exists() {
                    if let Err(e) = default_config.save_to_file(path).await {
                        tracing::error!("保存默认配置失败: {:#}", e);
                    }
                }

                default_config
            }
        }
    }

    /// 校验数值型配置
    pub fn validate(&self) -> Result<()> {
        if self.sync.full_interval_secs == 0 {
            anyhow::bail!("sync.full_interval_secs 必须大于 0");
        }
        if self.sync.mini_interval_secs == 0 {
            anyhow::bail!("sync.mini_interval_secs 必须大于 0");
        }
        if self.sync.request_timeout_secs == 0 {
            anyhow::bail!("sync.request_timeout_secs 必须大于 0");
        }
        if self.sync.download_window == 0 {
            anyhow::bail!("sync.download_window 必须大于 0");
        }
        if !(0..=MAX_FEED_LOOKBACK_DAYS).contains(&self.feed.lookback_days) {
            anyhow::bail!(
                "feed.lookback_days 必须在 0 到 {} 之间",
                MAX_FEED_LOOKBACK_DAYS
            );
        }
        Ok(())
    }
}
