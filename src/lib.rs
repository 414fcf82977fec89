// Solar Station
// 空间天气影像镜像与动画合成服务

// 配置管理模块（含内置数据源目录）
pub mod config;

// 日志系统
pub mod logging;

// 远端拉取
pub mod fetcher;

// 批量下载
pub mod downloader;

// 列表解析
pub mod source;

// 本地镜像差异与裁剪
pub mod mirror;

// 视频合成
pub mod assembler;

// 发布目录与清单
pub mod publisher;

// 🔥 同步编排与周期调度
pub mod sync;

// 静态托管
pub mod server;

#[cfg(test)]
mod testing;

// 导出常用类型
pub use config::{AppConfig, Catalog};
pub use downloader::{BatchDownloader, DownloadTask};
pub use fetcher::{FetchError, HttpFetcher, RemoteFetcher};
pub use publisher::{Manifest, ManifestPublisher};
pub use source::{RemoteFrame, SourceConfig};
pub use sync::{SyncOrchestrator, SyncScheduler};
