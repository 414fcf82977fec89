use solar_station::{
    assembler::FfmpegEncoder,
    config::{AppConfig, Catalog, LogConfig, DEFAULT_CONFIG_PATH},
    fetcher::HttpFetcher,
    logging, server,
    sync::{dispatch_triggers, CycleKind, ScheduleConfig, SyncOrchestrator, SyncScheduler},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// 加载日志配置
///
/// 日志系统要先于完整配置初始化，这里只读取 [log] 段，失败时返回默认配置
async fn load_log_config() -> LogConfig {
    if let Ok(content) = tokio::fs::read_to_string(DEFAULT_CONFIG_PATH).await {
        if let Ok(config) = toml::from_str::<toml::Value>(&content) {
            if let Some(log_table) = config.get("log") {
                if let Ok(log_config) = log_table.clone().try_into::<LogConfig>() {
                    return log_config;
                }
            }
        }
    }

    LogConfig::default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 🔥 初始化日志系统（必须保持 _log_guard 存活）
    let log_config = load_log_config().await;
    let _log_guard = logging::init_logging(&log_config);

    info!("Solar Station v{} 启动中...", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_or_default(DEFAULT_CONFIG_PATH).await;
    tokio::fs::create_dir_all(&config.storage.cache_dir).await?;
    tokio::fs::create_dir_all(&config.storage.data_dir).await?;

    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(
        config.sync.request_timeout_secs,
    ))?);
    let encoder = Arc::new(FfmpegEncoder::new(
        config.encoder.ffmpeg_path.clone(),
        config.encoder.preset.clone(),
    ));
    let orchestrator = Arc::new(SyncOrchestrator::new(
        &config,
        Catalog::builtin(),
        fetcher,
        encoder,
    ));
    info!(
        "同步编排器初始化完成: {} 个数据源, {} 个静态图表",
        orchestrator.catalog().sources.len(),
        orchestrator.catalog().charts.len()
    );

    // 发布目录还没有清单时立即做一次完整同步
    if config.sync.sync_on_startup && !orchestrator.manifest_path().exists() {
        info!("未找到清单文件，执行启动同步");
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.run_full_cycle().await;
        });
    }

    // 周期调度
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut scheduler = SyncScheduler::new(event_tx);
    scheduler.add_schedule(ScheduleConfig {
        kind: CycleKind::Full,
        enabled: true,
        interval: Duration::from_secs(config.sync.full_interval_secs),
    });
    scheduler.add_schedule(ScheduleConfig {
        kind: CycleKind::Mini,
        enabled: true,
        interval: Duration::from_secs(config.sync.mini_interval_secs),
    });
    let dispatcher = tokio::spawn(dispatch_triggers(orchestrator.clone(), event_rx));

    if config.server.enabled {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let app = server::build_router(&config.storage.cache_dir);

        info!("服务器启动在: http://{}", addr);
        info!("发布目录: http://{}{}/", addr, server::CACHE_ROUTE);
        info!("健康检查: http://{}/health", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let server = axum::serve(listener, app);

        // 🔥 使用 select! 监听关闭信号
        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    tracing::error!("服务器错误: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("收到 Ctrl+C，开始关闭...");
            }
        }
    } else {
        info!("静态托管已禁用，仅运行同步任务");
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("监听关闭信号失败: {}", e);
        }
        info!("收到 Ctrl+C，开始关闭...");
    }

    scheduler.shutdown();
    drop(scheduler);
    if let Err(e) = dispatcher.await {
        warn!("调度分发任务异常退出: {}", e);
    }
    info!("应用已安全退出");

    Ok(())
}
