//! 周期触发器
//!
//! 每个调度项一个后台任务，按固定间隔发送触发事件。
//! 错过的节拍直接跳过，不补发。

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 同步轮次类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleKind {
    /// 完整同步
    Full,
    /// 轻量同步（仅刷新低延迟数据源和清单）
    Mini,
}

/// 调度配置
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub kind: CycleKind,
    pub enabled: bool,
    pub interval: Duration,
}

/// 周期调度器
pub struct SyncScheduler {
    event_tx: mpsc::UnboundedSender<CycleKind>,
    cancel_token: CancellationToken,
    tasks: HashMap<CycleKind, tokio::task::JoinHandle<()>>,
}

impl SyncScheduler {
    pub fn new(event_tx: mpsc::UnboundedSender<CycleKind>) -> Self {
        Self {
            event_tx,
            cancel_token: CancellationToken::new(),
            tasks: HashMap::new(),
        }
    }

    /// 添加调度项，同类型已存在则替换
    pub fn add_schedule(&mut self, config: ScheduleConfig) {
        if !config.enabled || config.interval.is_zero() {
            return;
        }

        self.remove_schedule(config.kind);

        let event_tx = self.event_tx.clone();
        let cancel_token = self.cancel_token.child_token();
        let kind = config.kind;
        let interval = config.interval;

        let handle = tokio::spawn(async move {
            Self::run_interval(kind, interval, event_tx, cancel_token).await;
        });

        self.tasks.insert(kind, handle);
        info!("已添加同步调度: {:?}, 间隔 {:?}", kind, interval);
    }

    pub fn remove_schedule(&mut self, kind: CycleKind) {
        if let Some(handle) = self.tasks.remove(&kind) {
            handle.abort();
            info!("已移除同步调度: {:?}", kind);
        }
    }

    async fn run_interval(
        kind: CycleKind,
        period: Duration,
        event_tx: mpsc::UnboundedSender<CycleKind>,
        cancel_token: CancellationToken,
    ) {
        // 第一次触发在一个周期之后，启动同步由调用方决定
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("同步调度触发: {:?}", kind);
                    if let Err(e) = event_tx.send(kind) {
                        warn!("发送同步触发事件失败: {}", e);
                        break;
                    }
                }
                _ = cancel_token.cancelled() => {
                    debug!("同步调度已取消: {:?}", kind);
                    break;
                }
            }
        }
    }

    pub fn schedule_count(&self) -> usize {
        self.tasks.len()
    }

    /// 停止所有调度
    pub fn shutdown(&mut self) {
        self.cancel_token.cancel();
        for (kind, handle) in self.tasks.drain() {
            handle.abort();
            debug!("已停止同步调度: {:?}", kind);
        }
        info!("所有同步调度已停止");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
