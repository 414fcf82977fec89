//! 同步编排与周期调度

pub mod feed;
mod guard;
pub mod orchestrator;
pub mod scheduler;

pub use feed::refresh_event_feed;
pub use guard::{CycleGuard, CyclePermit};
pub use orchestrator::{CycleReport, SourceReport, SyncOrchestrator};
pub use scheduler::{CycleKind, ScheduleConfig, SyncScheduler};

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// 把调度事件分发给编排器
///
/// 每个事件在独立任务中执行，重叠的触发由编排器的重入锁丢弃。
/// 所有发送端关闭后返回。
pub async fn dispatch_triggers(
    orchestrator: Arc<SyncOrchestrator>,
    mut event_rx: mpsc::UnboundedReceiver<CycleKind>,
) {
    while let Some(kind) = event_rx.recv().await {
        debug!("收到同步触发: {:?}", kind);
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            match kind {
                CycleKind::Full => {
                    orchestrator.run_full_cycle().await;
                }
                CycleKind::Mini => {
                    orchestrator.run_mini_cycle().await;
                }
            }
        });
    }
    debug!("同步触发通道已关闭");
}
