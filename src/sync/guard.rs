//! 同步轮次重入保护
//!
//! 同一时刻只允许一轮同步运行，重叠触发直接丢弃，不排队

use std::sync::atomic::{AtomicBool, Ordering};

/// 轮次锁
#[derive(Debug, Default)]
pub struct CycleGuard {
    running: AtomicBool,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试进入
    ///
    /// # 返回
    /// - `Some(CyclePermit)`: 成功进入，permit drop 时自动释放
    /// - `None`: 已有一轮在运行
    pub fn try_acquire(&self) -> Option<CyclePermit<'_>> {
        // compare_exchange 保证只有一个调用方能成功
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        Some(CyclePermit { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// 运行许可（RAII）
pub struct CyclePermit<'a> {
    guard: &'a CycleGuard,
}

impl Drop for CyclePermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_single_acquire() {
        let guard = CycleGuard::new();

        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_concurrent_acquire() {
        let guard = Arc::new(CycleGuard::new());
        let mut handles = vec![];

        // 10 个线程同时抢占，持有期间其余线程都应失败
        let barrier = Arc::new(std::sync::Barrier::new(10));
        for _ in 0..10 {
            let guard = guard.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                barrier.wait();
                let permit = guard.try_acquire();
                let acquired = permit.is_some();
                // 持有到所有线程都尝试过
                barrier.wait();
                acquired
            }));
        }

        let acquired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(acquired, 1);
    }
}
