//! 批量下载进度里程碑

/// 十分位里程碑跟踪器
///
/// 完成数每跨过一个尚未打印的 10% 档位返回一次当前百分比。
/// 返回值严格递增，每个档位最多被跨过一次，与完成顺序无关。
#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    total: usize,
    completed: usize,
    /// 下一个待打印的档位（10, 20, ... 100）
    next_milestone: u32,
}

impl MilestoneTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            next_milestone: 10,
        }
    }

    /// 记录一个已结束的条目
    ///
    /// # 返回
    /// - `Some(percent)`: 本次跨过了新的档位
    /// - `None`: 未跨过新档位
    pub fn record(&mut self) -> Option<u32> {
        if self.total == 0 || self.completed >= self.total {
            return None;
        }
        self.completed += 1;

        let percent = (self.completed * 100 / self.total) as u32;
        if percent >= self.next_milestone {
            // 一次跨过多个档位时全部标记为已打印
            self.next_milestone = (percent / 10 + 1) * 10;
            Some(percent)
        } else {
            None
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
