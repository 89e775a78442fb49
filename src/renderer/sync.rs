//! GPU 同步机制模块
//!
//! 提供 CPU-GPU 同步原语：单调递增的 Fence 值、可注册到 Fence 上的等待事件，
//! 以及维护全局 Fence 计数器的 `FenceManager`。
//!
//! # 使用场景
//!
//! 1. **帧同步**：复用帧资源前，等待 GPU 完成该资源上次提交的工作
//! 2. **队列刷新**：窗口尺寸变化或退出前等待所有已提交工作完成
//!
//! 主循环中唯一的阻塞点就是这里的 `wait_for_value`。

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::core::error::{DistRenderError, GraphicsError, Result};
use crate::gfx::backend::{CommandQueue, Fence, StatusCode};

/// 需要驱动的后端每次等待的最长时间片
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Fence 值
///
/// 用于CPU-GPU同步的单调递增值。
/// CPU可以等待GPU完成特定Fence值对应的工作。
/// 值 0 表示“从未提交过”。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FenceValue(u64);

impl FenceValue {
    /// 尚未提交任何工作
    pub const ZERO: FenceValue = FenceValue(0);

    /// 创建新的Fence值
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// 获取内部值
    pub fn value(&self) -> u64 {
        self.0
    }

    /// 递增Fence值
    pub fn increment(&mut self) {
        self.0 += 1;
    }

    /// 下一个Fence值
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// 是否从未被赋值
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Fence 完成事件
///
/// 自动复位的等待原语（对应 Win32 的 auto-reset event）。
/// 通过 [`Fence::set_event_on_completion`] 注册后，
/// GPU 侧的完成值到达目标值时事件被置位，唤醒一个等待者。
#[derive(Debug, Default)]
pub struct FenceEvent {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl FenceEvent {
    /// 创建未置位的事件
    pub fn new() -> Self {
        Self::default()
    }

    /// 置位事件
    pub fn set(&self) {
        let mut signaled = match self.signaled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *signaled = true;
        self.condvar.notify_one();
    }

    /// 等待事件被置位，返回 `false` 表示超时
    ///
    /// 成功返回时事件被自动复位。
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut signaled = match self.signaled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        while !*signaled {
            match deadline {
                None => {
                    signaled = match self.condvar.wait(signaled) {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    signaled = match self.condvar.wait_timeout(signaled, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    };
                }
            }
        }

        *signaled = false;
        true
    }
}

/// Fence 管理器
///
/// 持有后端 Fence 和 CPU 侧的共享计数器。
/// 每提交一帧，计数器加一并让队列 signal 到这个值；
/// 帧资源记录这个值，复用前等待 GPU 完成值追上它。
///
/// # 示例
///
/// ```ignore
/// let mut fences = FenceManager::new(device.fence(), None);
///
/// queue.execute_command_lists(&[&command_list])?;
/// let fence_value = fences.signal(device.queue())?;
///
/// // 之后复用资源前
/// fences.wait_for_value(fence_value)?;
/// ```
pub struct FenceManager {
    /// 后端 Fence（GPU 侧完成值）
    fence: Arc<dyn Fence>,
    /// 当前Fence值（CPU侧）
    current: FenceValue,
    /// 注册到 Fence 上的等待事件
    event: Arc<FenceEvent>,
    /// 等待超时，`None` 为无限等待
    timeout: Option<Duration>,
}

impl FenceManager {
    /// 创建新的Fence管理器
    pub fn new(fence: Arc<dyn Fence>, timeout: Option<Duration>) -> Self {
        Self {
            fence,
            current: FenceValue::ZERO,
            event: Arc::new(FenceEvent::new()),
            timeout,
        }
    }

    /// 获取当前Fence值（最后一次 signal 的值）
    pub fn current_value(&self) -> FenceValue {
        self.current
    }

    /// 获取已完成的Fence值
    pub fn completed_value(&self) -> FenceValue {
        self.fence.completed_value()
    }

    /// 检查特定Fence值是否已完成
    pub fn is_completed(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }

    /// 递增计数器并让队列 signal 到新值
    ///
    /// 返回新的 Fence 值，调用者将其记录到本帧使用的帧资源上。
    pub fn signal(&mut self, queue: &dyn CommandQueue) -> Result<FenceValue> {
        let value = self.current.next();
        queue.signal(value)?;
        self.current = value;
        trace!(fence_value = value.value(), "Fence signaled");
        Ok(value)
    }

    /// 等待特定Fence值完成
    ///
    /// 这是一个阻塞操作。值为 0 或已完成时立即返回。
    /// 超时或设备移除都视为致命错误，不做重试。
    pub fn wait_for_value(&self, value: FenceValue) -> Result<()> {
        if value.is_zero() || self.is_completed(value) {
            return Ok(());
        }

        debug!(
            fence_value = value.value(),
            completed = self.completed_value().value(),
            "Waiting for GPU"
        );

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let polling = self.fence.requires_polling();
        self.fence.set_event_on_completion(value, self.event.clone())?;

        loop {
            if polling {
                self.fence.poll()?;
            }

            if self.is_completed(value) {
                return Ok(());
            }
            if let Some(status) = self.fence.device_removed_reason() {
                return Err(GraphicsError::backend(
                    status,
                    format!("device removed while waiting for fence {}", value.value()),
                ).into());
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(self.timeout_error(value));
                    }
                    Some(remaining)
                }
                None => None,
            };

            // 需要驱动的后端按时间片等待，每片之间 poll 一次
            let slice = if polling {
                Some(remaining.map_or(POLL_INTERVAL, |r| r.min(POLL_INTERVAL)))
            } else {
                remaining
            };
            self.event.wait(slice);
        }
    }

    fn timeout_error(&self, value: FenceValue) -> DistRenderError {
        GraphicsError::FenceWait(format!(
            "timed out after {:?} waiting for fence {} (completed {}, status {})",
            self.timeout().unwrap_or_default(),
            value.value(),
            self.completed_value().value(),
            StatusCode::WAIT_TIMEOUT,
        )).into()
    }

    /// 刷新命令队列（等待所有工作完成）
    pub fn flush(&mut self, queue: &dyn CommandQueue) -> Result<()> {
        let value = self.signal(queue)?;
        self.wait_for_value(value)
    }

    /// 等待超时设置
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fence_value() {
        let mut fence = FenceValue::new(0);
        assert_eq!(fence.value(), 0);
        assert!(fence.is_zero());

        fence.increment();
        assert_eq!(fence.value(), 1);

        let next = fence.next();
        assert_eq!(next.value(), 2);
        assert_eq!(fence.value(), 1); // 原值不变
    }

    #[test]
    fn test_fence_ordering() {
        let f1 = FenceValue::new(1);
        let f2 = FenceValue::new(2);
        let f3 = FenceValue::new(1);

        assert!(f1 < f2);
        assert!(f2 > f1);
        assert_eq!(f1, f3);
        assert!(FenceValue::ZERO < f1);
    }

    #[test]
    fn test_event_times_out_when_not_set() {
        let event = FenceEvent::new();
        assert!(!event.wait(Some(Duration::from_millis(10))));
    }

    #[test]
    fn test_event_auto_resets() {
        let event = FenceEvent::new();
        event.set();
        assert!(event.wait(Some(Duration::from_millis(10))));
        assert!(!event.wait(Some(Duration::from_millis(10))));
    }

    #[test]
    fn test_event_wakes_waiter_from_other_thread() {
        let event = Arc::new(FenceEvent::new());
        let setter = event.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.set();
        });

        assert!(event.wait(None));
        handle.join().unwrap();
    }

    /// 只在被 poll 时推进完成值、从不置位事件的 Fence
    struct PolledFence {
        completed: Mutex<u64>,
        polls_per_step: u64,
        polls: Mutex<u64>,
    }

    impl PolledFence {
        fn new(polls_per_step: u64) -> Self {
            Self {
                completed: Mutex::new(0),
                polls_per_step,
                polls: Mutex::new(0),
            }
        }
    }

    impl Fence for PolledFence {
        fn completed_value(&self) -> FenceValue {
            FenceValue::new(*self.completed.lock().unwrap())
        }

        fn set_event_on_completion(&self, _value: FenceValue, _event: Arc<FenceEvent>) -> Result<()> {
            Ok(())
        }

        fn device_removed_reason(&self) -> Option<StatusCode> {
            None
        }

        fn requires_polling(&self) -> bool {
            true
        }

        fn poll(&self) -> Result<()> {
            let mut polls = self.polls.lock().unwrap();
            *polls += 1;
            if self.polls_per_step > 0 && *polls % self.polls_per_step == 0 {
                *self.completed.lock().unwrap() += 1;
            }
            Ok(())
        }
    }

    #[test]
    fn test_wait_drives_polled_fence_to_completion() {
        let fence = Arc::new(PolledFence::new(3));
        let manager = FenceManager::new(fence.clone(), None);

        manager.wait_for_value(FenceValue::new(2)).unwrap();
        assert!(manager.is_completed(FenceValue::new(2)));
        assert!(*fence.polls.lock().unwrap() >= 6);
    }

    #[test]
    fn test_polled_fence_honours_timeout() {
        let fence = Arc::new(PolledFence::new(0));
        let manager = FenceManager::new(fence.clone(), Some(Duration::from_millis(20)));

        let start = Instant::now();
        let err = manager.wait_for_value(FenceValue::new(1)).unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(err.to_string().contains("0x00000102"));
        assert!(*fence.polls.lock().unwrap() > 1);
    }
}
