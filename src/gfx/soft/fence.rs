//! 软件 Fence
//!
//! GPU 工作线程在执行到 signal 时推进完成值，并置位所有目标值已到达的事件。

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::core::error::{GraphicsError, Result};
use crate::gfx::backend::{Fence, StatusCode};
use crate::renderer::sync::{FenceEvent, FenceValue};

#[derive(Default)]
struct FenceState {
    completed: FenceValue,
    waiters: Vec<(FenceValue, Arc<FenceEvent>)>,
    removed: Option<StatusCode>,
}

/// 软件后端的 Fence
#[derive(Default)]
pub struct SoftFence {
    state: Mutex<FenceState>,
}

impl SoftFence {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FenceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// GPU 执行到 signal：完成值推进到 `value`
    pub(crate) fn complete(&self, value: FenceValue) {
        let mut state = self.lock();
        if state.removed.is_some() {
            return;
        }
        if value < state.completed {
            warn!(
                completed = state.completed.value(),
                signaled = value.value(),
                "Fence signaled with a smaller value"
            );
            return;
        }
        state.completed = value;

        state.waiters.retain(|(target, event)| {
            if *target <= value {
                event.set();
                false
            } else {
                true
            }
        });
    }

    /// 模拟设备移除：完成值不再前进，唤醒所有等待者
    pub(crate) fn remove_device(&self, status: StatusCode) {
        let mut state = self.lock();
        if state.removed.is_some() {
            return;
        }
        debug!(status = %status, waiters = state.waiters.len(), "Device removed");
        state.removed = Some(status);
        for (_, event) in state.waiters.drain(..) {
            event.set();
        }
    }
}

impl Fence for SoftFence {
    fn completed_value(&self) -> FenceValue {
        self.lock().completed
    }

    fn set_event_on_completion(&self, value: FenceValue, event: Arc<FenceEvent>) -> Result<()> {
        let mut state = self.lock();
        if let Some(status) = state.removed {
            return Err(GraphicsError::backend(status, "set event on completion").into());
        }
        if state.completed >= value {
            event.set();
        } else {
            state.waiters.push((value, event));
        }
        Ok(())
    }

    fn device_removed_reason(&self) -> Option<StatusCode> {
        self.lock().removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_event_fires_when_value_reached() {
        let fence = SoftFence::new();
        let event = Arc::new(FenceEvent::new());

        fence.set_event_on_completion(FenceValue::new(2), event.clone()).unwrap();
        fence.complete(FenceValue::new(1));
        assert!(!event.wait(Some(Duration::from_millis(5))));

        fence.complete(FenceValue::new(2));
        assert!(event.wait(Some(Duration::from_millis(5))));
        assert_eq!(fence.completed_value(), FenceValue::new(2));
    }

    #[test]
    fn test_already_completed_sets_immediately() {
        let fence = SoftFence::new();
        fence.complete(FenceValue::new(5));

        let event = Arc::new(FenceEvent::new());
        fence.set_event_on_completion(FenceValue::new(3), event.clone()).unwrap();
        assert!(event.wait(Some(Duration::from_millis(5))));
    }

    #[test]
    fn test_completed_value_never_decreases() {
        let fence = SoftFence::new();
        fence.complete(FenceValue::new(4));
        fence.complete(FenceValue::new(2));
        assert_eq!(fence.completed_value(), FenceValue::new(4));
    }

    #[test]
    fn test_device_removed_wakes_waiters() {
        let fence = SoftFence::new();
        let event = Arc::new(FenceEvent::new());
        fence.set_event_on_completion(FenceValue::new(1), event.clone()).unwrap();

        fence.remove_device(StatusCode::DXGI_ERROR_DEVICE_REMOVED);
        assert!(event.wait(Some(Duration::from_millis(5))));
        assert_eq!(fence.device_removed_reason(), Some(StatusCode::DXGI_ERROR_DEVICE_REMOVED));

        // 移除后完成值不再前进
        fence.complete(FenceValue::new(1));
        assert_eq!(fence.completed_value(), FenceValue::ZERO);

        let err = fence
            .set_event_on_completion(FenceValue::new(2), event)
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::DXGI_ERROR_DEVICE_REMOVED));
    }
}
