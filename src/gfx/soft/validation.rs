//! 软件后端的验证层
//!
//! 跟踪已提交但尚未被 GPU 执行完的命令列表，检查两类错误用法：
//!
//! - CPU 写入了仍被在途命令列表引用的缓冲区区域（数据竞争）
//! - 命令分配器在其命令执行完之前被 reset
//!
//! 前者默认只计数并输出警告，严格模式下返回错误；后者总是返回错误。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::core::error::{GraphicsError, Result};
use crate::gfx::backend::{AllocatorId, BufferId, StatusCode};
use crate::renderer::command::{BufferView, CommandList};

/// 一次在途的命令列表提交
#[derive(Debug)]
struct InFlightSubmission {
    id: u64,
    allocator: Option<AllocatorId>,
    views: Vec<BufferView>,
}

/// 在途提交跟踪器
#[derive(Debug, Default)]
pub struct ValidationLayer {
    strict: bool,
    next_submission: AtomicU64,
    in_flight: Mutex<Vec<InFlightSubmission>>,
    hazards: AtomicU64,
}

impl ValidationLayer {
    /// 创建验证层
    ///
    /// # 参数
    ///
    /// * `strict` - 写入冲突时是否返回错误
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<InFlightSubmission>> {
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 记录一次提交，返回提交编号
    pub fn begin_submission(&self, list: &CommandList) -> u64 {
        let id = self.next_submission.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock().push(InFlightSubmission {
            id,
            allocator: list.allocator(),
            views: list.referenced_views().collect(),
        });
        id
    }

    /// GPU 执行完一次提交
    pub fn complete_submission(&self, id: u64) {
        self.lock().retain(|submission| submission.id != id);
    }

    /// 检查 CPU 写入是否与在途命令冲突
    pub fn check_write(&self, buffer: BufferId, offset: u64, size: u64, name: &str) -> Result<()> {
        let conflict = self
            .lock()
            .iter()
            .find(|s| s.views.iter().any(|v| v.overlaps(buffer, offset, size)))
            .map(|s| s.id);

        let Some(submission) = conflict else {
            return Ok(());
        };

        let total = self.hazards.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            buffer = name,
            offset,
            size,
            submission,
            hazards = total,
            "CPU write overlaps memory still in use by the GPU"
        );

        if self.strict {
            return Err(GraphicsError::backend(
                StatusCode::E_FAIL,
                format!(
                    "write to '{}' [{}..{}) while submission {} is in flight",
                    name,
                    offset,
                    offset + size,
                    submission
                ),
            ).into());
        }
        Ok(())
    }

    /// 检查分配器能否 reset
    pub fn check_allocator_reset(&self, allocator: AllocatorId) -> Result<()> {
        let pending = self
            .lock()
            .iter()
            .filter(|s| s.allocator == Some(allocator))
            .count();

        if pending > 0 {
            return Err(GraphicsError::backend(
                StatusCode::E_FAIL,
                format!(
                    "command allocator {} reset with {} submission(s) in flight",
                    allocator.0, pending
                ),
            ).into());
        }
        Ok(())
    }

    /// 检测到的写入冲突次数
    pub fn hazard_count(&self) -> u64 {
        self.hazards.load(Ordering::Relaxed)
    }

    /// 在途提交数量
    pub fn in_flight_count(&self) -> usize {
        self.lock().len()
    }
}
