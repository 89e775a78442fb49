//! 软件 GPU
//!
//! 一个工作线程按提交顺序执行队列中的任务：执行命令列表（模拟耗时）、
//! 推进 Fence、呈现。CPU 线程和 GPU 线程之间只通过 mpsc 通道和 Fence 通信。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace};

use crate::core::error::{GraphicsError, Result};
use crate::gfx::soft::fence::SoftFence;
use crate::gfx::soft::validation::ValidationLayer;
use crate::gfx::backend::Fence;
use crate::renderer::sync::FenceValue;

/// 队列中的任务
#[derive(Debug)]
pub(crate) enum GpuJob {
    /// 执行一个命令列表
    Execute {
        submission: u64,
        commands: usize,
        draws: usize,
    },
    /// 前面的任务完成后推进 Fence
    Signal(FenceValue),
    /// 呈现后台缓冲区
    Present,
    /// 停止工作线程
    Shutdown,
}

/// GPU 执行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuStats {
    /// 执行过的命令列表
    pub command_lists: u64,
    /// 执行过的命令
    pub commands: u64,
    /// 绘制调用
    pub draw_calls: u64,
    /// signal 次数
    pub signals: u64,
    /// 呈现次数
    pub presents: u64,
}

#[derive(Debug, Default)]
pub(crate) struct GpuCounters {
    command_lists: AtomicU64,
    commands: AtomicU64,
    draw_calls: AtomicU64,
    signals: AtomicU64,
    presents: AtomicU64,
}

impl GpuCounters {
    pub(crate) fn snapshot(&self) -> GpuStats {
        GpuStats {
            command_lists: self.command_lists.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            draw_calls: self.draw_calls.load(Ordering::Relaxed),
            signals: self.signals.load(Ordering::Relaxed),
            presents: self.presents.load(Ordering::Relaxed),
        }
    }
}

/// 暂停开关
///
/// 暂停时工作线程在处理下一个任务前阻塞，用于让测试精确控制 GPU 进度。
#[derive(Debug, Default)]
pub(crate) struct SuspendGate {
    suspended: Mutex<bool>,
    condvar: Condvar,
}

impl SuspendGate {
    pub(crate) fn set(&self, suspended: bool) {
        let mut guard = match self.suspended.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = suspended;
        self.condvar.notify_all();
    }

    fn wait_until_resumed(&self) {
        let mut guard = match self.suspended.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while *guard {
            guard = match self.condvar.wait(guard) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

/// CPU 和 GPU 线程共享的状态
#[derive(Default)]
pub(crate) struct GpuShared {
    pub(crate) fence: Arc<SoftFence>,
    pub(crate) validation: ValidationLayer,
    pub(crate) counters: GpuCounters,
    pub(crate) gate: SuspendGate,
}

/// 启动 GPU 工作线程
pub(crate) fn spawn_worker(
    jobs: Receiver<GpuJob>,
    shared: Arc<GpuShared>,
    latency: Duration,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("soft-gpu".to_string())
        .spawn(move || run_worker(jobs, shared, latency))
        .map_err(|e| {
            GraphicsError::DeviceCreation(format!("Failed to spawn GPU thread: {}", e)).into()
        })
}

fn run_worker(jobs: Receiver<GpuJob>, shared: Arc<GpuShared>, latency: Duration) {
    debug!(latency_ms = latency.as_millis() as u64, "Software GPU started");

    // 发送端全部释放时 recv 返回错误，线程退出
    while let Ok(job) = jobs.recv() {
        if matches!(job, GpuJob::Shutdown) {
            break;
        }

        shared.gate.wait_until_resumed();

        // 设备移除后丢弃剩余任务
        if shared.fence.device_removed_reason().is_some() {
            continue;
        }

        match job {
            GpuJob::Execute {
                submission,
                commands,
                draws,
            } => {
                if !latency.is_zero() {
                    thread::sleep(latency);
                }
                let counters = &shared.counters;
                counters.command_lists.fetch_add(1, Ordering::Relaxed);
                counters.commands.fetch_add(commands as u64, Ordering::Relaxed);
                counters.draw_calls.fetch_add(draws as u64, Ordering::Relaxed);
                shared.validation.complete_submission(submission);
                trace!(submission, draws, "Command list executed");
            }
            GpuJob::Signal(value) => {
                shared.counters.signals.fetch_add(1, Ordering::Relaxed);
                shared.fence.complete(value);
                trace!(fence_value = value.value(), "Fence completed");
            }
            GpuJob::Present => {
                shared.counters.presents.fetch_add(1, Ordering::Relaxed);
            }
            GpuJob::Shutdown => break,
        }
    }

    debug!("Software GPU stopped");
}
