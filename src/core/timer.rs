//! 计时器模块
//!
//! 游戏循环使用的计时器：每帧 `tick` 得到帧间隔，`total_time` 得到
//! 不含暂停时间的累计运行时间。
//!
//! # 状态
//!
//! ```text
//! Reset ──start/tick──> Running <──start / stop──> Stopped
//! ```
//!
//! 计时器对时钟泛型，测试中使用 [`ManualClock`] 精确控制时间。

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// 单调时钟
pub trait Clock {
    /// 当前时刻
    fn now(&self) -> Instant;
}

/// 系统单调时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 手动推进的时钟
///
/// 克隆出的句柄共享同一个时间，可以一份交给计时器，一份留在测试中推进。
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// 时间前进 `duration`
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = match self.elapsed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *elapsed += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = match self.elapsed.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        self.origin + elapsed
    }
}

/// 计时器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// 刚 reset，还没有 tick
    Reset,
    /// 正在计时
    Running,
    /// 已暂停
    Stopped,
}

/// 帧计时器
pub struct Timer<C: Clock = SystemClock> {
    clock: C,
    base_time: Instant,
    prev_time: Instant,
    curr_time: Instant,
    stop_time: Option<Instant>,
    paused_time: Duration,
    delta_time: Duration,
    ticked: bool,
}

impl Timer<SystemClock> {
    /// 使用系统时钟创建计时器
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Timer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Timer<C> {
    /// 使用指定时钟创建计时器，初始为 Reset 状态
    pub fn with_clock(clock: C) -> Self {
        let now = clock.now();
        Self {
            clock,
            base_time: now,
            prev_time: now,
            curr_time: now,
            stop_time: None,
            paused_time: Duration::ZERO,
            delta_time: Duration::ZERO,
            ticked: false,
        }
    }

    /// 在消息循环开始前调用
    ///
    /// 以当前时刻为起点，清除暂停状态和累计的暂停时间。
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.base_time = now;
        self.prev_time = now;
        self.curr_time = now;
        self.stop_time = None;
        self.paused_time = Duration::ZERO;
        self.delta_time = Duration::ZERO;
        self.ticked = false;
    }

    /// 从暂停恢复（未暂停时无效果）
    pub fn start(&mut self) {
        if let Some(stop_time) = self.stop_time.take() {
            let start_time = self.clock.now();
            self.paused_time += start_time.saturating_duration_since(stop_time);
            self.prev_time = start_time;
        }
    }

    /// 暂停（已暂停时无效果）
    pub fn stop(&mut self) {
        if self.stop_time.is_none() {
            self.stop_time = Some(self.clock.now());
        }
    }

    /// 每帧调用一次
    pub fn tick(&mut self) {
        if self.stop_time.is_some() {
            self.delta_time = Duration::ZERO;
            return;
        }

        self.curr_time = self.clock.now();
        debug_assert!(self.curr_time >= self.prev_time, "clock went backwards");
        self.delta_time = self.curr_time.saturating_duration_since(self.prev_time);
        self.prev_time = self.curr_time;
        self.ticked = true;
    }

    /// 不含暂停时间的累计时间（秒）
    pub fn total_time(&self) -> f32 {
        let reference = self.stop_time.unwrap_or(self.curr_time);
        reference
            .saturating_duration_since(self.base_time)
            .saturating_sub(self.paused_time)
            .as_secs_f32()
    }

    /// 最近一次 tick 的帧间隔（秒）
    pub fn delta_time(&self) -> f32 {
        self.delta_time.as_secs_f32()
    }

    /// 当前状态
    pub fn state(&self) -> TimerState {
        if self.stop_time.is_some() {
            TimerState::Stopped
        } else if self.ticked {
            TimerState::Running
        } else {
            TimerState::Reset
        }
    }
}
