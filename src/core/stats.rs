//! 帧率统计模块
//!
//! FrameStats 以计时器的累计时间为准，每满一秒计算一次帧率和帧时间。
//! 暂停期间累计时间不增长，所以暂停不会拉低帧率。

use tracing::info;

/// 帧率统计
#[derive(Debug, Default)]
pub struct FrameStats {
    frame_count: u32,
    time_elapsed: f32,
    fps: f32,
    frame_time_ms: f32,
    samples: u64,
}

impl FrameStats {
    /// 创建新的帧率统计
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧
    ///
    /// # 参数
    ///
    /// * `total_time` - 计时器的累计时间（秒）
    ///
    /// # 返回值
    ///
    /// 本次调用产生了新的统计结果时返回 `true`
    pub fn record_frame(&mut self, total_time: f32) -> bool {
        self.frame_count += 1;

        // 每秒更新一次 FPS
        let elapsed = total_time - self.time_elapsed;
        if elapsed < 1.0 {
            return false;
        }

        self.fps = self.frame_count as f32 / elapsed;
        self.frame_time_ms = 1000.0 / self.fps;
        self.frame_count = 0;
        self.time_elapsed = total_time;
        self.samples += 1;

        info!(fps = self.fps, mspf = self.frame_time_ms, "Frame stats");
        true
    }

    /// 获取当前 FPS
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// 获取当前帧时间（毫秒）
    pub fn frame_time_ms(&self) -> f32 {
        self.frame_time_ms
    }

    /// 已产生的统计次数
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// 窗口标题格式的统计文本
    pub fn caption(&self, title: &str) -> String {
        format!("{}    fps: {:.0}   mspf: {:.3}", title, self.fps, self.frame_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_computed_once_per_second() {
        let mut stats = FrameStats::new();
        for i in 1..60 {
            assert!(!stats.record_frame(i as f32 / 60.0));
        }
        assert!(stats.record_frame(1.0));
        assert!((stats.fps() - 60.0).abs() < 1e-3);
        assert!((stats.frame_time_ms() - 16.666).abs() < 1e-2);
        assert_eq!(stats.samples(), 1);

        // 下一秒内不再更新
        assert!(!stats.record_frame(1.5));
    }

    #[test]
    fn test_caption() {
        let mut stats = FrameStats::new();
        for i in 1..=30 {
            stats.record_frame(i as f32 / 30.0);
        }
        assert_eq!(stats.caption("Shapes"), "Shapes    fps: 30   mspf: 33.333");
    }
}
