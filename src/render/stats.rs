//! Per-frame render counters and a rolling window over recent frames.

/// Counters collected while rendering one frame.
///
/// The draw and state-change counters are accumulated by render passes; the
/// resource totals are filled in by [`RenderContext::end_frame`](crate::render::RenderContext::end_frame).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub shader_changes: u32,
    pub material_changes: u32,
    pub mesh_changes: u32,
    pub mesh_bytes: u64,
    pub texture_bytes: u64,
    pub mesh_count: u32,
    pub texture_count: u32,
}

impl RenderStats {
    pub fn state_changes(&self) -> u32 {
        self.shader_changes + self.material_changes + self.mesh_changes
    }
}

/// Quantity tracked across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Milliseconds
    FrameTime,
    DrawCalls,
    StateChanges,
    MeshBytes,
    TextureBytes,
}

#[derive(Debug, Clone, Copy, Default)]
struct FrameSample {
    stats: RenderStats,
    delta_ms: f32,
}

impl FrameSample {
    fn value(&self, metric: Metric) -> f32 {
        match metric {
            Metric::FrameTime => self.delta_ms,
            Metric::DrawCalls => self.stats.draw_calls as f32,
            Metric::StateChanges => self.stats.state_changes() as f32,
            Metric::MeshBytes => self.stats.mesh_bytes as f32,
            Metric::TextureBytes => self.stats.texture_bytes as f32,
        }
    }
}

/// Fixed-capacity ring buffer of frame samples.
#[derive(Debug, Clone)]
pub struct FrameStatistics {
    samples: Vec<FrameSample>,
    next: usize,
    written: u64,
}

impl FrameStatistics {
    /// Window of `capacity` frames. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![FrameSample::default(); capacity.max(1)],
            next: 0,
            written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of valid samples, at most the capacity.
    pub fn len(&self) -> usize {
        (self.written as usize).min(self.samples.len())
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Total number of frames ever pushed.
    pub fn frames_written(&self) -> u64 {
        self.written
    }

    /// Record a frame, overwriting the oldest sample once full.
    pub fn push(&mut self, stats: RenderStats, delta_ms: f32) {
        self.samples[self.next] = FrameSample { stats, delta_ms };
        self.next = (self.next + 1) % self.samples.len();
        self.written += 1;
    }

    pub fn latest(&self) -> Option<RenderStats> {
        if self.is_empty() {
            return None;
        }
        let index = (self.next + self.samples.len() - 1) % self.samples.len();
        Some(self.samples[index].stats)
    }

    /// Mean over the valid samples, 0 when empty.
    pub fn average(&self, metric: Metric) -> f32 {
        let len = self.len();
        if len == 0 {
            return 0.0;
        }
        self.valid().map(|s| s.value(metric)).sum::<f32>() / len as f32
    }

    /// Maximum over the valid samples, 0 when empty.
    pub fn max(&self, metric: Metric) -> f32 {
        self.valid().map(|s| s.value(metric)).fold(0.0, f32::max)
    }

    /// Valid samples from oldest to newest.
    pub fn series(&self, metric: Metric) -> Vec<f32> {
        let len = self.len();
        let start = (self.next + self.samples.len() - len) % self.samples.len();
        (0..len)
            .map(|i| self.samples[(start + i) % self.samples.len()].value(metric))
            .collect()
    }

    fn valid(&self) -> impl Iterator<Item = &FrameSample> {
        self.samples.iter().take(self.len())
    }
}

impl Default for FrameStatistics {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn draws(draw_calls: u32) -> RenderStats {
        RenderStats {
            draw_calls,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_window() {
        let stats = FrameStatistics::new(4);
        assert!(stats.is_empty());
        assert_eq!(stats.average(Metric::DrawCalls), 0.0);
        assert_eq!(stats.max(Metric::FrameTime), 0.0);
        assert!(stats.series(Metric::DrawCalls).is_empty());
        assert!(stats.latest().is_none());
    }

    #[test]
    fn test_average_covers_only_written_frames() {
        let mut stats = FrameStatistics::new(60);
        stats.push(draws(10), 16.0);
        stats.push(draws(20), 17.0);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats.average(Metric::DrawCalls), 15.0);
        assert_eq!(stats.max(Metric::FrameTime), 17.0);
    }

    #[test]
    fn test_wraps_and_overwrites_oldest() {
        let mut stats = FrameStatistics::new(3);
        for i in 1..=5 {
            stats.push(draws(i), i as f32);
        }
        assert_eq!(stats.len(), 3);
        assert_eq!(stats.frames_written(), 5);
        assert_eq!(stats.series(Metric::DrawCalls), vec![3.0, 4.0, 5.0]);
        assert_eq!(stats.average(Metric::FrameTime), 4.0);
        assert_eq!(stats.latest(), Some(draws(5)));
    }

    #[rstest]
    #[case(Metric::DrawCalls, 3.0)]
    #[case(Metric::StateChanges, 6.0)]
    #[case(Metric::MeshBytes, 1024.0)]
    #[case(Metric::TextureBytes, 4096.0)]
    #[case(Metric::FrameTime, 12.5)]
    fn test_metric_values(#[case] metric: Metric, #[case] expected: f32) {
        let mut stats = FrameStatistics::new(2);
        stats.push(
            RenderStats {
                draw_calls: 3,
                shader_changes: 1,
                material_changes: 2,
                mesh_changes: 3,
                mesh_bytes: 1024,
                texture_bytes: 4096,
                ..Default::default()
            },
            12.5,
        );
        assert_eq!(stats.max(metric), expected);
    }
}
