/// Fixed-step frame clock.
///
/// Frame deltas are accumulated and released as whole simulation steps so
/// unit timers advance identically regardless of display rate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    step: f32,
    accumulator: f32,
    elapsed: f64,
    frame: u64,
}

impl FrameClock {
    /// Most steps released by one frame; the rest of a long stall is dropped.
    pub const MAX_STEPS: u32 = 10;

    pub fn new(step: f32) -> Self {
        Self {
            step,
            accumulator: 0.0,
            elapsed: 0.0,
            frame: 0,
        }
    }

    /// Feed one frame's delta. Returns how many fixed steps to simulate.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.frame += 1;
        self.accumulator = (self.accumulator + frame_dt.max(0.0)).min(self.step * Self::MAX_STEPS as f32);
        let steps = (self.accumulator / self.step) as u32;
        self.accumulator -= steps as f32 * self.step;
        self.elapsed += steps as f64 * self.step as f64;
        steps
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Simulated seconds since creation.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of frames fed to [`advance`](Self::advance).
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Fraction of a step left in the accumulator (0.0 to 1.0).
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step
    }
}
