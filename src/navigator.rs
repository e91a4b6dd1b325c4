/// Cursor into a video's frame index space.
///
/// Every move saturates at `0` and `total - 1`; there is no wraparound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameNavigator {
    index: u64,
    total: u64,
    step: u64,
    beta: u64,
}

impl FrameNavigator {
    pub const DEFAULT_STEP: u64 = 60;
    pub const DEFAULT_BETA: u64 = 5;

    /// `total` must be non-zero; a video without frames never gets a session.
    pub fn new(total: u64, step: u64, beta: u64) -> Self {
        Self {
            index: 0,
            total: total.max(1),
            step,
            beta: beta.max(1),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn last(&self) -> u64 {
        self.total - 1
    }

    pub fn coarse_step(&self) -> u64 {
        self.step
    }

    /// Secondary step, `step / beta` rounded down.
    pub fn fine_step(&self) -> u64 {
        self.step / self.beta
    }

    pub fn forward(&mut self, n: u64) -> u64 {
        self.index = self.index.saturating_add(n).min(self.last());
        self.index
    }

    pub fn backward(&mut self, n: u64) -> u64 {
        self.index = self.index.saturating_sub(n);
        self.index
    }

    pub fn step_forward(&mut self) -> u64 {
        self.forward(self.coarse_step())
    }

    pub fn step_backward(&mut self) -> u64 {
        self.backward(self.coarse_step())
    }

    pub fn step_forward_fine(&mut self) -> u64 {
        self.forward(self.fine_step())
    }

    pub fn step_backward_fine(&mut self) -> u64 {
        self.backward(self.fine_step())
    }

    pub fn seek(&mut self, index: u64) -> u64 {
        self.index = index.min(self.last());
        self.index
    }

    pub fn at_end(&self) -> bool {
        self.index == self.last()
    }

    /// Position as a percentage of the frame count, as shown in the window title.
    pub fn percent(&self) -> f64 {
        self.index as f64 / self.total as f64 * 100.0
    }
}
