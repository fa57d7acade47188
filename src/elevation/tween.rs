/// Temporal blend between the previous and the current elevation dataset.
///
/// A transition is armed when a request goes out and only starts advancing once the new
/// data is in place, so the blend never runs ahead of the download.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    progress: f32,
    duration: f32,
    running: bool,
}

impl Tween {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            progress: 1.0,
            duration: duration_secs.max(0.0),
            running: false,
        }
    }

    /// Resets progress for a new request
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.running = false;
    }

    /// New data arrived; from now on `advance` moves the blend forward
    pub fn start(&mut self) {
        if self.duration <= f32::EPSILON {
            self.finish();
        } else {
            self.running = true;
        }
    }

    pub fn finish(&mut self) {
        self.progress = 1.0;
        self.running = false;
    }

    /// Advances by `dt` seconds. Returns `true` on the step that completes the blend.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        self.progress = (self.progress + dt.max(0.0) / self.duration).min(1.0);
        if self.progress >= 1.0 {
            self.running = false;
            return true;
        }
        false
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Linear blend from `previous` toward `current`
    pub fn blend(&self, previous: f32, current: f32) -> f32 {
        previous + (current - previous) * self.progress
    }
}

impl Default for Tween {
    fn default() -> Self {
        Self::new(0.5)
    }
}
