/// Converts elapsed wall time into whole fixed-size steps
#[derive(Debug, Clone)]
pub struct StepClock {
    step_ms: u64,
    carry_ms: u64,
}

impl StepClock {
    /// # Panics
    ///
    /// Panics if `step_ms` is zero
    #[must_use]
    pub fn new(step_ms: u64) -> Self {
        assert!(step_ms > 0, "Step must be greater than 0");
        Self { step_ms, carry_ms: 0 }
    }

    /// Add elapsed time and return how many full steps completed
    pub fn advance(&mut self, elapsed_ms: u64) -> u64 {
        self.carry_ms += elapsed_ms;
        let steps = self.carry_ms / self.step_ms;
        self.carry_ms %= self.step_ms;
        steps
    }

    pub fn reset(&mut self) {
        self.carry_ms = 0;
    }

    #[must_use]
    pub fn step_ms(&self) -> u64 {
        self.step_ms
    }
}

/// Accumulates continuous "valid" time and fires once when it reaches the
/// required duration. Any invalid step drops the accumulation to zero.
#[derive(Debug, Clone)]
pub struct StabilityTimer {
    step_ms: u64,
    required_ms: u64,
    accumulated_ms: u64,
    fired: bool,
}

impl StabilityTimer {
    #[must_use]
    pub fn new(step_ms: u64, required_ms: u64) -> Self {
        Self {
            step_ms,
            required_ms,
            accumulated_ms: 0,
            fired: false,
        }
    }

    /// Feed one step of the validity signal. Returns `true` exactly once per
    /// arming, on the step that completes the required duration.
    pub fn tick(&mut self, valid: bool) -> bool {
        if self.fired {
            return false;
        }
        if !valid {
            self.accumulated_ms = 0;
            return false;
        }
        self.accumulated_ms = (self.accumulated_ms + self.step_ms).min(self.required_ms);
        if self.accumulated_ms >= self.required_ms {
            self.fired = true;
            return true;
        }
        false
    }

    /// Zero the accumulation and re-arm
    pub fn reset(&mut self) {
        self.accumulated_ms = 0;
        self.fired = false;
    }

    #[must_use]
    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Share of the required time reached, in [0, 1]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.required_ms == 0 {
            return 1.0;
        }
        self.accumulated_ms as f64 / self.required_ms as f64
    }
}
