/// Something the countdown wants shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// Show this number
    Tick(u32),
    /// Show the check mark; the photo is taken now
    Check,
}

/// Fixed visual countdown, e.g. 2, 1, check
#[derive(Debug, Clone)]
pub struct Countdown {
    start: u32,
    tick_ms: u64,
    remaining: Option<u32>,
    carry_ms: u64,
}

impl Countdown {
    /// # Panics
    ///
    /// Panics if `start` or `tick_ms` is zero
    #[must_use]
    pub fn new(start: u32, tick_ms: u64) -> Self {
        assert!(start > 0, "Countdown must start above 0");
        assert!(tick_ms > 0, "Tick must be greater than 0");
        Self {
            start,
            tick_ms,
            remaining: None,
            carry_ms: 0,
        }
    }

    /// Start from the top and return the first value to show
    pub fn begin(&mut self) -> u32 {
        self.remaining = Some(self.start);
        self.carry_ms = 0;
        self.start
    }

    /// Let time pass. The check event is emitted once, after which the
    /// countdown is idle.
    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<CountdownEvent> {
        let mut events = Vec::new();
        let Some(mut remaining) = self.remaining else {
            return events;
        };

        self.carry_ms += elapsed_ms;
        while self.carry_ms >= self.tick_ms {
            self.carry_ms -= self.tick_ms;
            remaining -= 1;
            if remaining == 0 {
                events.push(CountdownEvent::Check);
                self.cancel();
                return events;
            }
            events.push(CountdownEvent::Tick(remaining));
        }
        self.remaining = Some(remaining);
        events
    }

    /// Stop without emitting anything
    pub fn cancel(&mut self) {
        self.remaining = None;
        self.carry_ms = 0;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.remaining.is_some()
    }

    /// Value currently shown, if running
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    #[must_use]
    pub fn start_value(&self) -> u32 {
        self.start
    }
}
