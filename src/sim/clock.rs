/// Fixed-rate tick driver.
///
/// Real elapsed time goes into an accumulator; whole ticks come out. At most
/// `max_catch_up` ticks are released per call. If more time than that has
/// piled up (window dragged, process suspended) the excess is dropped
/// instead of replayed in a burst.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct SimulationClock {
    tick_len: Duration,
    accumulator: Duration,
    max_catch_up: u32,
}

impl SimulationClock {
    pub fn new(tick_rate_hz: u32, max_catch_up: u32) -> Self {
        let hz = tick_rate_hz.max(1);
        SimulationClock {
            tick_len: Duration::from_secs(1) / hz,
            accumulator: Duration::ZERO,
            max_catch_up: max_catch_up.max(1),
        }
    }

    pub fn tick_len(&self) -> Duration {
        self.tick_len
    }

    /// Add `elapsed` and return how many ticks to run now.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;
        let mut ticks = 0;
        while self.accumulator >= self.tick_len && ticks < self.max_catch_up {
            self.accumulator -= self.tick_len;
            ticks += 1;
        }
        if self.accumulator >= self.tick_len {
            let behind = (self.accumulator.as_nanos() / self.tick_len.as_nanos()) as u64;
            log::debug!("clock fell behind, dropping {behind} ticks");
            self.accumulator = Duration::from_nanos((self.accumulator.as_nanos() % self.tick_len.as_nanos()) as u64);
        }
        ticks
    }

    /// Forget pending time (after a pause or a phase change).
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_ticks_come_out_remainder_stays() {
        let mut c = SimulationClock::new(60, 5);
        let tick = c.tick_len();
        assert_eq!(c.advance(tick * 2 + tick / 2), 2);
        assert_eq!(c.advance(tick / 2), 1);
        assert_eq!(c.advance(Duration::ZERO), 0);
    }

    #[test]
    fn short_frames_accumulate() {
        let mut c = SimulationClock::new(50, 5);
        // 20ms tick, 5ms frames
        let mut total = 0;
        for _ in 0..8 {
            total += c.advance(Duration::from_millis(5));
        }
        assert_eq!(total, 2);
    }

    #[test]
    fn catch_up_is_capped_and_excess_dropped() {
        let mut c = SimulationClock::new(60, 5);
        assert_eq!(c.advance(Duration::from_secs(1)), 5);
        assert_eq!(c.advance(Duration::ZERO), 0, "backlog beyond the cap was kept");
    }

    #[test]
    fn reset_discards_partial_tick() {
        let mut c = SimulationClock::new(10, 3);
        c.advance(Duration::from_millis(90));
        c.reset();
        assert_eq!(c.advance(Duration::from_millis(20)), 0);
    }
}
