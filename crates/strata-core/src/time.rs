//! Tick clock for the Strata asset cache
//!
//! Turns raw frame deltas into fixed-length ticks measured in whole
//! milliseconds. Each tick is what the asset loaders age their roots by.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors produced by an invalid tick configuration
#[derive(Debug, Clone, thiserror::Error)]
pub enum TickError {
    #[error("Tick length must be at least 1 ms")]
    ZeroTick,

    #[error("Maximum delta ({max_delta_ms} ms) is shorter than one tick ({tick_ms} ms)")]
    MaxDeltaTooSmall { tick_ms: u64, max_delta_ms: u64 },

    #[error("Invalid time scale: {0}")]
    InvalidTimeScale(f32),
}

/// Configuration for the tick clock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Length of one fixed tick in milliseconds
    pub tick_ms: u64,
    /// Largest frame delta accepted in one advance, to avoid a spiral of death
    pub max_delta_ms: u64,
    /// How many clock milliseconds pass per real millisecond
    pub time_scale: f32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_ms: 16,
            max_delta_ms: 250,
            time_scale: 1.0,
        }
    }
}

impl TickConfig {
    /// Check that the configuration can drive a clock
    pub fn validate(&self) -> Result<(), TickError> {
        if self.tick_ms == 0 {
            return Err(TickError::ZeroTick);
        }
        if self.max_delta_ms < self.tick_ms {
            return Err(TickError::MaxDeltaTooSmall {
                tick_ms: self.tick_ms,
                max_delta_ms: self.max_delta_ms,
            });
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(TickError::InvalidTimeScale(self.time_scale));
        }
        Ok(())
    }
}

/// Fixed-step clock
#[derive(Debug, Clone)]
pub struct TickClock {
    config: TickConfig,
    /// Scaled time since the clock started, in milliseconds
    pub total_ms: u64,
    /// Scaled delta of the last advance, in milliseconds
    pub delta_ms: u64,
    /// Number of advances so far
    pub frame_count: u64,
    /// Whether the clock is paused
    pub paused: bool,
    /// Milliseconds not yet handed out as ticks
    accumulator_ms: u64,
    /// Sub-millisecond remainder carried between advances
    fraction: f64,
}

impl Default for TickClock {
    fn default() -> Self {
        Self {
            config: TickConfig::default(),
            total_ms: 0,
            delta_ms: 0,
            frame_count: 0,
            paused: false,
            accumulator_ms: 0,
            fraction: 0.0,
        }
    }
}

impl TickClock {
    /// Create a clock with a custom config
    pub fn new(config: TickConfig) -> Result<Self, TickError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    /// The clock configuration
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Length of one tick in milliseconds
    pub fn tick_ms(&self) -> u64 {
        self.config.tick_ms
    }

    /// Advance by a raw frame delta
    pub fn advance(&mut self, raw_delta: Duration) {
        let raw_ms = raw_delta.as_secs_f64() * 1000.0;
        self.advance_ms_f64(raw_ms);
    }

    /// Advance by a raw delta given in whole milliseconds
    pub fn advance_ms(&mut self, raw_ms: u64) {
        self.advance_ms_f64(raw_ms as f64);
    }

    fn advance_ms_f64(&mut self, raw_ms: f64) {
        self.frame_count += 1;

        if self.paused {
            self.delta_ms = 0;
            return;
        }

        let clamped = raw_ms.min(self.config.max_delta_ms as f64);
        let scaled = clamped * self.config.time_scale as f64 + self.fraction;
        let whole = scaled.floor();
        self.fraction = scaled - whole;

        self.delta_ms = whole as u64;
        self.total_ms += self.delta_ms;
        self.accumulator_ms += self.delta_ms;
    }

    /// Number of whole ticks to run this frame. Consumes them from the accumulator.
    pub fn fixed_steps(&mut self) -> u32 {
        let mut steps = 0;
        while self.accumulator_ms >= self.config.tick_ms {
            self.accumulator_ms -= self.config.tick_ms;
            steps += 1;
        }
        steps
    }

    /// Pause the clock
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume the clock
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Set the time scale (0.0 = frozen, 1.0 = normal, 2.0 = double speed)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.config.time_scale = scale.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_steps() {
        let mut clock = TickClock::default();
        clock.advance_ms(40);

        assert_eq!(clock.delta_ms, 40);
        assert_eq!(clock.fixed_steps(), 2);
        // 8 ms left over
        assert_eq!(clock.fixed_steps(), 0);

        clock.advance_ms(8);
        assert_eq!(clock.fixed_steps(), 1);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut clock = TickClock::default();
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.delta_ms, 250);
        assert_eq!(clock.total_ms, 250);
    }

    #[test]
    fn test_pause_freezes_time() {
        let mut clock = TickClock::default();
        clock.pause();
        clock.advance_ms(100);
        assert_eq!(clock.delta_ms, 0);
        assert_eq!(clock.frame_count, 1);
        assert_eq!(clock.fixed_steps(), 0);

        clock.resume();
        clock.advance_ms(16);
        assert_eq!(clock.fixed_steps(), 1);
    }

    #[test]
    fn test_fractional_deltas_accumulate() {
        let mut clock = TickClock::default();
        clock.set_time_scale(0.5);
        for _ in 0..4 {
            clock.advance_ms(5);
        }
        assert_eq!(clock.total_ms, 10);
    }

    #[test]
    fn test_time_scale() {
        let mut clock = TickClock::default();
        clock.set_time_scale(2.0);
        clock.advance_ms(16);
        assert_eq!(clock.delta_ms, 32);
        assert_eq!(clock.fixed_steps(), 2);
    }

    #[test]
    fn test_invalid_config() {
        let config = TickConfig {
            tick_ms: 0,
            ..Default::default()
        };
        assert!(matches!(TickClock::new(config), Err(TickError::ZeroTick)));

        let config = TickConfig {
            tick_ms: 100,
            max_delta_ms: 50,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TickError::MaxDeltaTooSmall { .. })
        ));
    }
}
