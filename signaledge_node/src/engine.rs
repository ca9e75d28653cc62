//! Periodic update engine for the simulated probe.
//!
//! Each tick advances the device record under the store lock: a bounded
//! noise draw, fan-driven decay, the temperature floor, the derived alert
//! flag, and a history append, followed by fire-and-forget delivery to the
//! indicator and display sinks. The async wrapper re-arms on a fixed-rate
//! schedule measured from each tick's own deadline.

use crate::sink::{
    DisplaySink, IndicatorSignals, IndicatorSink, LogDisplaySink, LogIndicatorSink,
    clip_display_line,
};
use crate::state::NodeContext;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use signaledge::consts::TEMP_FLOOR;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, warn};

/// Source of the per-tick perturbation, in {-1, 0, +1}.
///
/// A seam so tests can script the draw.
pub trait NoiseSource: Send {
    /// Next perturbation value.
    fn sample(&mut self) -> i32;
}

/// Default noise source backed by an OS-seeded RNG.
pub struct EntropyNoise {
    rng: StdRng,
}

impl EntropyNoise {
    /// Seed from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for EntropyNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseSource for EntropyNoise {
    fn sample(&mut self) -> i32 {
        self.rng.gen_range(-1..=1)
    }
}

/// Background task advancing the device record on a fixed period.
pub struct UpdateEngine {
    ctx: Arc<NodeContext>,
    period: Duration,
    noise: Box<dyn NoiseSource>,
    indicators: Box<dyn IndicatorSink>,
    display: Box<dyn DisplaySink>,
}

impl UpdateEngine {
    /// Engine with the default noise source and log-backed sinks.
    pub fn new(ctx: Arc<NodeContext>, period: Duration) -> Self {
        Self {
            ctx,
            period,
            noise: Box::new(EntropyNoise::new()),
            indicators: Box::new(LogIndicatorSink),
            display: Box::new(LogDisplaySink),
        }
    }

    /// Replace the noise source.
    pub fn with_noise(mut self, noise: impl NoiseSource + 'static) -> Self {
        self.noise = Box::new(noise);
        self
    }

    /// Replace the sinks.
    pub fn with_sinks(
        mut self,
        indicators: impl IndicatorSink + 'static,
        display: impl DisplaySink + 'static,
    ) -> Self {
        self.indicators = Box::new(indicators);
        self.display = Box::new(display);
        self
    }

    /// Execute one tick.
    ///
    /// The record mutation and sink handoff happen under one lock
    /// acquisition, strictly serialized against the control surface and
    /// bulk read. Sink failures are logged and swallowed; the mutation is
    /// already complete and is not rolled back.
    pub fn tick(&mut self) {
        let noise = self.noise.sample();
        let mut inner = self.ctx.lock();

        let state = inner.backing.state_mut();
        state.temperature = state.temperature - state.fan_speed + noise;
        if state.temperature < TEMP_FLOOR {
            state.temperature = TEMP_FLOOR;
        }
        state.alert = (state.temperature > state.threshold) as i32;
        state.history.push(state.temperature);

        let alert = state.alert_active();
        let signals = IndicatorSignals {
            power: true,
            fault: alert,
            nominal_high: state.temperature == state.threshold,
            nominal_ok: !alert && state.temperature != state.threshold,
        };
        let line = format!(
            "Temp:{}C Fan:{} {}",
            state.temperature,
            state.fan_speed,
            if alert { "Alert" } else { "OK" }
        );
        debug!(
            temperature = state.temperature,
            fan_speed = state.fan_speed,
            alert,
            "tick"
        );

        if let Err(e) = self.indicators.set_indicators(signals) {
            warn!(error = %e, "indicator sink delivery failed");
        }
        if let Err(e) = self.display.show(clip_display_line(&line)) {
            warn!(error = %e, "display sink delivery failed");
        }

        drop(inner);
    }

    /// Run ticks until the task is dropped or aborted.
    ///
    /// `tokio::time::interval` fires relative to each tick's own deadline,
    /// so a slow tick does not shift the schedule; catch-up after a stall
    /// is the timer's concern, not the engine's.
    pub async fn run(mut self) {
        let mut ticker = interval(self.period);
        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use signaledge::config::NodeConfig;
    use signaledge::consts::HISTORY_LEN;

    /// Noise source replaying a fixed script, then zeros.
    pub struct ScriptedNoise {
        values: std::vec::IntoIter<i32>,
    }

    impl ScriptedNoise {
        pub fn new(values: Vec<i32>) -> Self {
            Self {
                values: values.into_iter(),
            }
        }

        pub fn silent() -> Self {
            Self::new(Vec::new())
        }
    }

    impl NoiseSource for ScriptedNoise {
        fn sample(&mut self) -> i32 {
            self.values.next().unwrap_or(0)
        }
    }

    struct FailingDisplay;

    impl DisplaySink for FailingDisplay {
        fn show(&mut self, _line: &str) -> Result<(), SinkError> {
            Err(SinkError::new("display unreachable"))
        }
    }

    fn make_engine(segment: &str, temp: i32, fan: i32, threshold: i32) -> UpdateEngine {
        let mut config = NodeConfig::default();
        config.segment = format!("{segment}_{}", std::process::id());
        config.initial_temperature = temp;
        config.initial_fan_speed = fan;
        config.initial_threshold = threshold;
        let ctx = Arc::new(NodeContext::create(&config).unwrap());
        UpdateEngine::new(ctx, Duration::from_millis(10)).with_noise(ScriptedNoise::silent())
    }

    #[test]
    fn zero_fan_zero_noise_holds_temperature() {
        let mut engine = make_engine("engine_hold", 25, 0, 30);
        engine.tick();
        engine.ctx.with_state(|state, _| {
            assert_eq!(state.temperature, 25);
            assert!(!state.alert_active());
        });
    }

    #[test]
    fn fan_decays_temperature() {
        let mut engine = make_engine("engine_decay", 25, 3, 30);
        engine.tick();
        engine.ctx.with_state(|state, _| {
            assert_eq!(state.temperature, 22);
        });
    }

    #[test]
    fn temperature_never_drops_below_floor() {
        let mut engine = make_engine("engine_floor", 22, 5, 30)
            .with_noise(ScriptedNoise::new(vec![-1; 32]));
        for _ in 0..32 {
            engine.tick();
            engine
                .ctx
                .with_state(|state, _| assert!(state.temperature >= TEMP_FLOOR));
        }
        engine
            .ctx
            .with_state(|state, _| assert_eq!(state.temperature, TEMP_FLOOR));
    }

    #[test]
    fn alert_tracks_threshold_on_every_tick() {
        let mut engine =
            make_engine("engine_alert", 25, 0, 24).with_noise(ScriptedNoise::new(vec![1, -1, -1]));
        for _ in 0..3 {
            engine.tick();
            engine.ctx.with_state(|state, _| {
                assert_eq!(state.alert_active(), state.temperature > state.threshold);
            });
        }
    }

    #[test]
    fn history_keeps_the_latest_samples_in_order() {
        let mut engine = make_engine("engine_history", 60, 1, 100);
        // 20 ticks, noise 0: temperature walks 59, 58, ... 40.
        for _ in 0..20 {
            engine.tick();
        }
        engine.ctx.with_state(|state, _| {
            let snap = state.history.snapshot();
            let expected: Vec<i32> = (0..HISTORY_LEN as i32).map(|i| 55 - i).collect();
            assert_eq!(&snap[..], &expected[..]);
        });
    }

    #[test]
    fn sink_failure_does_not_undo_the_tick() {
        let mut engine = make_engine("engine_sink", 25, 1, 30);
        engine.display = Box::new(FailingDisplay);
        engine.tick();
        engine.ctx.with_state(|state, _| {
            assert_eq!(state.temperature, 24);
            assert_eq!(state.history.snapshot()[HISTORY_LEN - 1], 24);
        });
    }
}
