//! Simulated providers for development and tests off-device.
//!
//! The simulated tracker synthesizes a slowly oscillating heart rate; the
//! simulated connection replays a scripted lifecycle. Neither touches any
//! device SDK.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{ConnectionEvent, HeartRateSample, TrackerEvent};
use crate::provider::{HealthConnectionProvider, HealthTrackerProvider};
use crate::Result;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Tuning for [`SimulatedTrackerProvider`].
#[derive(Debug, Clone)]
pub struct SimulatedTrackerConfig {
    /// Center of the synthesized heart-rate band, beats per minute.
    pub base_hr: i32,
    /// Peak deviation from `base_hr`, beats per minute.
    pub hr_swing: i32,
    /// Gap between synthesized readings, milliseconds.
    pub sample_interval_ms: u64,
    /// Inter-beat intervals attached to each reading.
    pub ibi_per_sample: usize,
    /// What `capabilities_available` reports.
    pub capabilities: bool,
}

impl Default for SimulatedTrackerConfig {
    fn default() -> Self {
        Self {
            base_hr: 72,
            hr_swing: 6,
            sample_interval_ms: 100,
            ibi_per_sample: 2,
            capabilities: true,
        }
    }
}

/// Tracker provider that synthesizes readings instead of talking to hardware.
pub struct SimulatedTrackerProvider {
    config: SimulatedTrackerConfig,
    running: Arc<AtomicBool>,
}

impl Default for SimulatedTrackerProvider {
    fn default() -> Self {
        Self::new(SimulatedTrackerConfig::default())
    }
}

impl SimulatedTrackerProvider {
    /// Provider with the given tuning.
    pub fn new(config: SimulatedTrackerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Provider that reports the heart-rate capability as missing.
    pub fn without_capabilities() -> Self {
        Self::new(SimulatedTrackerConfig {
            capabilities: false,
            ..SimulatedTrackerConfig::default()
        })
    }
}

fn synth_sample(config: &SimulatedTrackerConfig, sequence: u64) -> HeartRateSample {
    let time_factor = (sequence as f64) * 0.1;
    let swing = (config.hr_swing as f64) * time_factor.sin();
    let hr = config.base_hr + swing.round() as i32;
    let ibi = if hr > 0 {
        vec![60_000 / hr; config.ibi_per_sample]
    } else {
        Vec::new()
    };
    HeartRateSample::new(hr, ibi)
}

#[async_trait]
impl HealthTrackerProvider for SimulatedTrackerProvider {
    fn capabilities_available(&self) -> bool {
        self.config.capabilities
    }

    async fn start_session(&self) -> mpsc::Receiver<TrackerEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(config.sample_interval_ms));
            // A real sensor paces itself and never bursts stale samples.
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut sequence = 0u64;
            loop {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let sample = synth_sample(&config, sequence);
                sequence += 1;
                if tx.send(TrackerEvent::Data(sample)).await.is_err() {
                    // Receiver gone, session consumer was torn down.
                    break;
                }
            }
            tracing::debug!("Simulated tracker session finished");
        });
        rx
    }

    async fn stop_session(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Connection provider that replays a scripted lifecycle.
pub struct SimulatedConnectionProvider {
    script: Vec<ConnectionEvent>,
    event_gap_ms: u64,
}

impl SimulatedConnectionProvider {
    /// Provider that reports one successful connection.
    pub fn connecting() -> Self {
        Self::with_script(vec![ConnectionEvent::Success])
    }

    /// Provider that replays `script` in order, then closes the stream.
    pub fn with_script(script: Vec<ConnectionEvent>) -> Self {
        Self {
            script,
            event_gap_ms: 10,
        }
    }
}

#[async_trait]
impl HealthConnectionProvider for SimulatedConnectionProvider {
    async fn connect(&self) -> mpsc::Receiver<ConnectionEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let script = self.script.clone();
        let gap = Duration::from_millis(self.event_gap_ms);
        tokio::spawn(async move {
            for event in script {
                tokio::time::sleep(gap).await;
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
        rx
    }
}
