use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::display::BlockWeights;
use crate::engine::Timings;
use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub target_pulses: u32,
    pub pulse_interval_secs: f64,
    pub timings: Timings,
    pub weights: BlockWeights,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_pulses: 400,
            pulse_interval_secs: 1.5,
            timings: Timings::default(),
            weights: BlockWeights::default(),
        }
    }
}

fn positive_secs(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { name, value })
    }
}

fn nonzero(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroCount(name))
    } else {
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_pulses == 0 {
            return Err(ConfigError::ZeroTargetPulses);
        }
        if !(self.pulse_interval_secs.is_finite() && self.pulse_interval_secs > 0.0) {
            return Err(ConfigError::InvalidPulseInterval(self.pulse_interval_secs));
        }

        let t = &self.timings;
        positive_secs("countdown", t.countdown_secs)?;
        positive_secs("warm-up A hold", t.warmup_a_hold_secs)?;
        positive_secs("warm-up A rest", t.warmup_a_rest_secs)?;
        positive_secs("warm-up B hold", t.warmup_b_hold_secs)?;
        positive_secs("warm-up B rest", t.warmup_b_rest_secs)?;
        positive_secs("break", t.break_secs)?;
        nonzero("warm-up A reps", t.warmup_a_reps.into())?;
        nonzero("warm-up B reps", t.warmup_b_reps.into())?;
        nonzero("rest batch size", t.pulses_per_rest.into())?;
        nonzero("tick", t.tick_ms)?;

        let shortest_secs = t.shortest_phase_secs().min(self.pulse_interval_secs);
        if t.tick_secs() > shortest_secs {
            return Err(ConfigError::TickTooCoarse {
                tick_secs: t.tick_secs(),
                shortest_secs,
            });
        }

        let w = &self.weights;
        let all_non_negative = [w.warmup_a, w.warmup_b, w.pulses]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0);
        if !all_non_negative || (w.total() - 100.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidWeights(w.total()));
        }

        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("pulsr_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed config")
                }
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
