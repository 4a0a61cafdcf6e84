//! Runtime configuration
//!
//! Read once at startup: JSON file (optional) -> `AUDIOLAB_*` environment
//! overrides -> validation. Shared read-only afterwards.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::AudioFormat;
use crate::error::{LabError, Result};
use crate::state::RegistryLimits;
use crate::visual::VisualSettings;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "AUDIOLAB_";

/// Longest accepted asset lifetime: 100 years
pub const MAX_TTL_MINUTES: u64 = 100 * 365 * 24 * 60;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// Asset time-to-live in minutes
    pub ttl_minutes: u64,
    /// Seconds between background expiry sweeps
    pub sweep_interval_secs: u64,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
    /// Maximum number of live assets
    pub max_assets: usize,
    /// Byte budget across all live assets
    pub max_total_bytes: usize,
    /// Sample rate assumed when a decoder cannot report one
    pub default_sample_rate: u32,
    /// Waveform buckets per visualization
    pub waveform_points: usize,
    /// Spectrogram FFT length
    pub spectrogram_window: usize,
    /// Spectrogram hop in samples
    pub spectrogram_hop: usize,
    /// Effect jobs allowed to run at once
    pub max_concurrent_jobs: usize,
    /// How long a job waits for a slot before being rejected
    pub queue_timeout_ms: u64,
    /// Encoding for processed assets
    pub output_format: AudioFormat,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 30,
            sweep_interval_secs: 60,
            max_upload_bytes: 20 * 1024 * 1024,
            max_assets: 256,
            max_total_bytes: 1 << 30,
            default_sample_rate: 44_100,
            waveform_points: 1000,
            spectrogram_window: 2048,
            spectrogram_hop: 512,
            max_concurrent_jobs: 4,
            queue_timeout_ms: 5000,
            output_format: AudioFormat::Wav,
        }
    }
}

impl LabConfig {
    /// Build the configuration: optional JSON file, then environment
    /// overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| LabError::InvalidConfig {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| LabError::InvalidConfig {
            reason: format!("{}: {}", path.display(), e),
        })
    }

    /// Apply `AUDIOLAB_<FIELD>` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_field(&lookup, "TTL_MINUTES", &mut self.ttl_minutes)?;
        override_field(&lookup, "SWEEP_INTERVAL_SECS", &mut self.sweep_interval_secs)?;
        override_field(&lookup, "MAX_UPLOAD_BYTES", &mut self.max_upload_bytes)?;
        override_field(&lookup, "MAX_ASSETS", &mut self.max_assets)?;
        override_field(&lookup, "MAX_TOTAL_BYTES", &mut self.max_total_bytes)?;
        override_field(&lookup, "DEFAULT_SAMPLE_RATE", &mut self.default_sample_rate)?;
        override_field(&lookup, "WAVEFORM_POINTS", &mut self.waveform_points)?;
        override_field(&lookup, "SPECTROGRAM_WINDOW", &mut self.spectrogram_window)?;
        override_field(&lookup, "SPECTROGRAM_HOP", &mut self.spectrogram_hop)?;
        override_field(&lookup, "MAX_CONCURRENT_JOBS", &mut self.max_concurrent_jobs)?;
        override_field(&lookup, "QUEUE_TIMEOUT_MS", &mut self.queue_timeout_ms)?;

        if let Some(value) = lookup(&format!("{}OUTPUT_FORMAT", ENV_PREFIX)) {
            self.output_format = AudioFormat::from_declared(&value)?;
        }
        Ok(())
    }

    /// Reject settings the rest of the system cannot run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("ttl_minutes", self.ttl_minutes as usize),
            ("sweep_interval_secs", self.sweep_interval_secs as usize),
            ("max_upload_bytes", self.max_upload_bytes),
            ("max_assets", self.max_assets),
            ("max_total_bytes", self.max_total_bytes),
            ("default_sample_rate", self.default_sample_rate as usize),
            ("waveform_points", self.waveform_points),
            ("max_concurrent_jobs", self.max_concurrent_jobs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(LabError::InvalidConfig {
                    reason: format!("{} must be greater than 0", name),
                });
            }
        }

        if self.ttl_minutes > MAX_TTL_MINUTES {
            return Err(LabError::InvalidConfig {
                reason: format!(
                    "ttl_minutes must be at most {}, got {}",
                    MAX_TTL_MINUTES, self.ttl_minutes
                ),
            });
        }

        if self.spectrogram_window < 16 || !self.spectrogram_window.is_power_of_two() {
            return Err(LabError::InvalidConfig {
                reason: format!(
                    "spectrogram_window must be a power of two >= 16, got {}",
                    self.spectrogram_window
                ),
            });
        }
        if self.spectrogram_hop == 0 || self.spectrogram_hop > self.spectrogram_window {
            return Err(LabError::InvalidConfig {
                reason: format!(
                    "spectrogram_hop must be in 1..={}, got {}",
                    self.spectrogram_window, self.spectrogram_hop
                ),
            });
        }
        Ok(())
    }

    /// Asset lifetime, capped at [`MAX_TTL_MINUTES`]
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes.min(MAX_TTL_MINUTES) as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    pub fn registry_limits(&self) -> RegistryLimits {
        RegistryLimits {
            ttl: self.ttl(),
            max_assets: self.max_assets,
            max_total_bytes: self.max_total_bytes,
        }
    }

    pub fn visual_settings(&self) -> VisualSettings {
        VisualSettings {
            waveform_points: self.waveform_points,
            window_size: self.spectrogram_window,
            hop_size: self.spectrogram_hop,
        }
    }
}

fn override_field<F, T>(lookup: &F, name: &str, field: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let key = format!("{}{}", ENV_PREFIX, name);
    if let Some(raw) = lookup(&key) {
        *field = raw.trim().parse().map_err(|_| LabError::InvalidConfig {
            reason: format!("{}={:?} is not a valid value", key, raw),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = LabConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ttl(), chrono::Duration::minutes(30));
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.output_format, AudioFormat::Wav);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ttl_minutes": 5, "max_assets": 3}}"#).unwrap();

        let config = LabConfig::from_file(file.path()).unwrap();
        assert_eq!(config.ttl_minutes, 5);
        assert_eq!(config.max_assets, 3);
        assert_eq!(config.spectrogram_window, 2048);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ttl_minuets": 5}}"#).unwrap();
        assert!(matches!(
            LabConfig::from_file(file.path()),
            Err(LabError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = LabConfig::default();
        config
            .apply_env_overrides(env(&[
                ("AUDIOLAB_TTL_MINUTES", "1"),
                ("AUDIOLAB_MAX_CONCURRENT_JOBS", " 8 "),
                ("AUDIOLAB_OUTPUT_FORMAT", "wav"),
            ]))
            .unwrap();
        assert_eq!(config.ttl_minutes, 1);
        assert_eq!(config.max_concurrent_jobs, 8);
    }

    #[test]
    fn test_bad_env_value_rejected() {
        let mut config = LabConfig::default();
        let result = config.apply_env_overrides(env(&[("AUDIOLAB_MAX_ASSETS", "many")]));
        assert!(matches!(result, Err(LabError::InvalidConfig { .. })));
    }

    #[test]
    fn test_validate_rejects_oversized_ttl() {
        for ttl_minutes in [MAX_TTL_MINUTES + 1, 10_000_000_000_000, u64::MAX] {
            let config = LabConfig {
                ttl_minutes,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(LabError::InvalidConfig { .. })
            ));
            assert!(config.ttl() > chrono::Duration::zero());
        }

        let config = LabConfig {
            ttl_minutes: MAX_TTL_MINUTES,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_ttl_too_large_fails_load_validation() {
        let mut config = LabConfig::default();
        config
            .apply_env_overrides(env(&[("AUDIOLAB_TTL_MINUTES", "18446744073709551615")]))
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_spectrogram_settings() {
        let config = LabConfig {
            spectrogram_window: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LabConfig {
            spectrogram_hop: 4096,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LabConfig {
            max_concurrent_jobs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
