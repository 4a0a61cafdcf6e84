//! Effect requests and their parameter schemas
//!
//! An `EffectRequest` is the validated form of `(effect name, parameters)`.
//! Each effect has a closed parameter set: unknown names are rejected, missing
//! ones take the documented defaults, and out-of-range values fail
//! validation instead of being clamped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LabError, Result};

// ============================================================================
// Parameter Bounds
// ============================================================================

/// Pitch shift range in semitones (inclusive)
pub const MAX_SEMITONES: f32 = 12.0;

/// 8D panning speed range in Hz
pub const PAN_SPEED_RANGE: (f32, f32) = (0.05, 1.0);

/// 8D intensity range
pub const PAN_INTENSITY_RANGE: (f32, f32) = (0.1, 1.0);

/// 8D crossfeed range
pub const CROSSFEED_RANGE: (f32, f32) = (0.0, 0.6);

/// Equalizer band gain limit in dB (symmetric)
pub const MAX_BAND_GAIN_DB: f32 = 12.0;

// ============================================================================
// Effect Kind
// ============================================================================

/// Names of the supported effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Reverse,
    PitchShift,
    Reverb,
    #[serde(rename = "stereo_3d", alias = "stereo_widen")]
    Stereo3d,
    Trim,
    #[serde(rename = "eight_d", alias = "eight_d_audio")]
    EightD,
    Equalizer,
}

impl EffectKind {
    /// Every supported effect, in display order
    pub const ALL: [EffectKind; 7] = [
        EffectKind::Reverse,
        EffectKind::PitchShift,
        EffectKind::Reverb,
        EffectKind::Stereo3d,
        EffectKind::Trim,
        EffectKind::EightD,
        EffectKind::Equalizer,
    ];

    /// Wire name of the effect
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Reverse => "reverse",
            EffectKind::PitchShift => "pitch_shift",
            EffectKind::Reverb => "reverb",
            EffectKind::Stereo3d => "stereo_3d",
            EffectKind::Trim => "trim",
            EffectKind::EightD => "eight_d",
            EffectKind::Equalizer => "equalizer",
        }
    }

    /// One-line description of the parameters and their ranges
    pub fn parameter_help(&self) -> &'static str {
        match self {
            EffectKind::Reverse => "(no parameters)",
            EffectKind::PitchShift => "semitones: -12..=12 (default 0)",
            EffectKind::Reverb => "decay: 0<d<1 (default 0.5), delay_ms: >0 (default 100)",
            EffectKind::Stereo3d => "width: 0..=1 (default 0.5)",
            EffectKind::Trim => "start_s: >=0 (default 0), end_s: start_s<e<=duration (default duration)",
            EffectKind::EightD => {
                "pan_speed_hz: 0.05..=1 (default 0.15), intensity: 0.1..=1 (default 0.8), crossfeed: 0..=0.6 (default 0.3)"
            }
            EffectKind::Equalizer => {
                "sub_bass, bass, low_mid, mid, high_mid, presence, brilliance: -12..=12 dB (default 0)"
            }
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(Value::String(s.to_string())).map_err(|_| {
            LabError::InvalidRequest {
                reason: format!(
                    "unknown effect '{}' (expected one of: {})",
                    s,
                    EffectKind::ALL
                        .iter()
                        .map(|k| k.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }
        })
    }
}

// ============================================================================
// Parameter Structs
// ============================================================================

/// Pitch shift parameters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PitchShiftParams {
    /// Shift in semitones (-12 to +12)
    pub semitones: f32,
}

/// Echo-train reverb parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReverbParams {
    /// Attenuation per echo, exclusive (0, 1)
    pub decay: f32,
    /// Spacing between echoes in milliseconds
    pub delay_ms: f32,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            decay: 0.5,
            delay_ms: 100.0,
        }
    }
}

/// Stereo widening parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Stereo3dParams {
    /// Widening amount: 0 (identity) to 1 (widest)
    pub width: f32,
}

impl Default for Stereo3dParams {
    fn default() -> Self {
        Self { width: 0.5 }
    }
}

/// Trim window in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrimParams {
    /// Window start in seconds
    #[serde(alias = "start_time")]
    pub start_s: f64,
    /// Window end in seconds; `None` means the end of the clip
    #[serde(alias = "end_time")]
    pub end_s: Option<f64>,
}

/// 8D auto-pan parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EightDParams {
    /// Full left-right-left rotations per second
    pub pan_speed_hz: f32,
    /// Depth of the panning (0.1 to 1)
    pub intensity: f32,
    /// How much each channel bleeds into the other (0 to 0.6)
    pub crossfeed: f32,
}

impl Default for EightDParams {
    fn default() -> Self {
        Self {
            pan_speed_hz: 0.15,
            intensity: 0.8,
            crossfeed: 0.3,
        }
    }
}

/// Seven-band equalizer gains in dB
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EqualizerParams {
    /// 60 Hz
    pub sub_bass: f32,
    /// 170 Hz
    pub bass: f32,
    /// 500 Hz
    pub low_mid: f32,
    /// 1 kHz
    pub mid: f32,
    /// 3 kHz
    pub high_mid: f32,
    /// 6 kHz
    pub presence: f32,
    /// 12 kHz
    pub brilliance: f32,
}

impl EqualizerParams {
    /// Band gains paired with their names, lowest band first
    pub fn gains(&self) -> [(&'static str, f32); 7] {
        [
            ("sub_bass", self.sub_bass),
            ("bass", self.bass),
            ("low_mid", self.low_mid),
            ("mid", self.mid),
            ("high_mid", self.high_mid),
            ("presence", self.presence),
            ("brilliance", self.brilliance),
        ]
    }
}

// ============================================================================
// Effect Request
// ============================================================================

/// A fully parsed effect with its parameters
///
/// On the wire: `{"effect": "reverb", "parameters": {"decay": 0.4}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEffect", into = "RawEffect")]
pub enum EffectRequest {
    Reverse,
    PitchShift(PitchShiftParams),
    Reverb(ReverbParams),
    Stereo3d(Stereo3dParams),
    Trim(TrimParams),
    EightD(EightDParams),
    Equalizer(EqualizerParams),
}

impl EffectRequest {
    /// Parse and validate parameters for `kind`
    ///
    /// `parameters` must be a JSON object (or null for "all defaults").
    pub fn parse(kind: EffectKind, parameters: &Value) -> Result<Self> {
        let params = match parameters {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => parameters.clone(),
            other => {
                return Err(LabError::InvalidRequest {
                    reason: format!("parameters must be a JSON object, got {}", other),
                })
            }
        };

        let request = match kind {
            EffectKind::Reverse => {
                if params.as_object().is_some_and(|m| !m.is_empty()) {
                    return Err(LabError::InvalidRequest {
                        reason: "reverse takes no parameters".to_string(),
                    });
                }
                EffectRequest::Reverse
            }
            EffectKind::PitchShift => EffectRequest::PitchShift(from_params(kind, params)?),
            EffectKind::Reverb => EffectRequest::Reverb(from_params(kind, params)?),
            EffectKind::Stereo3d => EffectRequest::Stereo3d(from_params(kind, params)?),
            EffectKind::Trim => EffectRequest::Trim(from_params(kind, params)?),
            EffectKind::EightD => EffectRequest::EightD(from_params(kind, params)?),
            EffectKind::Equalizer => EffectRequest::Equalizer(from_params(kind, params)?),
        };

        request.validate()?;
        Ok(request)
    }

    /// The effect's kind
    pub fn kind(&self) -> EffectKind {
        match self {
            EffectRequest::Reverse => EffectKind::Reverse,
            EffectRequest::PitchShift(_) => EffectKind::PitchShift,
            EffectRequest::Reverb(_) => EffectKind::Reverb,
            EffectRequest::Stereo3d(_) => EffectKind::Stereo3d,
            EffectRequest::Trim(_) => EffectKind::Trim,
            EffectRequest::EightD(_) => EffectKind::EightD,
            EffectRequest::Equalizer(_) => EffectKind::Equalizer,
        }
    }

    /// Check every buffer-independent parameter constraint
    ///
    /// Trim bounds against the clip duration are checked by the trim effect
    /// itself, still before any sample is touched.
    pub fn validate(&self) -> Result<()> {
        match self {
            EffectRequest::Reverse => Ok(()),
            EffectRequest::PitchShift(p) => check_range(
                "semitones",
                p.semitones,
                -MAX_SEMITONES,
                MAX_SEMITONES,
                "-12 to +12 semitones",
            ),
            EffectRequest::Reverb(p) => {
                if !(p.decay > 0.0 && p.decay < 1.0) {
                    return Err(LabError::invalid_param(
                        "decay",
                        p.decay,
                        "a value strictly between 0 and 1",
                    ));
                }
                if !(p.delay_ms.is_finite() && p.delay_ms > 0.0) {
                    return Err(LabError::invalid_param(
                        "delay_ms",
                        p.delay_ms,
                        "a finite value greater than 0 ms",
                    ));
                }
                Ok(())
            }
            EffectRequest::Stereo3d(p) => check_range("width", p.width, 0.0, 1.0, "0 to 1"),
            EffectRequest::Trim(p) => {
                if !(p.start_s.is_finite() && p.start_s >= 0.0) {
                    return Err(LabError::InvalidTrimWindow {
                        reason: format!("start ({}) must be >= 0", p.start_s),
                    });
                }
                if let Some(end) = p.end_s {
                    if !end.is_finite() || end <= p.start_s {
                        return Err(LabError::InvalidTrimWindow {
                            reason: format!(
                                "start ({:.3}s) must be less than end ({:.3}s)",
                                p.start_s, end
                            ),
                        });
                    }
                }
                Ok(())
            }
            EffectRequest::EightD(p) => {
                check_range(
                    "pan_speed_hz",
                    p.pan_speed_hz,
                    PAN_SPEED_RANGE.0,
                    PAN_SPEED_RANGE.1,
                    "0.05 to 1.0 Hz",
                )?;
                check_range(
                    "intensity",
                    p.intensity,
                    PAN_INTENSITY_RANGE.0,
                    PAN_INTENSITY_RANGE.1,
                    "0.1 to 1.0",
                )?;
                check_range(
                    "crossfeed",
                    p.crossfeed,
                    CROSSFEED_RANGE.0,
                    CROSSFEED_RANGE.1,
                    "0.0 to 0.6",
                )
            }
            EffectRequest::Equalizer(p) => {
                for (band, gain) in p.gains() {
                    check_range(band, gain, -MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB, "-12 to +12 dB")?;
                }
                Ok(())
            }
        }
    }
}

/// Unvalidated wire form of an effect request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEffect {
    pub effect: EffectKind,
    #[serde(default)]
    pub parameters: Value,
}

impl TryFrom<RawEffect> for EffectRequest {
    type Error = LabError;

    fn try_from(raw: RawEffect) -> Result<Self> {
        EffectRequest::parse(raw.effect, &raw.parameters)
    }
}

impl From<EffectRequest> for RawEffect {
    fn from(request: EffectRequest) -> Self {
        let parameters = match request {
            EffectRequest::Reverse => Ok(Value::Object(Default::default())),
            EffectRequest::PitchShift(p) => serde_json::to_value(p),
            EffectRequest::Reverb(p) => serde_json::to_value(p),
            EffectRequest::Stereo3d(p) => serde_json::to_value(p),
            EffectRequest::Trim(p) => serde_json::to_value(p),
            EffectRequest::EightD(p) => serde_json::to_value(p),
            EffectRequest::Equalizer(p) => serde_json::to_value(p),
        };
        RawEffect {
            effect: request.kind(),
            parameters: parameters.unwrap_or_default(),
        }
    }
}

fn from_params<T: serde::de::DeserializeOwned>(kind: EffectKind, params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| LabError::InvalidRequest {
        reason: format!("bad parameters for {}: {}", kind, e),
    })
}

/// Inclusive range check that also rejects NaN
fn check_range(param: &str, value: f32, min: f32, max: f32, expected: &str) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(LabError::invalid_param(param, value, expected))
    }
}
