//! Audiolab - Audio Effect Lab
//!
//! Upload a clip, apply an effect, look at it, download the result.
//!
//! # Architecture
//!
//! - `engine`: PCM buffer type and the codec boundary (WAV via `hound`)
//! - `dsp`: pure effect functions, each ending in peak normalisation
//! - `visual`: waveform envelope, STFT spectrogram, PNG rendering
//! - `state`: TTL-managed asset registry and its background sweeper
//! - `pipeline`: request orchestration over all of the above
//!
//! # Example
//!
//! ```
//! use audiolab::dsp::{self, EffectRequest, ReverbParams};
//! use audiolab::engine::buffer::generate_test_tone;
//!
//! let tone = generate_test_tone(440.0, 0.5, 0.5, 44_100).unwrap();
//! let wet = dsp::apply(&EffectRequest::Reverb(ReverbParams::default()), &tone).unwrap();
//! assert!(wet.frame_count() > tone.frame_count());
//! assert!(wet.peak() <= 1.0);
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod state;
pub mod visual;

pub use config::LabConfig;
pub use error::{ErrorKind, LabError, Result};
pub use pipeline::{Download, Pipeline, ProcessOutcome, ProcessRequest, UploadReceipt};
