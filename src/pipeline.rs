//! Pipeline Orchestrator
//!
//! Request-level operations over the shared registry:
//!
//! ```text
//! upload ──► size check ──► decode ──► register (Uploaded)
//! process ──► validate ──► resolve ──► effect ──► clamp ──► encode ──► register (Processed)
//! visualize ──► resolve ──► cached? ──► analyse + render ──► cache
//! download ──► resolve ──► encoded bytes + checksum
//! ```
//!
//! Nothing is registered until a request has fully succeeded, so a failure
//! at any step leaves the registry as it was.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::LabConfig;
use crate::dsp::{self, EffectKind, EffectRequest};
use crate::engine::{AudioCodec, AudioFormat, WavCodec};
use crate::error::{LabError, Result};
use crate::state::{
    spawn_sweeper, Asset, AssetId, AssetOrigin, AssetRegistry, EncodedAudio, SweeperHandle,
};
use crate::visual::{self, PngRenderer, RasterRenderer, VisualizationResult};

// ============================================================================
// Request / Response Types
// ============================================================================

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub asset_id: AssetId,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    pub duration_secs: f64,
    pub expires_at: DateTime<Utc>,
}

/// Apply `effect` to the asset `asset_id`
///
/// Wire form: `{"asset_id": "...", "effect": "reverb", "parameters": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub asset_id: AssetId,
    #[serde(flatten)]
    pub effect: EffectRequest,
}

/// Result of a successful effect run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub asset_id: AssetId,
    pub source_id: AssetId,
    pub effect: EffectKind,
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    pub duration_secs: f64,
    pub expires_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Encoded bytes ready to hand to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    /// Lowercase hex SHA-256 of `bytes`
    pub checksum: String,
    pub file_name: String,
}

impl Download {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Orchestrates codec, effect engine, visualizer and registry
///
/// Cheap to clone; clones share the registry and the job pool.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<LabConfig>,
    registry: Arc<AssetRegistry>,
    codec: Arc<dyn AudioCodec>,
    renderer: Arc<dyn RasterRenderer>,
    jobs: Arc<Semaphore>,
}

impl Pipeline {
    /// Build a pipeline with the bundled WAV codec and PNG renderer
    ///
    /// # Errors
    /// `InvalidConfig` if `output_format` is not WAV.
    pub fn new(config: Arc<LabConfig>, registry: Arc<AssetRegistry>) -> Result<Self> {
        let codec = WavCodec::default().with_fallback_sample_rate(config.default_sample_rate);
        Self::with_components(
            config,
            registry,
            Arc::new(codec),
            Arc::new(PngRenderer::default()),
        )
    }

    /// Build a pipeline with custom codec and renderer
    ///
    /// # Errors
    /// `InvalidConfig` if `codec` cannot encode the configured output format.
    pub fn with_components(
        config: Arc<LabConfig>,
        registry: Arc<AssetRegistry>,
        codec: Arc<dyn AudioCodec>,
        renderer: Arc<dyn RasterRenderer>,
    ) -> Result<Self> {
        if !codec.can_encode(config.output_format) {
            return Err(LabError::InvalidConfig {
                reason: format!(
                    "output_format {} is not supported by the installed codec",
                    config.output_format
                ),
            });
        }

        let jobs = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Ok(Self {
            config,
            registry,
            codec,
            renderer,
            jobs,
        })
    }

    /// Build a pipeline with its own registry sized from `config`
    pub fn from_config(config: LabConfig) -> Result<Self> {
        let registry = Arc::new(AssetRegistry::new(config.registry_limits()));
        Self::new(Arc::new(config), registry)
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<AssetRegistry> {
        &self.registry
    }

    /// Start the background expiry sweep at the configured interval
    pub fn spawn_sweeper(&self) -> SweeperHandle {
        spawn_sweeper(Arc::clone(&self.registry), self.config.sweep_interval())
    }

    /// Accept an encoded upload
    ///
    /// `declared` is a MIME type, a file name or a bare extension.
    ///
    /// # Errors
    /// * `UploadTooLarge` before any decoding when over the size limit
    /// * `UnsupportedFormat` / `CorruptInput` from format detection and decode
    /// * `RegistryFull` when the registry has no room
    pub fn upload(&self, bytes: &[u8], declared: &str) -> Result<UploadReceipt> {
        if bytes.len() > self.config.max_upload_bytes {
            warn!(
                size = bytes.len(),
                limit = self.config.max_upload_bytes,
                "upload rejected: too large"
            );
            return Err(LabError::UploadTooLarge {
                size_bytes: bytes.len(),
                limit_bytes: self.config.max_upload_bytes,
            });
        }

        let format = AudioFormat::from_declared(declared)?;
        let pcm = self.codec.decode(bytes, format)?;

        let file_name = if !declared.contains('/') && Path::new(declared).extension().is_some() {
            Some(declared.to_string())
        } else {
            None
        };

        let encoded = EncodedAudio::new(bytes.to_vec(), format);
        let asset = self
            .registry
            .register(pcm, encoded, AssetOrigin::Uploaded { file_name })?;
        let duration_secs = asset.pcm.duration_secs();

        info!(
            asset = %asset.id,
            %format,
            size = bytes.len(),
            duration_secs,
            "upload registered"
        );

        Ok(UploadReceipt {
            asset_id: asset.id,
            format,
            sample_rate: asset.pcm.sample_rate(),
            channels: asset.pcm.channel_count(),
            frames: asset.pcm.frame_count(),
            duration_secs,
            expires_at: asset.expires_at,
        })
    }

    /// Apply an effect to a stored asset and store the result
    pub fn process(&self, request: &ProcessRequest) -> Result<ProcessOutcome> {
        let started = Instant::now();
        request.effect.validate()?;

        let source = self.registry.get(&request.asset_id)?;
        let mut output = dsp::apply(&request.effect, &source.pcm)?;
        output.clamp();

        let format = self.config.output_format;
        let bytes = self.codec.encode(&output, format)?;

        let effect = request.effect.kind();
        let stored = self.registry.register(
            output,
            EncodedAudio::new(bytes, format),
            AssetOrigin::Processed {
                source: request.asset_id,
                effect,
            },
        )?;
        let asset_id = stored.id;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            source = %request.asset_id,
            asset = %asset_id,
            %effect,
            elapsed_ms,
            "processing complete"
        );

        Ok(ProcessOutcome {
            asset_id,
            source_id: request.asset_id,
            effect,
            sample_rate: stored.pcm.sample_rate(),
            channels: stored.pcm.channel_count(),
            frames: stored.pcm.frame_count(),
            duration_secs: stored.pcm.duration_secs(),
            expires_at: stored.expires_at,
            elapsed_ms,
        })
    }

    /// [`process`](Self::process) on the blocking pool, bounded by
    /// `max_concurrent_jobs`
    ///
    /// # Errors
    /// `QueueSaturated` if no job slot frees up within `queue_timeout_ms`;
    /// the effect is not started in that case.
    pub async fn process_async(&self, request: ProcessRequest) -> Result<ProcessOutcome> {
        self.run_job(move |pipeline| pipeline.process(&request)).await
    }

    /// [`visualize`](Self::visualize) on the blocking pool, bounded by
    /// `max_concurrent_jobs`
    pub async fn visualize_async(&self, id: AssetId) -> Result<Arc<VisualizationResult>> {
        self.run_job(move |pipeline| pipeline.visualize(&id)).await
    }

    async fn run_job<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Pipeline) -> Result<T> + Send + 'static,
    {
        let timeout = self.config.queue_timeout();
        let permit = match tokio::time::timeout(timeout, Arc::clone(&self.jobs).acquire_owned())
            .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(LabError::processing("job pool is closed")),
            Err(_) => {
                warn!(
                    waited_ms = self.config.queue_timeout_ms,
                    "job rejected: no free slot"
                );
                return Err(LabError::QueueSaturated {
                    waited_ms: self.config.queue_timeout_ms,
                });
            }
        };

        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job(&pipeline)
        })
        .await
        .map_err(|e| LabError::processing(format!("job failed to complete: {}", e)))?
    }

    /// Waveform and spectrogram for an asset, computed once and cached
    pub fn visualize(&self, id: &AssetId) -> Result<Arc<VisualizationResult>> {
        let asset = self.registry.get(id)?;
        if let Some(cached) = self.registry.cached_visualization(id) {
            return Ok(cached);
        }

        let result = Arc::new(visual::visualize(
            *id,
            &asset.pcm,
            &self.config.visual_settings(),
            self.renderer.as_ref(),
        )?);
        self.registry.cache_visualization(id, Arc::clone(&result))?;
        Ok(result)
    }

    /// Encoded bytes of an asset with their checksum
    pub fn download(&self, id: &AssetId) -> Result<Download> {
        let asset: Arc<Asset> = self.registry.get(id)?;
        Ok(Download {
            bytes: asset.encoded.bytes.clone(),
            format: asset.encoded.format,
            checksum: asset.encoded.checksum.clone(),
            file_name: asset.file_name(),
        })
    }

    /// Remove an asset; returns whether it existed
    pub fn delete(&self, id: &AssetId) -> bool {
        self.registry.delete(id)
    }
}
