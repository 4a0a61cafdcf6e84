//! CLI Command Implementations
//!
//! Each command uploads the input file into a short-lived pipeline and
//! works on the resulting asset.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tracing::info;

use crate::dsp::{EffectKind, EffectRequest};
use crate::error::{LabError, Result};
use crate::pipeline::{Pipeline, ProcessRequest, UploadReceipt};

/// Read a file and register it with the pipeline.
fn upload_file(pipeline: &Pipeline, path: &Path) -> Result<UploadReceipt> {
    let bytes = fs::read(path)?;
    let declared = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    info!("Uploading {} ({} bytes)", path.display(), bytes.len());
    pipeline.upload(&bytes, &declared)
}

/// Print basic facts about an audio file.
pub fn info(pipeline: &Pipeline, file: &Path) -> Result<()> {
    let receipt = upload_file(pipeline, file)?;
    let asset = pipeline.registry().get(&receipt.asset_id)?;

    println!("File:        {}", file.display());
    println!("Format:      {}", receipt.format);
    println!("Sample rate: {} Hz", receipt.sample_rate);
    println!("Channels:    {}", receipt.channels);
    println!("Frames:      {}", receipt.frames);
    println!("Duration:    {:.3} s", receipt.duration_secs);
    println!("Peak:        {:.2} dBFS", asset.pcm.peak_db());
    println!("SHA-256:     {}", asset.encoded.checksum);

    Ok(())
}

/// Apply an effect to a file and write the encoded result.
pub fn process(
    pipeline: &Pipeline,
    file: &Path,
    effect: &str,
    params: &str,
    output: &Path,
) -> Result<()> {
    let kind: EffectKind = effect.parse()?;
    let parameters: Value = serde_json::from_str(params).map_err(|e| LabError::InvalidRequest {
        reason: format!("--params is not valid JSON: {}", e),
    })?;
    let effect = EffectRequest::parse(kind, &parameters)?;

    let receipt = upload_file(pipeline, file)?;
    let outcome = pipeline.process(&ProcessRequest {
        asset_id: receipt.asset_id,
        effect,
    })?;
    let download = pipeline.download(&outcome.asset_id)?;
    fs::write(output, &download.bytes)?;

    println!("Applied {} in {} ms", outcome.effect, outcome.elapsed_ms);
    println!(
        "Output: {} ({} ch, {:.3} s)",
        output.display(),
        outcome.channels,
        outcome.duration_secs
    );
    println!("SHA-256: {}", download.checksum);

    Ok(())
}

/// Write waveform/spectrogram PNGs and the numeric analysis.
pub fn visualize(pipeline: &Pipeline, file: &Path, out_dir: &Path) -> Result<()> {
    let receipt = upload_file(pipeline, file)?;
    let result = pipeline.visualize(&receipt.asset_id)?;

    fs::create_dir_all(out_dir)?;
    let waveform_path = out_dir.join("waveform.png");
    let spectrogram_path = out_dir.join("spectrogram.png");
    let analysis_path = out_dir.join("analysis.json");

    fs::write(&waveform_path, &result.waveform_image)?;
    fs::write(&spectrogram_path, &result.spectrogram_image)?;

    let analysis = json!({
        "asset_id": result.asset_id,
        "duration_secs": receipt.duration_secs,
        "waveform": result.waveform,
        "spectrogram": {
            "bins": result.spectrogram.bins,
            "frames": result.spectrogram.frames,
            "window_size": result.spectrogram.window_size,
            "hop_size": result.spectrogram.hop_size,
            "sample_rate": result.spectrogram.sample_rate,
        },
    });
    fs::write(&analysis_path, serde_json::to_string_pretty(&analysis)?)?;

    println!("Waveform:    {}", waveform_path.display());
    println!("Spectrogram: {}", spectrogram_path.display());
    println!("Analysis:    {}", analysis_path.display());

    Ok(())
}

/// List the available effects.
pub fn effects() -> Result<()> {
    for kind in EffectKind::ALL {
        println!("{:<12} {}", kind.name(), kind.parameter_help());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabConfig;
    use crate::engine::buffer::generate_test_tone;
    use crate::engine::{AudioCodec, AudioFormat, WavCodec};

    fn write_tone(dir: &Path) -> std::path::PathBuf {
        let pcm = generate_test_tone(440.0, 0.5, 0.5, 8000).unwrap();
        let bytes = WavCodec::default().encode(&pcm, AudioFormat::Wav).unwrap();
        let path = dir.join("tone.wav");
        fs::write(&path, bytes).unwrap();
        path
    }

    fn pipeline() -> Pipeline {
        Pipeline::from_config(LabConfig {
            spectrogram_window: 256,
            spectrogram_hop: 128,
            waveform_points: 100,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_process_writes_wav() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_tone(dir.path());
        let output = dir.path().join("out.wav");

        process(&pipeline(), &input, "trim", r#"{"start_s": 0.1, "end_s": 0.3}"#, &output)
            .unwrap();

        let decoded = WavCodec::default()
            .decode(&fs::read(&output).unwrap(), AudioFormat::Wav)
            .unwrap();
        assert_eq!(decoded.frame_count(), 1600);
    }

    #[test]
    fn test_process_rejects_bad_params() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_tone(dir.path());
        let output = dir.path().join("out.wav");

        assert!(process(&pipeline(), &input, "reverb", "not json", &output).is_err());
        assert!(process(&pipeline(), &input, "chorus", "{}", &output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_visualize_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_tone(dir.path());
        let out_dir = dir.path().join("viz");

        visualize(&pipeline(), &input, &out_dir).unwrap();
        assert!(out_dir.join("waveform.png").exists());
        assert!(out_dir.join("spectrogram.png").exists());

        let analysis: Value =
            serde_json::from_str(&fs::read_to_string(out_dir.join("analysis.json")).unwrap())
                .unwrap();
        assert_eq!(analysis["waveform"].as_array().unwrap().len(), 100);
        assert_eq!(analysis["spectrogram"]["bins"], 129);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = info(&pipeline(), Path::new("/nonexistent/input.wav"));
        assert!(matches!(result, Err(LabError::Io(_))));
    }
}
