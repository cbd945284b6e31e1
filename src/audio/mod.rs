use anyhow::Result;
use hound::{SampleFormat, WavReader};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{error, info};

pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Decodes an uploaded audio file into the mono 16 kHz f32 stream whisper
/// expects. Non-WAV inputs are converted through ffmpeg first; the temporary
/// WAV is removed afterwards.
pub fn parse_audio_file(path: &Path) -> Result<Vec<f32>> {
    let wav_path = ensure_wav_format(path)?;
    let result = read_wav_file(&wav_path);

    if wav_path != path {
        if let Err(e) = fs::remove_file(&wav_path) {
            error!("Failed to remove temporary WAV file {:?}: {}", wav_path, e);
        }
    }

    let (samples, num_channels, sample_rate) = result?;
    let mono_samples = convert_to_mono(&samples, num_channels);
    let normalized_samples = normalize_audio(&mono_samples);

    if sample_rate != WHISPER_SAMPLE_RATE {
        resample_audio(&normalized_samples, sample_rate)
    } else {
        Ok(normalized_samples)
    }
}

/// Converts anything that is not already WAV through ffmpeg. ffmpeg must be on
/// the PATH for non-WAV uploads to transcribe.
fn ensure_wav_format(path: &Path) -> Result<PathBuf> {
    if let Some(extension) = path.extension() {
        if extension.to_str().unwrap_or("").eq_ignore_ascii_case("wav") {
            return Ok(path.to_path_buf());
        }
    }

    let output_path = path.with_extension("wav");
    info!("Converting {:?} to WAV format", path);

    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(path)
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg("16000")
        .arg(&output_path)
        .status()
        .map_err(|e| anyhow::anyhow!("Failed to execute ffmpeg: {}", e))?;

    if !status.success() {
        return Err(anyhow::anyhow!("ffmpeg conversion failed with status: {}", status));
    }

    Ok(output_path)
}

fn read_wav_file(path: &Path) -> Result<(Vec<f32>, usize, u32)> {
    let mut reader = WavReader::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to read WAV file: {}", e))?;

    let spec = reader.spec();
    let num_channels = spec.channels as usize;
    let sample_rate = spec.sample_rate;

    if spec.sample_format != SampleFormat::Int {
        return Err(anyhow::anyhow!("Unsupported sample format: expected integer format"));
    }
    if spec.bits_per_sample != 16 {
        return Err(anyhow::anyhow!("Unsupported bits per sample: expected 16 bits"));
    }

    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.map(|val| val as f32))
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| anyhow::anyhow!("Failed to read samples: {}", e))?;

    Ok((samples, num_channels, sample_rate))
}

fn convert_to_mono(samples: &[f32], num_channels: usize) -> Vec<f32> {
    if num_channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(num_channels)
        .map(|chunk| chunk.iter().sum::<f32>() / num_channels as f32)
        .collect()
}

fn normalize_audio(samples: &[f32]) -> Vec<f32> {
    let max_abs = samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0f32, f32::max);
    if max_abs == 0.0 {
        return samples.to_vec();
    }
    samples.iter().map(|&s| s / max_abs).collect()
}

fn resample_audio(samples: &[f32], original_sample_rate: u32) -> Result<Vec<f32>> {
    info!("Resampling from {} Hz to {} Hz", original_sample_rate, WHISPER_SAMPLE_RATE);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        WHISPER_SAMPLE_RATE as f64 / original_sample_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create resampler: {}", e))?;

    let resampled = resampler
        .process(&[samples.to_vec()], None)
        .map_err(|e| anyhow::anyhow!("Resampling failed: {}", e))?;

    Ok(resampled.into_iter().next().unwrap_or_default())
}
