use std::path::Path;

use fxlab_core::{FxError, Result};

/// Decoded audio, mixed down to mono and normalised to [-1, 1].
#[derive(Debug, Clone)]
pub struct MonoClip {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl MonoClip {
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// `len` samples ending at `seconds`, zero-padded outside the clip.
    pub fn window_ending_at(&self, seconds: f64, len: usize) -> Vec<f32> {
        let end = (seconds * self.sample_rate as f64).round() as i64;
        (end - len as i64..end)
            .map(|index| {
                usize::try_from(index)
                    .ok()
                    .and_then(|i| self.samples.get(i).copied())
                    .unwrap_or(0.0)
            })
            .collect()
    }
}

pub fn read_wav(path: &Path) -> Result<MonoClip> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|err| FxError::msg(format!("failed to open {}: {err}", path.display())))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_error)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(decode_error)?
        }
    };

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    tracing::debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        "decoded wav"
    );

    Ok(MonoClip {
        sample_rate: spec.sample_rate,
        samples,
    })
}

fn decode_error(err: hound::Error) -> FxError {
    FxError::msg(format!("failed to decode wav samples: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_stereo(path: &Path) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(i16::MAX / 2).unwrap();
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn mixes_channels_to_mono() {
        let path = std::env::temp_dir().join(format!("fxlab-mix-{}.wav", std::process::id()));
        write_stereo(&path);

        let clip = read_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(clip.sample_rate, 8_000);
        assert_eq!(clip.samples.len(), 100);
        assert!((clip.samples[0] - 0.25).abs() < 1e-3);
        assert!((clip.duration_seconds() - 0.0125).abs() < 1e-6);
    }

    #[test]
    fn windows_are_zero_padded() {
        let clip = MonoClip {
            sample_rate: 10,
            samples: vec![1.0; 10],
        };
        assert_eq!(clip.window_ending_at(0.3, 5), vec![0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(clip.window_ending_at(1.2, 4), vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_wav(Path::new("/definitely/not/here.wav")).is_err());
    }
}
