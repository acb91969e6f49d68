use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::types::AudioData;
use crate::error::{AudioError, Result};

/// Audio file loader supporting multiple formats
///
/// WAV goes through hound; everything else through symphonia's probe.
pub struct AudioLoader;

impl AudioLoader {
    /// Length of an audio file in seconds, from headers when they carry it
    pub fn probe_duration<P: AsRef<Path>>(path: P) -> Result<f64> {
        let path = path.as_ref();

        if Self::detect_format(path).as_deref() == Some("wav") {
            let reader = hound::WavReader::open(path).map_err(|_| AudioError::LoadFailed {
                path: path.display().to_string(),
            })?;
            let spec = reader.spec();
            return Ok(reader.duration() as f64 / spec.sample_rate as f64);
        }

        let format = Self::open_with_symphonia(path)?;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::LoadFailed {
                path: path.display().to_string(),
            })?;

        let params = &track.codec_params;
        if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate) {
            if rate > 0 {
                return Ok(frames as f64 / rate as f64);
            }
        }

        debug!("{:?} has no frame count in its headers, decoding to measure", path);
        Ok(Self::load(path)?.duration)
    }

    /// Decode a whole file into interleaved f32 samples
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AudioData> {
        let path = path.as_ref();
        let extension = Self::detect_format(path).unwrap_or_default();

        match extension.as_str() {
            "wav" => Self::load_wav(path),
            "mp3" | "flac" | "ogg" | "m4a" | "aac" => Self::load_with_symphonia(path),
            _ => Err(AudioError::UnsupportedFormat { format: extension }.into()),
        }
    }

    fn load_wav(path: &Path) -> Result<AudioData> {
        let failed = || AudioError::LoadFailed {
            path: path.display().to_string(),
        };

        let reader = hound::WavReader::open(path).map_err(|_| failed())?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| failed())?,
            hound::SampleFormat::Int => {
                let bit_depth = spec.bits_per_sample;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|s| Self::int_to_float(s, bit_depth)))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| failed())?
            }
        };

        let mut audio = AudioData::from_samples(samples, spec.sample_rate, spec.channels);
        audio.file_path = path.to_path_buf();
        Ok(audio)
    }

    fn open_with_symphonia(path: &Path) -> Result<Box<dyn FormatReader>> {
        let file = File::open(path).map_err(|_| AudioError::LoadFailed {
            path: path.display().to_string(),
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|_| AudioError::LoadFailed {
                path: path.display().to_string(),
            })?;

        Ok(probed.format)
    }

    fn load_with_symphonia(path: &Path) -> Result<AudioData> {
        let mut format = Self::open_with_symphonia(path)?;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::LoadFailed {
                path: path.display().to_string(),
            })?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params.sample_rate.ok_or_else(|| AudioError::DecodingFailed {
            reason: "no sample rate found".to_string(),
        })?;
        let channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::DecodingFailed { reason: e.to_string() })?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // End of stream
                Err(_) => break,
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => Self::append_interleaved(&decoded, &mut samples),
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping undecodable packet in {:?}: {}", path, e);
                    continue;
                }
                Err(_) => break,
            }
        }

        let mut audio = AudioData::from_samples(samples, sample_rate, channels);
        audio.file_path = path.to_path_buf();
        Ok(audio)
    }

    /// Convert integer sample to float (-1.0 to 1.0)
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => (sample as f32 - 128.0) / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0,
        }
    }

    fn append_interleaved(buffer: &AudioBufferRef, output: &mut Vec<f32>) {
        macro_rules! interleave {
            ($buf:expr, $convert:expr) => {{
                let channels = $buf.spec().channels.count();
                for frame in 0..$buf.frames() {
                    for ch in 0..channels {
                        output.push($convert($buf.chan(ch)[frame]));
                    }
                }
            }};
        }

        match buffer {
            AudioBufferRef::F32(buf) => interleave!(buf, |s: f32| s),
            AudioBufferRef::F64(buf) => interleave!(buf, |s: f64| s as f32),
            AudioBufferRef::S32(buf) => interleave!(buf, |s: i32| s as f32 / 2147483648.0),
            AudioBufferRef::S16(buf) => interleave!(buf, |s: i16| s as f32 / 32768.0),
            _ => warn!("Unsupported audio buffer format, packet dropped"),
        }
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a file format is supported
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_wav(path: &Path, seconds: f64, rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..(seconds * rate as f64) as usize {
            writer.write_sample(((i % 100) as i16 - 50) * 100).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioLoader::detect_format("test.wav"), Some("wav".to_string()));
        assert_eq!(AudioLoader::detect_format("test.MP3"), Some("mp3".to_string()));
        assert_eq!(AudioLoader::detect_format("test"), None);
        assert!(AudioLoader::is_format_supported("FLAC"));
        assert!(!AudioLoader::is_format_supported("xyz"));
    }

    #[test]
    fn test_int_to_float_conversion() {
        assert_eq!(AudioLoader::int_to_float(0, 16), 0.0);
        assert_eq!(AudioLoader::int_to_float(-32768, 16), -1.0);
        assert_eq!(AudioLoader::int_to_float(128, 8), 0.0);
        assert_eq!(AudioLoader::int_to_float(0, 8), -1.0);
    }

    #[test]
    fn test_wav_probe_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("voice.wav");
        write_wav(&path, 1.5, 8000);

        let duration = AudioLoader::probe_duration(&path).unwrap();
        assert!((duration - 1.5).abs() < 1e-6);

        let audio = AudioLoader::load(&path).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.frame_count(), 12_000);
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.xyz");
        std::fs::write(&path, b"dummy content").unwrap();

        match AudioLoader::load(&path) {
            Err(crate::error::CompositorError::Audio(AudioError::UnsupportedFormat { format })) => {
                assert_eq!(format, "xyz")
            }
            other => panic!("Expected UnsupportedFormat error, got {:?}", other.map(|a| a.duration)),
        }
    }
}
