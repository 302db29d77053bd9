use std::io::Read;
use std::path::Path;

use crate::error::DecodeError;

// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }

    pub fn load_wav(path: &Path, target_rate: u32) -> Result<Self, DecodeError> {
        let file = std::fs::File::open(path)?;
        Self::decode(std::io::BufReader::new(file), target_rate)
    }

    pub fn decode_bytes(bytes: &[u8], target_rate: u32) -> Result<Self, DecodeError> {
        Self::decode(std::io::Cursor::new(bytes), target_rate)
    }

    // Decode a WAV stream into stereo frames at `target_rate`
    pub fn decode<R: Read>(reader: R, target_rate: u32) -> Result<Self, DecodeError> {
        let mut reader = hound::WavReader::new(reader)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let frames: Vec<StereoFrame> = match spec.channels {
            0 => return Err(DecodeError::Unsupported("zero channels".into())),
            1 => samples
                .into_iter()
                .map(|x| StereoFrame { left: x, right: x }) // mono, duplicate
                .collect(),
            n => samples
                .chunks_exact(n as usize)
                .map(|c| StereoFrame { left: c[0], right: c[1] }) // extra channels dropped
                .collect(),
        };

        if frames.is_empty() {
            return Err(DecodeError::Empty);
        }

        let data = if target_rate == 0 || spec.sample_rate == target_rate {
            frames
        } else {
            resample_linear(&frames, spec.sample_rate, target_rate)
        };

        Ok(Self {
            data,
            sample_rate: if target_rate == 0 { spec.sample_rate } else { target_rate },
        })
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let last = frames.last().copied().unwrap_or_default();

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            let frac = (src_pos - idx as f64) as f32;
            if idx + 1 >= frames.len() {
                return last;
            }
            let (a, b) = (frames[idx], frames[idx + 1]);
            StereoFrame {
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn wav_bytes(channels: u16, rate: u32, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
