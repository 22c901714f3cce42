use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::{
    error::{ReaderError, SoundError, SoundResult},
    sample::{Frames, Sample, SampleData, SampleType},
    segment::{SegmentHandle, SegmentSource, SourceInfo},
};

/// A `.wav` file used as a segment store.
///
/// Supports:
/// - 8, 16 and 32-bit integer PCM, read as `i8`, `i16` and `i32`
/// - 24-bit integer PCM, widened to full-scale `i32`
/// - 32-bit float PCM, read as `f32`
///
/// The header is parsed once in [`WavSource::open_path`]; every read reopens
/// the file so a source can be shared between readers.
#[derive(Debug, Clone)]
pub struct WavSource {
    path: PathBuf,
    info: SourceInfo,
    /// Left shift applied to integer samples narrower than their container.
    shift: u32,
}

impl WavSource {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, ReaderError> {
        let path = path.as_ref().to_path_buf();
        let reader = WavReader::open(&path)?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(ReaderError::corrupt("WAV header declares zero channels"));
        }
        let (dtype, shift) = Self::sample_type_of(spec)?;
        let info = SourceInfo {
            nframes: u64::from(reader.duration()),
            nchannels: usize::from(spec.channels),
            dtype,
            samplerate: Some(f64::from(spec.sample_rate)),
        };
        debug!(
            "opened WAV segment {}: {} frames, {} channel(s), {dtype}",
            path.display(),
            info.nframes,
            info.nchannels
        );
        Ok(Self { path, info, shift })
    }

    /// Write `frames` to a new WAV file at `path` and return it as a source.
    /// `f64` and `u8` buffers have no WAV container and are rejected.
    pub fn create<P: AsRef<Path>>(path: P, frames: &Frames, samplerate: u32) -> SoundResult<Self> {
        let (bits_per_sample, sample_format) = match frames.dtype() {
            SampleType::I8 => (8, SampleFormat::Int),
            SampleType::I16 => (16, SampleFormat::Int),
            SampleType::I32 => (32, SampleFormat::Int),
            SampleType::F32 => (32, SampleFormat::Float),
            other => {
                return Err(SoundError::dtype(format!(
                    "{other} samples cannot be stored in a WAV file"
                )));
            }
        };
        let channels = u16::try_from(frames.nchannels()).map_err(|_| {
            SoundError::consistency(format!(
                "{} channels do not fit in a WAV header",
                frames.nchannels()
            ))
        })?;
        let spec = WavSpec {
            channels,
            sample_rate: samplerate,
            bits_per_sample,
            sample_format,
        };

        let mut writer = WavWriter::create(path.as_ref(), spec)?;
        match frames.data() {
            SampleData::I8(samples) => write_all(&mut writer, samples)?,
            SampleData::I16(samples) => write_all(&mut writer, samples)?,
            SampleData::I32(samples) => write_all(&mut writer, samples)?,
            SampleData::F32(samples) => write_all(&mut writer, samples)?,
            SampleData::U8(_) | SampleData::F64(_) => {}
        }
        writer.finalize()?;

        Self::open_path(path).map_err(|err| {
            SoundError::consistency(format!("written WAV file could not be reopened: {err}"))
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sample_type_of(spec: WavSpec) -> Result<(SampleType, u32), ReaderError> {
        let bits = u32::from(spec.bits_per_sample);
        match (spec.sample_format, bits) {
            (SampleFormat::Int, 1..=8) => Ok((SampleType::I8, 8 - bits)),
            (SampleFormat::Int, 9..=16) => Ok((SampleType::I16, 16 - bits)),
            (SampleFormat::Int, 17..=32) => Ok((SampleType::I32, 32 - bits)),
            (SampleFormat::Float, 32) => Ok((SampleType::F32, 0)),
            (format, bits) => Err(ReaderError::Unreadable(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{bits}-bit {format:?} WAV samples are not supported"),
            ))),
        }
    }
}

fn write_all<S, W>(writer: &mut WavWriter<W>, samples: &[S]) -> Result<(), hound::Error>
where
    S: hound::Sample + Copy,
    W: io::Write + io::Seek,
{
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    Ok(())
}

struct WavHandle {
    reader: WavReader<BufReader<File>>,
    info: SourceInfo,
    shift: u32,
}

impl WavHandle {
    fn collect<S: hound::Sample + Sample>(&mut self, count: usize) -> Result<Vec<S>, ReaderError> {
        let mut samples = self
            .reader
            .samples::<S>()
            .take(count)
            .collect::<Result<Vec<S>, _>>()?;
        // a truncated data chunk can end mid-frame
        samples.truncate(samples.len() - samples.len() % self.info.nchannels);
        Ok(samples)
    }

    fn collect_shifted<S>(&mut self, count: usize) -> Result<Vec<S>, ReaderError>
    where
        S: hound::Sample + Sample + std::ops::Shl<u32, Output = S>,
    {
        let shift = self.shift;
        let samples = self.collect::<S>(count)?;
        if shift == 0 {
            return Ok(samples);
        }
        Ok(samples.into_iter().map(|s| s << shift).collect())
    }
}

impl SegmentHandle for WavHandle {
    fn seek(&mut self, frame: u64) -> Result<(), ReaderError> {
        let frame = u32::try_from(frame.min(self.info.nframes)).map_err(|_| {
            ReaderError::corrupt(format!("frame {frame} is beyond the WAV addressable range"))
        })?;
        self.reader.seek(frame)?;
        Ok(())
    }

    fn read_frames(&mut self, nframes: u64) -> Result<Frames, ReaderError> {
        let count = usize::try_from(nframes)
            .ok()
            .and_then(|n| n.checked_mul(self.info.nchannels))
            .unwrap_or(usize::MAX);
        let data = match self.info.dtype {
            SampleType::I8 => SampleData::I8(self.collect_shifted(count)?),
            SampleType::I16 => SampleData::I16(self.collect_shifted(count)?),
            SampleType::I32 => SampleData::I32(self.collect_shifted(count)?),
            SampleType::F32 => SampleData::F32(self.collect(count)?),
            other => {
                return Err(ReaderError::corrupt(format!(
                    "WAV segments cannot hold {other} samples"
                )));
            }
        };
        Frames::new(self.info.nchannels, data).map_err(|err| ReaderError::corrupt(err.to_string()))
    }
}

impl SegmentSource for WavSource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn open(&self) -> Result<Box<dyn SegmentHandle + '_>, ReaderError> {
        Ok(Box::new(WavHandle {
            reader: WavReader::open(&self.path)?,
            info: self.info,
            shift: self.shift,
        }))
    }
}
