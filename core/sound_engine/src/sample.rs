use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SoundError, SoundResult};

/// Element type of stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    U8,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl SampleType {
    pub const fn bits(self) -> u32 {
        match self {
            Self::U8 | Self::I8 => 8,
            Self::I16 => 16,
            Self::I32 | Self::F32 => 32,
            Self::F64 => 64,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Whether every value of `self` is exactly representable in `target`.
    ///
    /// Allowed: identity, `u8`/`i8` to `i16`, `i32`, `f32`, `f64`; `i16` to
    /// `i32`, `f32`, `f64`; `i32` to `f64`; `f32` to `f64`. Anything else would
    /// lose range or precision and has to go through normalization instead.
    pub const fn can_cast_to(self, target: Self) -> bool {
        use SampleType::{F32, F64, I8, I16, I32, U8};
        matches!(
            (self, target),
            (U8, U8)
                | (I8, I8)
                | (I16, I16)
                | (I32, I32)
                | (F32, F32)
                | (F64, F64)
                | (U8 | I8, I16 | I32 | F32 | F64)
                | (I16, I32 | F32 | F64)
                | (I32 | F32, F64)
        )
    }

    /// Scale a stored integer value to audio float range `[-1.0, 1.0)`.
    /// `u8` is offset binary around 128.
    pub fn normalize(self, value: f64) -> f64 {
        match self {
            Self::U8 => (value - 128.0) / 128.0,
            Self::I8 => value / 128.0,
            Self::I16 => value / 32_768.0,
            Self::I32 => value / 2_147_483_648.0,
            Self::F32 | Self::F64 => value,
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A primitive sample element.
pub trait Sample: Copy + Default + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const TYPE: SampleType;

    fn to_f64(self) -> f64;

    /// Saturating conversion from `f64`; exact for values that came from a
    /// type with [`SampleType::can_cast_to`] `Self`.
    fn from_f64(value: f64) -> Self;

    fn into_data(samples: Vec<Self>) -> SampleData;

    fn from_data(data: &SampleData) -> Option<&[Self]>;
}

/// Interleaved samples of one element type.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! impl_sample {
    ($ty:ty, $variant:ident) => {
        impl Sample for $ty {
            const TYPE: SampleType = SampleType::$variant;

            fn to_f64(self) -> f64 {
                f64::from(self)
            }

            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            fn into_data(samples: Vec<Self>) -> SampleData {
                SampleData::$variant(samples)
            }

            fn from_data(data: &SampleData) -> Option<&[Self]> {
                match data {
                    SampleData::$variant(samples) => Some(samples),
                    _ => None,
                }
            }
        }
    };
}

impl_sample!(u8, U8);
impl_sample!(i8, I8);
impl_sample!(i16, I16);
impl_sample!(i32, I32);
impl_sample!(f32, F32);
impl_sample!(f64, F64);

/// Run `$body` with `$v` bound to the vector inside any `SampleData` variant.
macro_rules! with_samples {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            SampleData::U8($v) => $body,
            SampleData::I8($v) => $body,
            SampleData::I16($v) => $body,
            SampleData::I32($v) => $body,
            SampleData::F32($v) => $body,
            SampleData::F64($v) => $body,
        }
    };
}

impl SampleData {
    pub fn empty(dtype: SampleType, capacity: usize) -> Self {
        match dtype {
            SampleType::U8 => Self::U8(Vec::with_capacity(capacity)),
            SampleType::I8 => Self::I8(Vec::with_capacity(capacity)),
            SampleType::I16 => Self::I16(Vec::with_capacity(capacity)),
            SampleType::I32 => Self::I32(Vec::with_capacity(capacity)),
            SampleType::F32 => Self::F32(Vec::with_capacity(capacity)),
            SampleType::F64 => Self::F64(Vec::with_capacity(capacity)),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::U8(_) => SampleType::U8,
            Self::I8(_) => SampleType::I8,
            Self::I16(_) => SampleType::I16,
            Self::I32(_) => SampleType::I32,
            Self::F32(_) => SampleType::F32,
            Self::F64(_) => SampleType::F64,
        }
    }

    pub fn len(&self) -> usize {
        with_samples!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        with_samples!(self, v => v.get(index).map(|&x| x.to_f64()))
    }

    fn push_zeros(&mut self, count: usize) {
        with_samples!(self, v => v.resize(v.len() + count, Default::default()));
    }

    fn extend(&mut self, other: &Self) -> SoundResult<()> {
        match (self, other) {
            (Self::U8(a), Self::U8(b)) => a.extend_from_slice(b),
            (Self::I8(a), Self::I8(b)) => a.extend_from_slice(b),
            (Self::I16(a), Self::I16(b)) => a.extend_from_slice(b),
            (Self::I32(a), Self::I32(b)) => a.extend_from_slice(b),
            (Self::F32(a), Self::F32(b)) => a.extend_from_slice(b),
            (Self::F64(a), Self::F64(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(SoundError::dtype(format!(
                    "cannot append {} samples to {} samples",
                    b.sample_type(),
                    a.sample_type()
                )));
            }
        }
        Ok(())
    }

    fn gather(&self, indices: impl Iterator<Item = usize>) -> Self {
        with_samples!(self, v => {
            let picked: Vec<_> = indices.map(|i| v[i]).collect();
            Sample::into_data(picked)
        })
    }

    fn map_into<T: Sample>(&self, f: impl Fn(f64) -> f64) -> Vec<T> {
        with_samples!(self, v => v.iter().map(|&x| T::from_f64(f(x.to_f64()))).collect())
    }

    fn convert(&self, target: SampleType, f: impl Fn(f64) -> f64) -> Self {
        match target {
            SampleType::U8 => Self::U8(self.map_into(f)),
            SampleType::I8 => Self::I8(self.map_into(f)),
            SampleType::I16 => Self::I16(self.map_into(f)),
            SampleType::I32 => Self::I32(self.map_into(f)),
            SampleType::F32 => Self::F32(self.map_into(f)),
            SampleType::F64 => Self::F64(self.map_into(f)),
        }
    }
}

/// An in-memory block of `nframes x nchannels` samples, interleaved by frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frames {
    nchannels: usize,
    data: SampleData,
}

impl Frames {
    pub fn new(nchannels: usize, data: SampleData) -> SoundResult<Self> {
        if nchannels == 0 {
            return Err(SoundError::consistency("frames need at least one channel"));
        }
        if data.len() % nchannels != 0 {
            return Err(SoundError::consistency(format!(
                "{} samples do not split into whole frames of {nchannels} channels",
                data.len()
            )));
        }
        Ok(Self { nchannels, data })
    }

    pub fn from_samples<T: Sample>(nchannels: usize, samples: Vec<T>) -> SoundResult<Self> {
        Self::new(nchannels, T::into_data(samples))
    }

    /// A buffer of `nframes` zero-valued frames.
    pub fn zeros(dtype: SampleType, nframes: usize, nchannels: usize) -> Self {
        let mut frames = Self::with_capacity(dtype, nframes, nchannels);
        frames.push_zeros(nframes);
        frames
    }

    /// An empty buffer with room for `nframes` frames.
    pub fn with_capacity(dtype: SampleType, nframes: usize, nchannels: usize) -> Self {
        Self {
            nchannels: nchannels.max(1),
            data: SampleData::empty(dtype, nframes * nchannels),
        }
    }

    pub fn nframes(&self) -> usize {
        self.data.len() / self.nchannels
    }

    pub fn nchannels(&self) -> usize {
        self.nchannels
    }

    pub fn dtype(&self) -> SampleType {
        self.data.sample_type()
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn into_data(self) -> SampleData {
        self.data
    }

    /// Interleaved samples, if they are of type `T`.
    pub fn samples<T: Sample>(&self) -> Option<&[T]> {
        T::from_data(&self.data)
    }

    pub fn value(&self, frame: usize, channel: usize) -> Option<f64> {
        if channel >= self.nchannels {
            return None;
        }
        self.data.value(frame * self.nchannels + channel)
    }

    /// Call `f(channel, value)` for every sample in frame order.
    pub fn for_each_value(&self, mut f: impl FnMut(usize, f64)) {
        let nchannels = self.nchannels;
        with_samples!(&self.data, v => {
            for (i, &x) in v.iter().enumerate() {
                f(i % nchannels, x.to_f64());
            }
        });
    }

    pub fn push_zeros(&mut self, nframes: usize) {
        self.data.push_zeros(nframes * self.nchannels);
    }

    pub fn append(&mut self, other: &Self) -> SoundResult<()> {
        if other.nchannels != self.nchannels {
            return Err(SoundError::consistency(format!(
                "cannot append {}-channel frames to {}-channel frames",
                other.nchannels, self.nchannels
            )));
        }
        self.data.extend(&other.data)
    }

    /// Copy of frames `[start, end)`, clamped to the available frames.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.nframes());
        let start = start.min(end);
        let nchannels = self.nchannels;
        Self {
            nchannels,
            data: self.data.gather(start * nchannels..end * nchannels),
        }
    }

    /// Copy holding only `channels`, in the given order.
    pub fn select_channels(&self, channels: &[usize]) -> SoundResult<Self> {
        if let Some(&bad) = channels.iter().find(|&&c| c >= self.nchannels) {
            return Err(SoundError::range(format!(
                "channel {bad} does not exist in {}-channel frames",
                self.nchannels
            )));
        }
        let nchannels = self.nchannels;
        let indices = (0..self.nframes())
            .flat_map(|frame| channels.iter().map(move |&c| frame * nchannels + c));
        Self::new(channels.len(), self.data.gather(indices))
    }

    /// Lossless conversion to `target`; see [`SampleType::can_cast_to`].
    pub fn cast(&self, target: SampleType) -> SoundResult<Self> {
        let dtype = self.dtype();
        if dtype == target {
            return Ok(self.clone());
        }
        if !dtype.can_cast_to(target) {
            return Err(SoundError::dtype(format!(
                "{dtype} samples cannot be converted to {target} without loss"
            )));
        }
        Ok(Self {
            nchannels: self.nchannels,
            data: self.data.convert(target, |x| x),
        })
    }

    /// Scale integer samples to audio float range in `target` (`f32` or `f64`).
    pub fn normalized(&self, target: SampleType) -> SoundResult<Self> {
        let dtype = self.dtype();
        if dtype.is_float() {
            return Err(SoundError::dtype(format!(
                "normalization applies to integer samples, these are {dtype}"
            )));
        }
        if !target.is_float() {
            return Err(SoundError::dtype(format!(
                "normalized samples must be f32 or f64, not {target}"
            )));
        }
        Ok(Self {
            nchannels: self.nchannels,
            data: self.data.convert(target, |x| dtype.normalize(x)),
        })
    }
}
