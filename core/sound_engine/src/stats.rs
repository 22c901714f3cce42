//! Per-channel statistics computed in one streaming pass over an episode.
//!
//! Frames are read window by window, so memory use is bounded by the window
//! size regardless of the episode length. Values are the stored samples;
//! gaps count as zeros.

use log::debug;
use timebase::{Episode, WindowSpec};

use crate::{
    error::{SoundError, SoundResult},
    reader::{ChannelSelection, ReadOptions},
    sample::Frames,
    sound::LogicalSound,
};

fn check_width(what: &str, expected: usize, got: usize) -> SoundResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(SoundError::consistency(format!(
            "{what} accumulator tracks {expected} channel(s), got {got}"
        )))
    }
}

/// Running per-channel minimum and maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct Extremes {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Extremes {
    pub fn new(nchannels: usize) -> Self {
        Self {
            min: vec![f64::INFINITY; nchannels],
            max: vec![f64::NEG_INFINITY; nchannels],
        }
    }

    pub fn update(&mut self, frames: &Frames) -> SoundResult<()> {
        check_width("extremes", self.min.len(), frames.nchannels())?;
        frames.for_each_value(|channel, value| {
            self.min[channel] = self.min[channel].min(value);
            self.max[channel] = self.max[channel].max(value);
        });
        Ok(())
    }

    pub fn merge(&mut self, other: &Self) -> SoundResult<()> {
        check_width("extremes", self.min.len(), other.min.len())?;
        for (a, b) in self.min.iter_mut().zip(&other.min) {
            *a = a.min(*b);
        }
        for (a, b) in self.max.iter_mut().zip(&other.max) {
            *a = a.max(*b);
        }
        Ok(())
    }

    pub fn min(&self) -> &[f64] {
        &self.min
    }

    pub fn max(&self) -> &[f64] {
        &self.max
    }
}

/// Running per-channel `(sum, count)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningSum {
    sums: Vec<f64>,
    count: u64,
}

impl RunningSum {
    pub fn new(nchannels: usize) -> Self {
        Self {
            sums: vec![0.0; nchannels],
            count: 0,
        }
    }

    pub fn update(&mut self, frames: &Frames) -> SoundResult<()> {
        check_width("sum", self.sums.len(), frames.nchannels())?;
        frames.for_each_value(|channel, value| self.sums[channel] += value);
        self.count += frames.nframes() as u64;
        Ok(())
    }

    pub fn merge(&mut self, other: &Self) -> SoundResult<()> {
        check_width("sum", self.sums.len(), other.sums.len())?;
        for (a, b) in self.sums.iter_mut().zip(&other.sums) {
            *a += b;
        }
        self.count += other.count;
        Ok(())
    }

    pub fn mean(&self) -> Vec<f64> {
        let count = self.count as f64;
        self.sums.iter().map(|sum| sum / count).collect()
    }
}

/// Running per-channel `(sum of squares, count)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningSquares {
    sums: Vec<f64>,
    count: u64,
}

impl RunningSquares {
    pub fn new(nchannels: usize) -> Self {
        Self {
            sums: vec![0.0; nchannels],
            count: 0,
        }
    }

    pub fn update(&mut self, frames: &Frames) -> SoundResult<()> {
        check_width("sum of squares", self.sums.len(), frames.nchannels())?;
        frames.for_each_value(|channel, value| self.sums[channel] += value * value);
        self.count += frames.nframes() as u64;
        Ok(())
    }

    pub fn merge(&mut self, other: &Self) -> SoundResult<()> {
        check_width("sum of squares", self.sums.len(), other.sums.len())?;
        for (a, b) in self.sums.iter_mut().zip(&other.sums) {
            *a += b;
        }
        self.count += other.count;
        Ok(())
    }

    pub fn rms(&self) -> Vec<f64> {
        let count = self.count as f64;
        self.sums.iter().map(|sum| (sum / count).sqrt()).collect()
    }
}

/// Feed every window of `episode` to `update`. Only the frame size of
/// `windows` is used; windows never overlap and the remainder is included.
fn stream(
    sound: &LogicalSound,
    episode: &Episode,
    windows: Option<&WindowSpec>,
    channels: &ChannelSelection,
    mut update: impl FnMut(&Frames) -> SoundResult<()>,
) -> SoundResult<()> {
    if episode.is_empty() {
        return Err(SoundError::range(format!(
            "statistics need at least one frame, episode [{}, {}) is empty",
            episode.start(),
            episode.end()
        )));
    }
    let framesize = windows.map_or(sound.config().stats_framesize, WindowSpec::framesize);
    let spec = WindowSpec::new(framesize);
    let options = ReadOptions {
        channels: channels.clone(),
        ..ReadOptions::default()
    };

    let mut nwindows = 0;
    for block in sound.reader().iter_read(episode, &spec, &options)? {
        update(&block?.frames)?;
        nwindows += 1;
    }
    debug!(
        "streamed [{}, {}) in {nwindows} window(s) of up to {framesize} frames",
        episode.start(),
        episode.end()
    );
    Ok(())
}

pub fn minmax(
    sound: &LogicalSound,
    episode: &Episode,
    windows: Option<&WindowSpec>,
    channels: &ChannelSelection,
) -> SoundResult<(Vec<f64>, Vec<f64>)> {
    let nchannels = channels.indices(sound.nchannels())?.len();
    let mut extremes = Extremes::new(nchannels);
    stream(sound, episode, windows, channels, |frames| extremes.update(frames))?;
    Ok((extremes.min, extremes.max))
}

pub fn min(
    sound: &LogicalSound,
    episode: &Episode,
    windows: Option<&WindowSpec>,
    channels: &ChannelSelection,
) -> SoundResult<Vec<f64>> {
    minmax(sound, episode, windows, channels).map(|(min, _)| min)
}

pub fn max(
    sound: &LogicalSound,
    episode: &Episode,
    windows: Option<&WindowSpec>,
    channels: &ChannelSelection,
) -> SoundResult<Vec<f64>> {
    minmax(sound, episode, windows, channels).map(|(_, max)| max)
}

pub fn mean(
    sound: &LogicalSound,
    episode: &Episode,
    windows: Option<&WindowSpec>,
    channels: &ChannelSelection,
) -> SoundResult<Vec<f64>> {
    let nchannels = channels.indices(sound.nchannels())?.len();
    let mut sum = RunningSum::new(nchannels);
    stream(sound, episode, windows, channels, |frames| sum.update(frames))?;
    Ok(sum.mean())
}

pub fn rms(
    sound: &LogicalSound,
    episode: &Episode,
    windows: Option<&WindowSpec>,
    channels: &ChannelSelection,
) -> SoundResult<Vec<f64>> {
    let nchannels = channels.indices(sound.nchannels())?.len();
    let mut squares = RunningSquares::new(nchannels);
    stream(sound, episode, windows, channels, |frames| squares.update(frames))?;
    Ok(squares.rms())
}
