use crate::error::{TimeAxisError, TimeAxisResult};

/// Window layout: `framesize` frames per window, advancing by `stepsize`
/// (defaults to `framesize`, i.e. no overlap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    framesize: u64,
    stepsize: Option<u64>,
    include_remainder: bool,
    first_framesize: Option<u64>,
}

impl WindowSpec {
    pub fn new(framesize: u64) -> Self {
        Self {
            framesize,
            stepsize: None,
            include_remainder: true,
            first_framesize: None,
        }
    }

    #[must_use]
    pub fn with_step(mut self, stepsize: u64) -> Self {
        self.stepsize = Some(stepsize);
        self
    }

    /// Whether a final window shorter than `framesize` is produced for the
    /// frames left over after the last full window. Defaults to `true`.
    #[must_use]
    pub fn include_remainder(mut self, include: bool) -> Self {
        self.include_remainder = include;
        self
    }

    /// Make the first window `first_framesize` frames long; regular windows
    /// follow from its end. A size of 0 means no special first window.
    #[must_use]
    pub fn with_first_framesize(mut self, first_framesize: u64) -> Self {
        self.first_framesize = (first_framesize > 0).then_some(first_framesize);
        self
    }

    pub fn framesize(&self) -> u64 {
        self.framesize
    }

    pub fn stepsize(&self) -> u64 {
        self.stepsize.unwrap_or(self.framesize)
    }

    /// Plan windows over `[startindex, endindex)` of a sequence of
    /// `totalsize` frames. Every call returns an independent sequence.
    pub fn plan(&self, totalsize: u64, startindex: u64, endindex: u64) -> TimeAxisResult<Windows> {
        if self.framesize == 0 {
            return Err(TimeAxisError::range("framesize should be at least 1"));
        }
        if self.stepsize() == 0 {
            return Err(TimeAxisError::range("stepsize should be at least 1"));
        }
        if startindex > endindex {
            return Err(TimeAxisError::range(format!(
                "startindex ({startindex}) higher than endindex ({endindex})"
            )));
        }
        if endindex > totalsize {
            return Err(TimeAxisError::range(format!(
                "endindex ({endindex}) higher than totalsize ({totalsize})"
            )));
        }
        let first_end = match self.first_framesize {
            Some(size) if size > endindex - startindex => {
                return Err(TimeAxisError::range(format!(
                    "first window ({size} frames) longer than the range ({} frames)",
                    endindex - startindex
                )));
            }
            Some(size) => Some(startindex + size),
            None => None,
        };

        Ok(Windows {
            next_start: startindex,
            covered: startindex,
            endindex,
            framesize: self.framesize,
            stepsize: self.stepsize(),
            include_remainder: self.include_remainder,
            first_end,
            done: startindex == endindex,
        })
    }
}

/// Lazily computed `(start, end)` window bounds.
#[derive(Debug, Clone)]
pub struct Windows {
    next_start: u64,
    /// End of the furthest window produced so far.
    covered: u64,
    endindex: u64,
    framesize: u64,
    stepsize: u64,
    include_remainder: bool,
    first_end: Option<u64>,
    done: bool,
}

impl Iterator for Windows {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(first_end) = self.first_end.take() {
            let start = self.next_start;
            self.next_start = first_end;
            self.covered = first_end;
            self.done = first_end == self.endindex;
            return Some((start, first_end));
        }

        let start = self.next_start;
        match start.checked_add(self.framesize) {
            Some(end) if end <= self.endindex => {
                self.next_start = start.saturating_add(self.stepsize);
                self.covered = end;
                Some((start, end))
            }
            _ => {
                self.done = true;
                (self.include_remainder && self.covered < self.endindex && start < self.endindex)
                    .then_some((start, self.endindex))
            }
        }
    }
}

impl std::iter::FusedIterator for Windows {}

#[cfg(test)]
mod window_tests {
    use super::*;

    fn collect(windows: Windows) -> Vec<(u64, u64)> {
        windows.collect()
    }

    #[test]
    fn test_remainder_window_is_appended() {
        let windows = WindowSpec::new(300).plan(1000, 0, 1000).unwrap();
        assert_eq!(
            collect(windows),
            vec![(0, 300), (300, 600), (600, 900), (900, 1000)]
        );
    }

    #[test]
    fn test_remainder_can_be_dropped() {
        let windows = WindowSpec::new(300)
            .include_remainder(false)
            .plan(1000, 0, 1000)
            .unwrap();
        assert_eq!(collect(windows), vec![(0, 300), (300, 600), (600, 900)]);
    }

    #[test]
    fn test_exact_fit_has_no_remainder() {
        let windows = WindowSpec::new(250).plan(1000, 0, 1000).unwrap();
        assert_eq!(collect(windows).len(), 4);
    }

    #[test]
    fn test_overlapping_windows() {
        let windows = WindowSpec::new(4).with_step(2).plan(10, 0, 10).unwrap();
        assert_eq!(collect(windows), vec![(0, 4), (2, 6), (4, 8), (6, 10)]);

        let windows = WindowSpec::new(4).with_step(2).plan(11, 0, 11).unwrap();
        assert_eq!(
            collect(windows),
            vec![(0, 4), (2, 6), (4, 8), (6, 10), (8, 11)]
        );
    }

    #[test]
    fn test_stepping_past_frames() {
        let windows = WindowSpec::new(2).with_step(3).plan(10, 0, 10).unwrap();
        assert_eq!(collect(windows), vec![(0, 2), (3, 5), (6, 8), (9, 10)]);
    }

    #[test]
    fn test_sub_range() {
        let windows = WindowSpec::new(100).plan(1000, 250, 480).unwrap();
        assert_eq!(collect(windows), vec![(250, 350), (350, 450), (450, 480)]);
    }

    #[test]
    fn test_window_larger_than_range() {
        let windows = WindowSpec::new(5000).plan(1000, 10, 20).unwrap();
        assert_eq!(collect(windows), vec![(10, 20)]);

        let windows = WindowSpec::new(5000)
            .include_remainder(false)
            .plan(1000, 10, 20)
            .unwrap();
        assert!(collect(windows).is_empty());
    }

    #[test]
    fn test_empty_range_yields_nothing() {
        let windows = WindowSpec::new(10).plan(100, 40, 40).unwrap();
        assert!(collect(windows).is_empty());
    }

    #[test]
    fn test_first_window() {
        let windows = WindowSpec::new(100)
            .with_first_framesize(30)
            .plan(1000, 0, 250)
            .unwrap();
        assert_eq!(collect(windows), vec![(0, 30), (30, 130), (130, 230), (230, 250)]);

        let whole = WindowSpec::new(100)
            .with_first_framesize(250)
            .plan(1000, 0, 250)
            .unwrap();
        assert_eq!(collect(whole), vec![(0, 250)]);
    }

    #[test]
    fn test_first_window_too_long() {
        let result = WindowSpec::new(100).with_first_framesize(300).plan(1000, 0, 250);
        assert!(matches!(result, Err(TimeAxisError::Range(_))));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(WindowSpec::new(0).plan(10, 0, 10).is_err());
        assert!(WindowSpec::new(2).with_step(0).plan(10, 0, 10).is_err());
        assert!(WindowSpec::new(2).plan(10, 6, 5).is_err());
        assert!(WindowSpec::new(2).plan(10, 0, 11).is_err());
    }

    #[test]
    fn test_plans_are_restartable() {
        let spec = WindowSpec::new(3);
        let first = collect(spec.plan(10, 0, 10).unwrap());
        let second = collect(spec.plan(10, 0, 10).unwrap());
        assert_eq!(first, second);

        let windows = spec.plan(10, 0, 10).unwrap();
        let cloned = windows.clone();
        assert_eq!(collect(windows), collect(cloned));
    }

    #[test]
    fn test_huge_totals_are_lazy() {
        let mut windows = WindowSpec::new(1 << 20).plan(u64::MAX, 0, u64::MAX).unwrap();
        assert_eq!(windows.next(), Some((0, 1 << 20)));
        assert_eq!(windows.next(), Some((1 << 20, 2 << 20)));
    }
}
