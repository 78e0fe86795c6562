use std::ops::Range;

/// Closed range of scalar values, used for data ranges of volume components.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ValueRange {
    /// Lower bound
    pub low: f64,
    /// Upper bound
    pub high: f64,
}

impl ValueRange {
    /// Constructs new, empty range.
    pub fn empty() -> ValueRange {
        ValueRange {
            low: f64::NAN,
            high: f64::NAN,
        }
    }

    /// Constructs new range with one element, `val`.
    pub fn seed(val: f64) -> ValueRange {
        ValueRange {
            low: val,
            high: val,
        }
    }

    /// Constructs minimal range, where all samples from an iterator
    /// are inside the range.
    pub fn from_samples<T>(iter: impl IntoIterator<Item = T>) -> ValueRange
    where
        T: Into<f64>,
    {
        let mut range = ValueRange::empty();
        for val in iter {
            range.extend(val.into());
        }
        range
    }

    /// Extend the range with new value. NaN values are ignored.
    pub fn extend(&mut self, val: f64) {
        if val.is_nan() {
            return;
        }

        if self.is_empty() {
            self.low = val;
            self.high = val;
            return;
        }

        if val > self.high {
            self.high = val;
        }

        if val < self.low {
            self.low = val;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_nan() || self.high.is_nan()
    }

    /// Check if value is inside the range.
    pub fn contains(&self, val: f64) -> bool {
        self.low <= val && val <= self.high
    }

    /// `high - low`, zero for empty ranges
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.high - self.low
        }
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::empty()
    }
}

/// Conversion from standard library type.
/// Unlocks simple syntax:
/// ```
/// # use fp_raycaster::common::ValueRange;
/// let range: ValueRange = (0.0..45.5).into();
/// ```
impl From<Range<f64>> for ValueRange {
    fn from(range: Range<f64>) -> Self {
        ValueRange {
            low: range.start,
            high: range.end,
        }
    }
}
