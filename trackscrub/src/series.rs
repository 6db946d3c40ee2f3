//! Ordered, timestamp-keyed series with nearest-preceding lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scale::TimeDomain;
use crate::TrackError;

/// One entry of a [`TimeSeries`]. `index` is the position of the source
/// sample, shared by every series derived from the same track.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sample<T> {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub value: T,
}

/// What `resolve_with` does with a cursor outside the series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    /// Snap to the first or last sample.
    #[default]
    Clamp,
    /// Report [`TrackError::OutOfRange`].
    Strict,
}

#[derive(Clone, Debug)]
pub struct TimeSeries<T> {
    samples: Vec<Sample<T>>,
}

impl<T> TimeSeries<T> {
    /// Builds a series from `(timestamp, value)` pairs that are already in
    /// non-decreasing timestamp order. Nothing is sorted here.
    pub fn new<I>(entries: I) -> Result<Self, TrackError>
    where
        I: IntoIterator<Item = (DateTime<Utc>, T)>,
    {
        let series = Self::from_sorted(entries);
        if series.samples.is_empty() {
            return Err(TrackError::InvalidInput(
                "time series requires at least one sample".into(),
            ));
        }
        if let Some(pos) = series
            .samples
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(TrackError::InvalidInput(format!(
                "timestamps out of order at index {}: {} follows {}",
                pos + 1,
                series.samples[pos + 1].timestamp.to_rfc3339(),
                series.samples[pos].timestamp.to_rfc3339()
            )));
        }
        Ok(series)
    }

    /// Callers guarantee a non-empty, ordered input (a validated `Track`).
    pub(crate) fn from_sorted<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, T)>,
    {
        let samples = entries
            .into_iter()
            .enumerate()
            .map(|(index, (timestamp, value))| Sample {
                index,
                timestamp,
                value,
            })
            .collect();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample<T>> {
        self.samples.get(index)
    }

    pub fn first(&self) -> &Sample<T> {
        &self.samples[0]
    }

    pub fn last(&self) -> &Sample<T> {
        &self.samples[self.samples.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample<T>> {
        self.samples.iter()
    }

    pub fn domain(&self) -> TimeDomain {
        TimeDomain::new(self.first().timestamp, self.last().timestamp)
    }

    /// Projects every value, keeping timestamps and indices.
    pub fn map<U, F>(&self, mut f: F) -> TimeSeries<U>
    where
        F: FnMut(&T) -> U,
    {
        TimeSeries {
            samples: self
                .samples
                .iter()
                .map(|s| Sample {
                    index: s.index,
                    timestamp: s.timestamp,
                    value: f(&s.value),
                })
                .collect(),
        }
    }

    /// Index of the last sample not later than `query`, clamped to the
    /// first sample. Among equal timestamps the earliest one wins.
    pub fn resolve_index(&self, query: DateTime<Utc>) -> usize {
        let upper = self.samples.partition_point(|s| s.timestamp <= query);
        if upper == 0 {
            return 0;
        }
        let hit = self.samples[upper - 1].timestamp;
        self.samples[..upper].partition_point(|s| s.timestamp < hit)
    }

    pub fn resolve(&self, query: DateTime<Utc>) -> &Sample<T> {
        &self.samples[self.resolve_index(query)]
    }

    pub fn resolve_with(
        &self,
        query: DateTime<Utc>,
        policy: RangePolicy,
    ) -> Result<&Sample<T>, TrackError> {
        if policy == RangePolicy::Strict {
            let domain = self.domain();
            if !domain.contains(query) {
                return Err(TrackError::OutOfRange {
                    query,
                    start: domain.start,
                    end: domain.end,
                });
            }
        }
        Ok(self.resolve(query))
    }
}

impl<'a, T> IntoIterator for &'a TimeSeries<T> {
    type Item = &'a Sample<T>;
    type IntoIter = std::slice::Iter<'a, Sample<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::at;
    use chrono::Duration;

    fn abc() -> TimeSeries<char> {
        TimeSeries::new(vec![(at(0), 'a'), (at(10), 'b'), (at(20), 'c')]).unwrap()
    }

    #[test]
    fn empty_input_is_invalid() {
        let result = TimeSeries::<u8>::new(Vec::new());
        assert!(matches!(result, Err(TrackError::InvalidInput(_))));
    }

    #[test]
    fn out_of_order_input_is_invalid() {
        let result = TimeSeries::new(vec![(at(0), 1), (at(20), 2), (at(10), 3)]);
        match result {
            Err(TrackError::InvalidInput(msg)) => assert!(msg.contains("index 2")),
            other => panic!("expected InvalidInput, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn exact_match_returns_matching_entry() {
        let series = abc();
        let hit = series.resolve(at(10));
        assert_eq!((hit.timestamp, hit.value), (at(10), 'b'));
    }

    #[test]
    fn between_samples_returns_preceding_entry() {
        let series = abc();
        assert_eq!(series.resolve(at(10) - Duration::milliseconds(1)).value, 'a');
        assert_eq!(series.resolve(at(15)).value, 'b');
    }

    #[test]
    fn outside_range_clamps() {
        let series = abc();
        assert_eq!(series.resolve(at(120)).value, 'c');
        assert_eq!(series.resolve(at(-5)).value, 'a');
    }

    #[test]
    fn strict_policy_reports_out_of_range() {
        let series = abc();
        let err = series.resolve_with(at(21), RangePolicy::Strict).unwrap_err();
        assert!(matches!(err, TrackError::OutOfRange { .. }));
        assert!(series.resolve_with(at(-1), RangePolicy::Strict).is_err());
        assert_eq!(series.resolve_with(at(20), RangePolicy::Strict).unwrap().value, 'c');
        assert_eq!(series.resolve_with(at(21), RangePolicy::Clamp).unwrap().value, 'c');
    }

    #[test]
    fn equal_timestamps_resolve_to_earliest() {
        let series =
            TimeSeries::new(vec![(at(0), 'a'), (at(10), 'b'), (at(10), 'x'), (at(20), 'c')])
                .unwrap();
        assert_eq!(series.resolve(at(10)).value, 'b');
        assert_eq!(series.resolve(at(15)).value, 'b');
        assert_eq!(series.resolve_index(at(15)), 1);
    }

    #[test]
    fn resolve_is_repeatable() {
        let series = abc();
        let first = series.resolve(at(13));
        for _ in 0..10 {
            assert!(std::ptr::eq(first, series.resolve(at(13))));
        }
    }

    #[test]
    fn single_sample_series_answers_everything() {
        let series = TimeSeries::new(vec![(at(5), 42)]).unwrap();
        assert_eq!(series.resolve(at(0)).value, 42);
        assert_eq!(series.resolve(at(500)).value, 42);
        assert_eq!(series.domain().start, series.domain().end);
    }

    #[test]
    fn map_preserves_positions() {
        let series = abc();
        let upper = series.map(|c| c.to_ascii_uppercase());
        assert_eq!(upper.resolve(at(10)).value, 'B');
        assert_eq!(upper.get(2).map(|s| s.index), Some(2));
    }
}
