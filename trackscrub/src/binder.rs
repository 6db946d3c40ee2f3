//! Fans a resolved cursor sample out to named view-update functions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::series::{RangePolicy, Sample, TimeSeries};
use crate::TrackError;

type ViewFn<T, C> = Box<dyn FnMut(&mut C, &Sample<T>)>;

struct ViewBinding<T, C> {
    name: String,
    update: ViewFn<T, C>,
}

/// Typed observer list for one cursor over one series.
///
/// Views receive the context `C` explicitly (map, chart, ...) together
/// with the resolved sample. They run in registration order.
pub struct CursorBinder<T, C> {
    series: Arc<TimeSeries<T>>,
    policy: RangePolicy,
    views: Vec<ViewBinding<T, C>>,
    cursor: Option<DateTime<Utc>>,
}

impl<T, C> CursorBinder<T, C> {
    pub fn new(series: Arc<TimeSeries<T>>, policy: RangePolicy) -> Self {
        Self {
            series,
            policy,
            views: Vec::new(),
            cursor: None,
        }
    }

    pub fn series(&self) -> &TimeSeries<T> {
        &self.series
    }

    pub fn policy(&self) -> RangePolicy {
        self.policy
    }

    /// Last cursor value that was successfully resolved.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    pub fn bind_view<F>(&mut self, name: impl Into<String>, update: F)
    where
        F: FnMut(&mut C, &Sample<T>) + 'static,
    {
        self.views.push(ViewBinding {
            name: name.into(),
            update: Box::new(update),
        });
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.iter().map(|v| v.name.as_str())
    }

    /// Resolves `query` once and hands the same sample to every view.
    pub fn scrub(&mut self, ctx: &mut C, query: DateTime<Utc>) -> Result<&Sample<T>, TrackError> {
        let sample = self.series.resolve_with(query, self.policy)?;
        for view in &mut self.views {
            trace!(view = %view.name, index = sample.index, "updating view");
            (view.update)(ctx, sample);
        }
        self.cursor = Some(query);
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::at;

    #[derive(Default)]
    struct Log {
        calls: Vec<(String, usize, char)>,
    }

    fn binder() -> CursorBinder<char, Log> {
        let series = TimeSeries::new(vec![(at(0), 'a'), (at(10), 'b'), (at(20), 'c')]).unwrap();
        CursorBinder::new(Arc::new(series), RangePolicy::Clamp)
    }

    #[test]
    fn every_view_sees_the_same_sample_once() {
        let mut binder = binder();
        binder.bind_view("place", |log: &mut Log, s: &Sample<char>| {
            log.calls.push(("place".into(), s.index, s.value));
        });
        binder.bind_view("heart", |log: &mut Log, s: &Sample<char>| {
            log.calls.push(("heart".into(), s.index, s.value));
        });

        let mut log = Log::default();
        let resolved = binder.scrub(&mut log, at(15)).unwrap().value;
        assert_eq!(resolved, 'b');
        assert_eq!(
            log.calls,
            vec![("place".into(), 1, 'b'), ("heart".into(), 1, 'b')]
        );
        assert_eq!(binder.cursor(), Some(at(15)));
        assert_eq!(binder.view_names().collect::<Vec<_>>(), vec!["place", "heart"]);
    }

    #[test]
    fn strict_binder_skips_views_when_out_of_range() {
        let series = TimeSeries::new(vec![(at(0), 'a'), (at(10), 'b')]).unwrap();
        let mut binder: CursorBinder<char, Log> =
            CursorBinder::new(Arc::new(series), RangePolicy::Strict);
        binder.bind_view("place", |log: &mut Log, s: &Sample<char>| {
            log.calls.push(("place".into(), s.index, s.value));
        });
        let mut log = Log::default();
        assert!(binder.scrub(&mut log, at(11)).is_err());
        assert!(log.calls.is_empty());
        assert_eq!(binder.cursor(), None);
    }

    #[test]
    fn views_can_keep_state() {
        let mut binder = binder();
        let mut seen = 0usize;
        binder.bind_view("counter", move |log: &mut Log, s: &Sample<char>| {
            seen += 1;
            log.calls.push((seen.to_string(), s.index, s.value));
        });
        let mut log = Log::default();
        binder.scrub(&mut log, at(0)).unwrap();
        binder.scrub(&mut log, at(25)).unwrap();
        assert_eq!(log.calls[1], ("2".into(), 2, 'c'));
    }
}
