use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::Emotion;

/// Samples kept after a query when no other bound is configured.
pub const DEFAULT_RETENTION: usize = 20;

/// Dominant emotion over the samples seen at query time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub emotion: Emotion,
    /// Share of samples matching `emotion`, as a percentage.
    pub confidence: f64,
    pub total_detections: usize,
    /// Number of samples matching `emotion`.
    #[serde(skip)]
    pub count: usize,
}

impl Aggregate {
    /// Answer given before anything has been recorded.
    pub const COLD: Aggregate = Aggregate {
        emotion: Emotion::Neutral,
        confidence: 100.0,
        total_detections: 0,
        count: 0,
    };

    fn of(samples: &VecDeque<Emotion>) -> Self {
        if samples.is_empty() {
            return Self::COLD;
        }
        let mut counts = [0usize; Emotion::ALL.len()];
        for emotion in samples {
            counts[emotion.index()] += 1;
        }
        // Strictly greater keeps the earlier, alphabetically smaller label on ties.
        let mut mode = Emotion::ALL[0];
        for emotion in Emotion::ALL {
            if counts[emotion.index()] > counts[mode.index()] {
                mode = emotion;
            }
        }
        let count = counts[mode.index()];
        let total = samples.len();
        Self {
            emotion: mode,
            confidence: (count * 100) as f64 / total as f64,
            total_detections: total,
            count,
        }
    }
}

/// Shared tally of recently classified emotions.
///
/// Recording only appends. The tally is trimmed back to its retention bound
/// when [`query`](Self::query) reads it, so between queries it may hold more
/// than `retention` samples.
///
/// ```
/// use emotion::{Emotion, EmotionTally};
/// let tally = EmotionTally::new(20);
/// tally.record(Emotion::Happy);
/// tally.record(Emotion::Happy);
/// tally.record(Emotion::Angry);
/// let agg = tally.query();
/// assert_eq!(agg.emotion, Emotion::Happy);
/// assert_eq!(agg.total_detections, 3);
/// ```
#[derive(Debug)]
pub struct EmotionTally {
    samples: Mutex<VecDeque<Emotion>>,
    retention: usize,
}

impl EmotionTally {
    /// Create an empty tally that keeps at most `retention` samples after
    /// each query.
    pub fn new(retention: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(retention)),
            retention,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Append one classified sample.
    pub fn record(&self, emotion: Emotion) {
        self.lock().push_back(emotion);
    }

    /// Compute the dominant emotion, then drop all but the newest
    /// `retention` samples.
    ///
    /// The returned total counts the samples present before trimming.
    pub fn query(&self) -> Aggregate {
        let mut samples = self.lock();
        let aggregate = Aggregate::of(&samples);
        let excess = samples.len().saturating_sub(self.retention);
        if excess > 0 {
            samples.drain(..excess);
            tracing::trace!(evicted = excess, kept = samples.len(), "tally trimmed");
        }
        aggregate
    }

    /// Like [`query`](Self::query) but leaves the samples untouched.
    pub fn peek(&self) -> Aggregate {
        Aggregate::of(&self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Emotion>> {
        // Appends and drains cannot leave the deque half-written.
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EmotionTally {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record_n(tally: &EmotionTally, emotion: Emotion, n: usize) {
        for _ in 0..n {
            tally.record(emotion);
        }
    }

    #[test]
    fn empty_tally_is_neutral() {
        let tally = EmotionTally::default();
        let agg = tally.query();
        assert_eq!(agg.emotion, Emotion::Neutral);
        assert_eq!(agg.confidence, 100.0);
        assert_eq!(agg.total_detections, 0);
    }

    #[test]
    fn mode_and_confidence() {
        let tally = EmotionTally::default();
        record_n(&tally, Emotion::Happy, 15);
        record_n(&tally, Emotion::Angry, 5);
        let agg = tally.query();
        assert_eq!(agg.emotion, Emotion::Happy);
        assert_eq!(agg.confidence, 75.0);
        assert_eq!(agg.total_detections, 20);
        assert_eq!(agg.count, 15);
        assert_eq!(tally.len(), 20);
    }

    #[test]
    fn query_reports_before_trimming() {
        let tally = EmotionTally::default();
        record_n(&tally, Emotion::Angry, 10);
        record_n(&tally, Emotion::Neutral, 15);
        let first = tally.query();
        assert_eq!(first.total_detections, 25);
        assert_eq!(first.emotion, Emotion::Neutral);
        assert_eq!(first.confidence, 60.0);
        assert_eq!(tally.len(), 20);

        // Oldest five angry samples were dropped.
        let second = tally.query();
        assert_eq!(second.total_detections, 20);
        assert_eq!(second.count, 15);
        assert_eq!(second.confidence, 75.0);
    }

    #[test]
    fn repeated_query_is_stable() {
        let tally = EmotionTally::default();
        record_n(&tally, Emotion::Happy, 30);
        record_n(&tally, Emotion::Angry, 3);
        tally.query();
        let a = tally.query();
        let b = tally.query();
        assert_eq!(a, b);
    }

    #[test]
    fn ties_resolve_to_smaller_label() {
        let tally = EmotionTally::default();
        record_n(&tally, Emotion::Neutral, 4);
        record_n(&tally, Emotion::Happy, 4);
        assert_eq!(tally.query().emotion, Emotion::Happy);

        record_n(&tally, Emotion::Angry, 4);
        assert_eq!(tally.query().emotion, Emotion::Angry);
    }

    #[test]
    fn length_bounded_after_every_query() {
        let tally = EmotionTally::new(5);
        for round in 0..12 {
            for i in 0..round {
                tally.record(Emotion::ALL[i % 3]);
            }
            let agg = tally.query();
            assert!(agg.confidence > 0.0 && agg.confidence <= 100.0);
            assert!(tally.len() <= 5);
        }
    }

    #[test]
    fn peek_does_not_evict() {
        let tally = EmotionTally::new(2);
        record_n(&tally, Emotion::Happy, 4);
        assert_eq!(tally.peek().total_detections, 4);
        assert_eq!(tally.len(), 4);
        tally.query();
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn concurrent_record_and_query() {
        let tally = Arc::new(EmotionTally::default());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let tally = tally.clone();
                std::thread::spawn(move || record_n(&tally, Emotion::Happy, 500))
            })
            .collect();
        for _ in 0..100 {
            let agg = tally.query();
            if agg.total_detections > 0 {
                assert_eq!(agg.emotion, Emotion::Happy);
            }
        }
        for w in writers {
            w.join().unwrap();
        }
        assert_eq!(tally.peek().total_detections, tally.len());
        tally.query();
        assert!(tally.len() <= 20);
    }
}
