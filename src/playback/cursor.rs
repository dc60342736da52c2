//! Monotonic cursor over a time-ordered recording.

use crate::core::types::Timestamped;
use crate::error::{RepeatError, Result};

/// Forward-only lookup into a recorded, time-sorted sequence.
///
/// The cursor is an explicit index that only ever moves forward. Query
/// times are expected to be non-decreasing; an earlier query returns the
/// element the cursor already reached (too far ahead) and is counted in
/// [`out_of_order_queries`](Self::out_of_order_queries).
#[derive(Debug, Clone)]
pub struct CursorSampler<T> {
    name: &'static str,
    items: Vec<Timestamped<T>>,
    cursor: usize,
    last_query_us: u64,
    out_of_order: u64,
}

impl<T> CursorSampler<T> {
    /// Create a sampler over `items`, which must be sorted by timestamp.
    ///
    /// An empty sequence is a configuration error.
    pub fn new(name: &'static str, items: Vec<Timestamped<T>>) -> Result<Self> {
        if items.is_empty() {
            return Err(RepeatError::Config(format!(
                "Recorded {} sequence is empty",
                name
            )));
        }

        Ok(Self {
            name,
            items,
            cursor: 0,
            last_query_us: 0,
            out_of_order: 0,
        })
    }

    /// Advance while the element under the cursor is earlier than
    /// `query_us + lookahead_us` and is not the last one, then return it.
    pub fn advance_and_get(&mut self, query_us: u64, lookahead_us: u64) -> &T {
        if query_us < self.last_query_us {
            self.out_of_order += 1;
            if self.out_of_order == 1 {
                tracing::warn!(
                    "{} cursor queried backwards ({}us after {}us); returning a later sample",
                    self.name,
                    query_us,
                    self.last_query_us
                );
            }
        } else {
            self.last_query_us = query_us;
        }

        let target = query_us.saturating_add(lookahead_us);
        let last = self.items.len() - 1;
        while self.cursor < last && self.items[self.cursor].timestamp_us < target {
            self.cursor += 1;
        }

        &self.items[self.cursor].data
    }

    /// Element under the cursor, without advancing.
    pub fn current(&self) -> &Timestamped<T> {
        &self.items[self.cursor]
    }

    /// Cursor index.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Number of recorded elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; an empty sampler cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True once the cursor rests on the last element.
    pub fn is_exhausted(&self) -> bool {
        self.cursor + 1 >= self.items.len()
    }

    /// Number of queries that went backwards in time.
    pub fn out_of_order_queries(&self) -> u64 {
        self.out_of_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speeds() -> CursorSampler<f32> {
        CursorSampler::new(
            "command",
            vec![
                Timestamped::from_secs(1.0, 0.0),
                Timestamped::from_secs(2.0, 1.0),
                Timestamped::from_secs(3.0, 2.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_sequence_is_config_error() {
        let result = CursorSampler::<f32>::new("command", Vec::new());
        assert!(matches!(result, Err(RepeatError::Config(_))));
    }

    #[test]
    fn test_first_element_before_any_time_passes() {
        let mut sampler = speeds();
        assert_eq!(*sampler.advance_and_get(0, 0), 1.0);
        assert_eq!(sampler.position(), 0);
    }

    #[test]
    fn test_strict_comparison_stops_on_equal_timestamp() {
        let mut sampler = speeds();
        // t=0 < 1.0 advances; t=1 is not < 1.0, stops there.
        assert_eq!(*sampler.advance_and_get(1_000_000, 0), 2.0);
        assert_eq!(sampler.position(), 1);
    }

    #[test]
    fn test_lookahead_moves_cursor_further() {
        let mut sampler = speeds();
        // query 0.6s + 0.5s = 1.1s: passes t=0 and t=1, ends on the last element.
        assert_eq!(*sampler.advance_and_get(600_000, 500_000), 3.0);
        assert!(sampler.is_exhausted());
    }

    #[test]
    fn test_never_moves_past_last_element() {
        let mut sampler = speeds();
        assert_eq!(*sampler.advance_and_get(99_000_000, 0), 3.0);
        assert_eq!(sampler.position(), 2);
    }

    #[test]
    fn test_backwards_query_returns_stale_sample() {
        let mut sampler = speeds();
        sampler.advance_and_get(1_500_000, 0);
        assert_eq!(sampler.position(), 2);

        assert_eq!(*sampler.advance_and_get(100_000, 0), 3.0);
        assert_eq!(sampler.position(), 2);
        assert_eq!(sampler.out_of_order_queries(), 1);
    }

    #[test]
    fn test_cursor_is_monotonic_over_increasing_queries() {
        let mut sampler = speeds();
        let mut previous = 0;
        for query in (0..30).map(|i| i * 100_000) {
            sampler.advance_and_get(query, 0);
            assert!(sampler.position() >= previous);
            previous = sampler.position();
        }
        assert_eq!(sampler.out_of_order_queries(), 0);
    }
}
