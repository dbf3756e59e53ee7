//! Traffic counters and the rating rule that weights them.

use std::fmt;

use serde::Serialize;

/// Counters for one direction, or both directions merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub bytes: u64,
    pub messages: u64,
    pub rated_messages: u64,
}

impl StatsSnapshot {
    /// Field-wise sum.
    pub fn merge(self, other: StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            bytes: self.bytes.saturating_add(other.bytes),
            messages: self.messages.saturating_add(other.messages),
            rated_messages: self.rated_messages.saturating_add(other.rated_messages),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == StatsSnapshot::default()
    }
}

/// What [`crate::Serializer::stats`] hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatsReport {
    Detailed {
        serialized: StatsSnapshot,
        unserialized: StatsSnapshot,
    },
    Merged(StatsSnapshot),
}

impl StatsReport {
    /// Both directions summed, whichever shape the report has.
    pub fn merged(&self) -> StatsSnapshot {
        match self {
            StatsReport::Detailed {
                serialized,
                unserialized,
            } => serialized.merge(*unserialized),
            StatsReport::Merged(snapshot) => *snapshot,
        }
    }
}

/// Accumulating counters for one direction of one serializer.
#[derive(Debug, Clone, Default)]
pub struct RatedStats {
    current: StatsSnapshot,
}

impl RatedStats {
    pub fn record(&mut self, bytes: usize, rated_messages: u64) {
        let current = &mut self.current;
        current.bytes = current.bytes.saturating_add(bytes as u64);
        current.messages = current.messages.saturating_add(1);
        current.rated_messages = current.rated_messages.saturating_add(rated_messages);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.current
    }

    pub fn messages(&self) -> u64 {
        self.current.messages
    }

    /// Return the counters and reset them to zero.
    pub fn take(&mut self) -> StatsSnapshot {
        std::mem::take(&mut self.current)
    }
}

/// Weighs one payload in rated messages.
pub trait RatingPolicy: Send + Sync + fmt::Debug {
    fn rate(&self, payload_bytes: usize, sub_messages: usize) -> u64;
}

/// One rated message per started `unit` bytes, and never fewer than the
/// number of messages in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRating {
    unit: usize,
}

impl SizeRating {
    /// A zero unit is treated as one byte.
    pub fn new(unit: usize) -> Self {
        Self { unit: unit.max(1) }
    }

    pub fn unit(&self) -> usize {
        self.unit
    }
}

impl RatingPolicy for SizeRating {
    fn rate(&self, payload_bytes: usize, sub_messages: usize) -> u64 {
        let by_size = payload_bytes.div_ceil(self.unit);
        by_size.max(sub_messages) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_rating_rounds_up_per_unit() {
        let rating = SizeRating::new(512);
        assert_eq!(rating.rate(1, 1), 1);
        assert_eq!(rating.rate(512, 1), 1);
        assert_eq!(rating.rate(513, 1), 2);
        assert_eq!(rating.rate(4096, 1), 8);
    }

    #[test]
    fn size_rating_counts_every_sub_message() {
        let rating = SizeRating::new(512);
        assert_eq!(rating.rate(100, 5), 5);
        assert_eq!(rating.rate(0, 0), 0);
        assert_eq!(SizeRating::new(0).unit(), 1);
    }

    #[test]
    fn take_drains_counters() {
        let mut stats = RatedStats::default();
        stats.record(100, 1);
        stats.record(700, 2);
        let snapshot = stats.take();
        assert_eq!(
            snapshot,
            StatsSnapshot {
                bytes: 800,
                messages: 2,
                rated_messages: 3
            }
        );
        assert!(stats.snapshot().is_empty());
    }

    #[test]
    fn merged_report_sums_directions() {
        let one = StatsSnapshot {
            bytes: 10,
            messages: 1,
            rated_messages: 1,
        };
        let report = StatsReport::Detailed {
            serialized: one,
            unserialized: one,
        };
        assert_eq!(report.merged().bytes, 20);
        assert_eq!(StatsReport::Merged(one).merged(), one);
    }
}
