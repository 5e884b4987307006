use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Where a busy interval came from. Local bookings get a synthetic source so
/// the merged set can still tell ledger conflicts apart from calendar ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BusySource {
    Calendar(String),
    Booking,
}

/// A half-open busy interval `[start_time, end_time)` reported by an external
/// calendar or derived from a non-cancelled local booking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyBlock {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub source: BusySource,
}

impl BusyBlock {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, source: BusySource) -> Self {
        Self {
            start_time,
            end_time,
            source,
        }
    }

    /// Two blocks can coalesce when they overlap or abut.
    fn can_coalesce_into(&self, previous: &Self) -> bool {
        previous.end_time >= self.start_time
    }
}

/// A canonical busy set: blocks sorted by lowest `start_time` first, with any
/// overlapping or abutting blocks coalesced. The union of the input intervals
/// is preserved.
#[derive(Debug, Default, PartialEq)]
pub struct MergedBusy {
    blocks: VecDeque<BusyBlock>,
}

impl MergedBusy {
    pub fn new(mut blocks: Vec<BusyBlock>) -> Self {
        blocks.retain(|b| b.start_time < b.end_time);
        // sort with least start_time first
        blocks.sort_by(|b1, b2| b1.start_time.cmp(&b2.start_time));

        let mut merged: VecDeque<BusyBlock> = VecDeque::with_capacity(blocks.len());
        for block in blocks {
            match merged.back_mut() {
                Some(last) if block.can_coalesce_into(last) => {
                    if block.end_time > last.end_time {
                        last.end_time = block.end_time;
                    }
                }
                _ => merged.push_back(block),
            }
        }

        Self { blocks: merged }
    }

    /// Whether `[start − buffer_before, end + buffer_after)` has a non-empty
    /// intersection with any block.
    ///
    /// Intervals are half-open, so with zero buffers a block ending at T does
    /// not conflict with a slot starting at T.
    pub fn conflicts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        buffer_before: TimeDelta,
        buffer_after: TimeDelta,
    ) -> bool {
        let padded_start = start - buffer_before;
        let padded_end = end + buffer_after;
        self.blocks
            .iter()
            .take_while(|b| b.start_time < padded_end)
            .any(|b| padded_start < b.end_time)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn inner(self) -> VecDeque<BusyBlock> {
        self.blocks
    }
}

impl AsRef<VecDeque<BusyBlock>> for MergedBusy {
    fn as_ref(&self) -> &VecDeque<BusyBlock> {
        &self.blocks
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ts(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn block(start: i64, end: i64) -> BusyBlock {
        BusyBlock::new(ts(start), ts(end), BusySource::Calendar("primary".into()))
    }

    mod merging {
        use super::*;

        #[test]
        fn keeps_disjoint_blocks_sorted() {
            let merged = MergedBusy::new(vec![block(50, 60), block(0, 10), block(20, 30)]);
            let blocks = merged.inner();
            assert_eq!(blocks.len(), 3);
            assert_eq!(blocks[0].start_time, ts(0));
            assert_eq!(blocks[1].start_time, ts(20));
            assert_eq!(blocks[2].start_time, ts(50));
        }

        #[test]
        fn coalesces_overlap_and_adjacency() {
            let merged = MergedBusy::new(vec![
                block(0, 10),
                block(5, 20),
                // abuts the previous one
                block(20, 30),
                block(40, 50),
            ]);
            let blocks = merged.inner();
            assert_eq!(blocks.len(), 2);
            assert_eq!((blocks[0].start_time, blocks[0].end_time), (ts(0), ts(30)));
            assert_eq!((blocks[1].start_time, blocks[1].end_time), (ts(40), ts(50)));
        }

        #[test]
        fn contained_block_does_not_extend() {
            let merged = MergedBusy::new(vec![block(0, 100), block(10, 20)]);
            let blocks = merged.inner();
            assert_eq!(blocks.len(), 1);
            assert_eq!((blocks[0].start_time, blocks[0].end_time), (ts(0), ts(100)));
        }

        #[test]
        fn drops_empty_and_inverted_blocks() {
            let merged = MergedBusy::new(vec![block(10, 10), block(30, 20)]);
            assert!(merged.is_empty());
        }

        #[test]
        fn union_is_preserved_and_blocks_are_pairwise_disjoint() {
            let input = vec![
                block(0, 7),
                block(3, 12),
                block(12, 13),
                block(40, 45),
                block(44, 60),
                block(80, 90),
            ];
            let merged = MergedBusy::new(input.clone());
            let blocks = merged.inner();

            for pair in blocks.iter().zip(blocks.iter().skip(1)) {
                assert!(pair.0.end_time < pair.1.start_time);
            }

            // every input millisecond is covered, nothing more
            for t in 0..100 {
                let in_input = input
                    .iter()
                    .any(|b| ts(t) >= b.start_time && ts(t) < b.end_time);
                let in_merged = blocks
                    .iter()
                    .any(|b| ts(t) >= b.start_time && ts(t) < b.end_time);
                assert_eq!(in_input, in_merged, "at t={}", t);
            }
        }
    }

    mod conflicts {
        use super::*;

        #[test]
        fn detects_plain_overlap() {
            let merged = MergedBusy::new(vec![block(10, 20)]);
            assert!(merged.conflicts(ts(15), ts(25), TimeDelta::zero(), TimeDelta::zero()));
            assert!(merged.conflicts(ts(5), ts(11), TimeDelta::zero(), TimeDelta::zero()));
            assert!(!merged.conflicts(ts(25), ts(30), TimeDelta::zero(), TimeDelta::zero()));
        }

        #[test]
        fn zero_buffer_adjacency_does_not_conflict() {
            let merged = MergedBusy::new(vec![block(10, 20)]);
            // slot starting exactly where the block ends
            assert!(!merged.conflicts(ts(20), ts(30), TimeDelta::zero(), TimeDelta::zero()));
            // slot ending exactly where the block starts
            assert!(!merged.conflicts(ts(0), ts(10), TimeDelta::zero(), TimeDelta::zero()));
        }

        #[test]
        fn buffers_expand_the_slot_both_ways() {
            let merged = MergedBusy::new(vec![block(10, 20)]);
            // padded to [15, 35): touches the block
            assert!(merged.conflicts(
                ts(20),
                ts(30),
                TimeDelta::milliseconds(5),
                TimeDelta::milliseconds(5)
            ));
            // padded to [0, 15): touches the block
            assert!(merged.conflicts(
                ts(5),
                ts(10),
                TimeDelta::milliseconds(5),
                TimeDelta::milliseconds(5)
            ));
            // padded to [21, 36): still clear
            assert!(!merged.conflicts(
                ts(26),
                ts(31),
                TimeDelta::milliseconds(5),
                TimeDelta::milliseconds(5)
            ));
        }

        #[test]
        fn empty_set_never_conflicts() {
            let merged = MergedBusy::new(Vec::new());
            assert!(!merged.conflicts(
                ts(0),
                ts(1000),
                TimeDelta::milliseconds(100),
                TimeDelta::milliseconds(100)
            ));
        }
    }
}
