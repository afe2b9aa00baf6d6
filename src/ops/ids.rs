use chrono::Utc;

use crate::model::task::{TagId, TaskId};

/// Source of the current time in milliseconds
pub type Clock = fn() -> u64;

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Hands out task ids: the current millisecond time, bumped past the last
/// id handed out (or observed) so ids strictly increase within a process.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    last: TaskId,
    clock: Clock,
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator::with_clock(now_millis)
    }

    pub fn with_clock(clock: Clock) -> Self {
        IdAllocator { last: 0, clock }
    }

    /// Make sure every later id is greater than `id`.
    /// Call with the largest id of a loaded tree before allocating.
    pub fn observe(&mut self, id: TaskId) {
        self.last = self.last.max(id);
    }

    /// Loaded ids stay at or below `MAX_TASK_ID`, which leaves 2^63 ids
    /// of headroom; the floor saturates rather than wrapping past it.
    pub fn allocate(&mut self) -> TaskId {
        let next = (self.clock)().max(self.last.saturating_add(1));
        self.last = next;
        next
    }
}

/// Opaque tag ids: `t` followed by a base-36 counter seeded from the clock
#[derive(Debug, Clone, Default)]
pub struct TagIdGenerator {
    inner: IdAllocator,
}

impl TagIdGenerator {
    pub fn new() -> Self {
        TagIdGenerator::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        TagIdGenerator {
            inner: IdAllocator::with_clock(clock),
        }
    }

    pub fn generate(&mut self) -> TagId {
        format!("t{}", to_base36(self.inner.allocate()))
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::MAX_TASK_ID;
    use std::collections::HashSet;

    fn frozen() -> u64 {
        1_000
    }

    #[test]
    fn ids_strictly_increase_with_a_stalled_clock() {
        let mut alloc = IdAllocator::with_clock(frozen);
        assert_eq!(alloc.allocate(), 1_000);
        assert_eq!(alloc.allocate(), 1_001);
        assert_eq!(alloc.allocate(), 1_002);
    }

    #[test]
    fn observed_ids_raise_the_floor() {
        let mut alloc = IdAllocator::with_clock(frozen);
        alloc.observe(5_000);
        assert_eq!(alloc.allocate(), 5_001);
        // Observing something lower never moves the floor back
        alloc.observe(10);
        assert_eq!(alloc.allocate(), 5_002);
    }

    #[test]
    fn allocation_above_the_largest_stored_id_does_not_overflow() {
        let mut alloc = IdAllocator::with_clock(frozen);
        alloc.observe(MAX_TASK_ID);
        assert_eq!(alloc.allocate(), MAX_TASK_ID + 1);
        assert_eq!(alloc.allocate(), MAX_TASK_ID + 2);

        alloc.observe(u64::MAX);
        assert_eq!(alloc.allocate(), u64::MAX);
    }

    #[test]
    fn real_clock_ids_are_unique() {
        let mut alloc = IdAllocator::new();
        let ids: HashSet<TaskId> = (0..500).map(|_| alloc.allocate()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn tag_ids_are_opaque_and_unique() {
        let mut tags = TagIdGenerator::with_clock(frozen);
        let a = tags.generate();
        let b = tags.generate();
        assert_eq!(a, "trs"); // 1000 in base 36
        assert_ne!(a, b);
        assert!(b.starts_with('t'));
    }

    #[test]
    fn base36_edges() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
