//! Pacing queue
//!
//! Serializes outbound listing requests at a fixed minimum interval. The
//! queue never sleeps on its own: it only tracks *when* the next issue is
//! due (`next_tick`) and hands out one unit per tick. The owner drives it
//! from its event loop, so there is never more than one timer armed.
//!
//! Ordering: units are handed out in sequence-id order of discovery. A
//! failed unit put back with [`PacingQueue::reinsert_with_priority`] keeps
//! its original id and is re-sorted into place, so it is issued before
//! anything discovered after it.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::node::{NodeId, SeqId};
use crate::provider::PageTarget;

/// Default minimum spacing between two issued requests
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// Source of discovery-order sequence ids
pub trait SequenceSource {
	fn next_sequence_id(&mut self) -> SeqId;
}

/// One pending listing fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
	pub target: PageTarget,

	/// Node the fetched entries belong to
	pub node: NodeId,

	/// Priority key; assigned on enqueue when missing
	pub seq_id: Option<SeqId>,
}

impl Unit {
	pub fn new(target: PageTarget, node: NodeId) -> Self {
		Unit { target, node, seq_id: None }
	}

	pub fn with_seq_id(mut self, seq_id: SeqId) -> Self {
		self.seq_id = Some(seq_id);
		self
	}

	fn priority(&self) -> SeqId {
		self.seq_id.unwrap_or(SeqId::MAX)
	}
}

/// Rate-limited, pausable work queue
#[derive(Debug)]
pub struct PacingQueue {
	pending: VecDeque<Unit>,
	interval: Duration,
	paused: bool,
	next_tick: Option<Instant>,
	seq: SeqId,
}

impl PacingQueue {
	pub fn new(interval: Duration) -> Self {
		PacingQueue { pending: VecDeque::new(), interval, paused: false, next_tick: None, seq: 0 }
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Append a unit, assigning it the next sequence id if it has none
	///
	/// Starts the drain loop unless paused or already running.
	pub fn enqueue(&mut self, mut unit: Unit) -> SeqId {
		let seq_id = match unit.seq_id {
			Some(seq_id) => seq_id,
			None => {
				let seq_id = self.next_sequence_id();
				unit.seq_id = Some(seq_id);
				seq_id
			}
		};
		self.pending.push_back(unit);
		self.kick();
		seq_id
	}

	/// Restart the drain loop without adding work
	pub fn kick(&mut self) {
		if !self.paused && self.next_tick.is_none() {
			self.next_tick = Some(Instant::now() + self.interval);
		}
	}

	/// Put a failed unit back at the head, then order everything by sequence id
	///
	/// The sort is stable, so units with equal ids keep their relative order.
	pub fn reinsert_with_priority(&mut self, unit: Unit) {
		self.pending.push_front(unit);
		self.pending.make_contiguous().sort_by_key(Unit::priority);
	}

	/// Stop issuing; takes effect at the next tick
	pub fn pause(&mut self) {
		self.paused = true;
	}

	/// Continue issuing. Safe to call when not paused.
	pub fn resume(&mut self) {
		self.paused = false;
		self.kick();
	}

	pub fn is_paused(&self) -> bool {
		self.paused
	}

	/// When the drain loop wants to run next, if it is running at all
	pub fn next_tick(&self) -> Option<Instant> {
		self.next_tick
	}

	/// Run one tick of the drain loop
	///
	/// Returns the unit to issue and re-arms the loop one interval after
	/// `now`. If paused or empty the loop stops until the next
	/// [`enqueue`](Self::enqueue) or [`resume`](Self::resume).
	pub fn poll_tick(&mut self, now: Instant) -> Option<Unit> {
		self.next_tick = None;
		if self.paused {
			return None;
		}
		let unit = self.pending.pop_front()?;
		self.next_tick = Some(now + self.interval);
		Some(unit)
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	/// Sequence ids of pending units, head first
	pub fn pending_ids(&self) -> Vec<SeqId> {
		self.pending.iter().map(Unit::priority).collect()
	}

	/// Drop all work and restart numbering
	pub fn reset(&mut self) {
		self.pending.clear();
		self.paused = false;
		self.next_tick = None;
		self.seq = 0;
	}
}

impl SequenceSource for PacingQueue {
	fn next_sequence_id(&mut self) -> SeqId {
		self.seq += 1;
		self.seq
	}
}

impl Default for PacingQueue {
	fn default() -> Self {
		PacingQueue::new(DEFAULT_INTERVAL)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn unit(n: usize) -> Unit {
		Unit::new(PageTarget::Path(format!("/d{}", n)), NodeId(n))
	}

	#[test]
	fn test_enqueue_assigns_increasing_ids() {
		let mut queue = PacingQueue::default();
		assert_eq!(queue.enqueue(unit(1)), 1);
		assert_eq!(queue.enqueue(unit(2)), 2);
		assert_eq!(queue.enqueue(unit(3).with_seq_id(40)), 40);
		assert_eq!(queue.enqueue(unit(4)), 3);
		assert_eq!(queue.pending_ids(), vec![1, 2, 40, 3]);
	}

	#[test]
	fn test_enqueue_arms_single_tick() {
		let mut queue = PacingQueue::default();
		assert!(queue.next_tick().is_none());
		queue.enqueue(unit(1));
		let first = queue.next_tick();
		assert!(first.is_some());
		queue.enqueue(unit(2));
		assert_eq!(queue.next_tick(), first);
	}

	#[test]
	fn test_poll_tick_pops_and_rearms() {
		let mut queue = PacingQueue::default();
		queue.enqueue(unit(1));
		queue.enqueue(unit(2));
		let now = Instant::now();

		let popped = queue.poll_tick(now).unwrap();
		assert_eq!(popped.seq_id, Some(1));
		assert_eq!(queue.next_tick(), Some(now + DEFAULT_INTERVAL));

		assert_eq!(queue.poll_tick(now).unwrap().seq_id, Some(2));
		assert!(queue.poll_tick(now).is_none());
		assert!(queue.next_tick().is_none());
	}

	#[test]
	fn test_pause_stops_loop_until_resume() {
		let mut queue = PacingQueue::default();
		queue.enqueue(unit(1));
		queue.pause();
		assert!(queue.is_paused());
		assert!(queue.poll_tick(Instant::now()).is_none());
		assert!(queue.next_tick().is_none());

		// enqueue while paused does not restart the loop
		queue.enqueue(unit(2));
		assert!(queue.next_tick().is_none());

		queue.resume();
		assert!(!queue.is_paused());
		assert!(queue.next_tick().is_some());
		assert_eq!(queue.poll_tick(Instant::now()).unwrap().seq_id, Some(1));
	}

	#[test]
	fn test_resume_is_idempotent() {
		let mut queue = PacingQueue::default();
		queue.enqueue(unit(1));
		let tick = queue.next_tick();
		queue.resume();
		queue.resume();
		assert_eq!(queue.next_tick(), tick);
	}

	#[test]
	fn test_reinsert_restores_discovery_order() {
		let mut queue = PacingQueue::default();
		for n in 1..=4 {
			queue.enqueue(unit(n));
		}
		let now = Instant::now();
		let first = queue.poll_tick(now).unwrap();
		let second = queue.poll_tick(now).unwrap();

		// Both fail; the later one comes back first
		queue.reinsert_with_priority(second);
		queue.reinsert_with_priority(first);
		assert_eq!(queue.pending_ids(), vec![1, 2, 3, 4]);

		let third = queue.poll_tick(now).unwrap();
		assert_eq!(third.seq_id, Some(1));
		queue.enqueue(unit(5));
		queue.reinsert_with_priority(third);
		assert_eq!(queue.pending_ids(), vec![1, 2, 3, 4, 5]);
	}

	#[test]
	fn test_reset() {
		let mut queue = PacingQueue::default();
		queue.enqueue(unit(1));
		queue.pause();
		queue.reset();
		assert!(queue.is_empty());
		assert!(!queue.is_paused());
		assert!(queue.next_tick().is_none());
		assert_eq!(queue.next_sequence_id(), 1);
	}
}

// vim: ts=4
