//! Progress tracking sinks
//!
//! [`ProgressCounter`] keeps the discovery counters the crawl reports
//! through [`CrawlSink`]; [`LoggingSink`] adds tracing output on top of it.
//! The CLI uses both; embedders can use either.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::CrawlError;
use crate::logging::*;
use crate::node::SeqId;
use crate::provider::{AccountInfo, PageTarget};
use crate::sink::CrawlSink;
use crate::tree::Tree;

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressStats {
	/// Completed units (plus listed items, for flat listings)
	pub completed: u64,
	/// Expected-work total as adjusted by the crawl
	pub bound: i64,
	/// Listing requests issued
	pub issued: u64,
	/// Rate-limit signals received
	pub rate_limited: u64,
	/// Units dropped after a transient or fatal failure
	pub dropped: u64,
	/// Currently cooling down
	pub waiting: bool,
}

impl ProgressStats {
	/// Completed share of the expected work, clamped to 0..=1
	pub fn ratio(&self) -> f64 {
		if self.bound <= 0 {
			return if self.completed > 0 { 1.0 } else { 0.0 };
		}
		(self.completed as f64 / self.bound as f64).clamp(0.0, 1.0)
	}
}

/// Lock-free progress counters
#[derive(Debug, Default)]
pub struct ProgressCounter {
	completed: AtomicU64,
	bound: AtomicI64,
	issued: AtomicU64,
	rate_limited: AtomicU64,
	dropped: AtomicU64,
	waiting: AtomicBool,
}

impl ProgressCounter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn stats(&self) -> ProgressStats {
		ProgressStats {
			completed: self.completed.load(Ordering::Relaxed),
			bound: self.bound.load(Ordering::Relaxed),
			issued: self.issued.load(Ordering::Relaxed),
			rate_limited: self.rate_limited.load(Ordering::Relaxed),
			dropped: self.dropped.load(Ordering::Relaxed),
			waiting: self.waiting.load(Ordering::Relaxed),
		}
	}

	pub fn is_waiting(&self) -> bool {
		self.waiting.load(Ordering::Relaxed)
	}

	/// Zero every counter, for reuse across runs
	pub fn reset(&self) {
		self.completed.store(0, Ordering::Relaxed);
		self.bound.store(0, Ordering::Relaxed);
		self.issued.store(0, Ordering::Relaxed);
		self.rate_limited.store(0, Ordering::Relaxed);
		self.dropped.store(0, Ordering::Relaxed);
		self.waiting.store(false, Ordering::Relaxed);
	}
}

impl CrawlSink for ProgressCounter {
	fn on_progress_increment(&self) {
		self.completed.fetch_add(1, Ordering::Relaxed);
	}

	fn on_progress_bound_set(&self, bound: i64) {
		self.bound.store(bound, Ordering::Relaxed);
	}

	fn on_progress_bound_get(&self) -> i64 {
		self.bound.load(Ordering::Relaxed)
	}

	fn on_waiting_begin(&self) {
		self.waiting.store(true, Ordering::Relaxed);
	}

	fn on_waiting_end(&self) {
		self.waiting.store(false, Ordering::Relaxed);
	}

	fn on_unit_issued(&self, _seq_id: SeqId, _target: &PageTarget) {
		self.issued.fetch_add(1, Ordering::Relaxed);
	}

	fn on_error(&self, error: &CrawlError) {
		if error.is_retried() {
			self.rate_limited.fetch_add(1, Ordering::Relaxed);
		} else {
			self.dropped.fetch_add(1, Ordering::Relaxed);
		}
	}
}

/// Counter that also logs lifecycle events
pub struct LoggingSink {
	counter: Arc<ProgressCounter>,
}

impl LoggingSink {
	pub fn new(counter: Arc<ProgressCounter>) -> Self {
		LoggingSink { counter }
	}

	pub fn counter(&self) -> &Arc<ProgressCounter> {
		&self.counter
	}
}

impl CrawlSink for LoggingSink {
	fn on_progress_increment(&self) {
		self.counter.on_progress_increment();
	}

	fn on_progress_bound_set(&self, bound: i64) {
		self.counter.on_progress_bound_set(bound);
	}

	fn on_progress_bound_get(&self) -> i64 {
		self.counter.on_progress_bound_get()
	}

	fn on_waiting_begin(&self) {
		self.counter.on_waiting_begin();
		let stats = self.counter.stats();
		info!(completed = stats.completed, bound = stats.bound, "waiting for rate limit cooldown");
	}

	fn on_waiting_end(&self) {
		self.counter.on_waiting_end();
		info!(completed = self.counter.stats().completed, "cooldown over, resuming");
	}

	fn on_tree_changed(&self, tree: &Tree) {
		trace!(nodes = tree.len(), "tree changed");
	}

	fn on_authenticated(&self, account: &AccountInfo) {
		info!(
			user = account.display_name.as_deref().unwrap_or("unknown"),
			quota = account.quota,
			used = account.used,
			"account ready"
		);
	}

	fn on_signed_out(&self) {
		info!("signed out");
	}

	fn on_unit_issued(&self, seq_id: SeqId, target: &PageTarget) {
		self.counter.on_unit_issued(seq_id, target);
		trace!(seq_id, target = %target, "unit issued");
	}

	fn on_error(&self, error: &CrawlError) {
		self.counter.on_error(error);
		match error.class() {
			Some(crate::error::ErrorClass::Fatal) => error!(%error, "listing failed"),
			_ => warn!(%error, "listing problem"),
		}
	}
}


// vim: ts=4
