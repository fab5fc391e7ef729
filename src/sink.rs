//! Capability sink: the observer the crawl reports to
//!
//! Every method has a no-op default, so implementors override only what
//! they care about. All calls happen on the orchestrator task, one at a
//! time, in event order.

use std::sync::Arc;

use crate::error::CrawlError;
use crate::node::SeqId;
use crate::provider::{AccountInfo, PageTarget};
use crate::tree::Tree;

// Type aliases to reduce complexity
type NotifyFn = dyn Fn() + Send + Sync;
type BoundSetFn = dyn Fn(i64) + Send + Sync;
type BoundGetFn = dyn Fn() -> i64 + Send + Sync;
type TreeFn = dyn Fn(&Tree) + Send + Sync;
type AccountFn = dyn Fn(&AccountInfo) + Send + Sync;
type IssuedFn = dyn Fn(SeqId, &PageTarget) + Send + Sync;
type ErrorFn = dyn Fn(&CrawlError) + Send + Sync;

/// Observer for progress and lifecycle events
pub trait CrawlSink: Send + Sync {
	/// One unit of discovery work completed
	fn on_progress_increment(&self) {}

	/// Replace the expected-work total
	fn on_progress_bound_set(&self, _bound: i64) {}

	/// Current expected-work total
	fn on_progress_bound_get(&self) -> i64 {
		0
	}

	/// Cooldown entered after a rate-limit signal
	fn on_waiting_begin(&self) {}

	/// Cooldown over (or cancelled by a new run)
	fn on_waiting_end(&self) {}

	/// Fired after every tree mutation
	fn on_tree_changed(&self, _tree: &Tree) {}

	/// Account signed in; reported by the authentication collaborator
	fn on_authenticated(&self, _account: &AccountInfo) {}

	/// Account signed out; reported by the authentication collaborator
	fn on_signed_out(&self) {}

	/// A unit was handed to the provider
	fn on_unit_issued(&self, _seq_id: SeqId, _target: &PageTarget) {}

	/// A listing request failed
	fn on_error(&self, _error: &CrawlError) {}
}

/// Sink that ignores everything
pub struct NoSink;

impl CrawlSink for NoSink {}

/// Builder for a sink made of closures
#[derive(Default)]
pub struct SinkBuilder {
	increment: Option<Box<NotifyFn>>,
	bound_set: Option<Box<BoundSetFn>>,
	bound_get: Option<Box<BoundGetFn>>,
	waiting_begin: Option<Box<NotifyFn>>,
	waiting_end: Option<Box<NotifyFn>>,
	tree_changed: Option<Box<TreeFn>>,
	authenticated: Option<Box<AccountFn>>,
	signed_out: Option<Box<NotifyFn>>,
	unit_issued: Option<Box<IssuedFn>>,
	error: Option<Box<ErrorFn>>,
}

impl SinkBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_progress_increment<F>(mut self, callback: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.increment = Some(Box::new(callback));
		self
	}

	pub fn on_progress_bound_set<F>(mut self, callback: F) -> Self
	where
		F: Fn(i64) + Send + Sync + 'static,
	{
		self.bound_set = Some(Box::new(callback));
		self
	}

	pub fn on_progress_bound_get<F>(mut self, callback: F) -> Self
	where
		F: Fn() -> i64 + Send + Sync + 'static,
	{
		self.bound_get = Some(Box::new(callback));
		self
	}

	pub fn on_waiting_begin<F>(mut self, callback: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.waiting_begin = Some(Box::new(callback));
		self
	}

	pub fn on_waiting_end<F>(mut self, callback: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.waiting_end = Some(Box::new(callback));
		self
	}

	pub fn on_tree_changed<F>(mut self, callback: F) -> Self
	where
		F: Fn(&Tree) + Send + Sync + 'static,
	{
		self.tree_changed = Some(Box::new(callback));
		self
	}

	pub fn on_authenticated<F>(mut self, callback: F) -> Self
	where
		F: Fn(&AccountInfo) + Send + Sync + 'static,
	{
		self.authenticated = Some(Box::new(callback));
		self
	}

	pub fn on_signed_out<F>(mut self, callback: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.signed_out = Some(Box::new(callback));
		self
	}

	pub fn on_unit_issued<F>(mut self, callback: F) -> Self
	where
		F: Fn(SeqId, &PageTarget) + Send + Sync + 'static,
	{
		self.unit_issued = Some(Box::new(callback));
		self
	}

	pub fn on_error<F>(mut self, callback: F) -> Self
	where
		F: Fn(&CrawlError) + Send + Sync + 'static,
	{
		self.error = Some(Box::new(callback));
		self
	}

	/// Build the sink
	pub fn build(self) -> Arc<dyn CrawlSink> {
		Arc::new(CompositeSink {
			increment: self.increment,
			bound_set: self.bound_set,
			bound_get: self.bound_get,
			waiting_begin: self.waiting_begin,
			waiting_end: self.waiting_end,
			tree_changed: self.tree_changed,
			authenticated: self.authenticated,
			signed_out: self.signed_out,
			unit_issued: self.unit_issued,
			error: self.error,
		})
	}
}

struct CompositeSink {
	increment: Option<Box<NotifyFn>>,
	bound_set: Option<Box<BoundSetFn>>,
	bound_get: Option<Box<BoundGetFn>>,
	waiting_begin: Option<Box<NotifyFn>>,
	waiting_end: Option<Box<NotifyFn>>,
	tree_changed: Option<Box<TreeFn>>,
	authenticated: Option<Box<AccountFn>>,
	signed_out: Option<Box<NotifyFn>>,
	unit_issued: Option<Box<IssuedFn>>,
	error: Option<Box<ErrorFn>>,
}

impl CrawlSink for CompositeSink {
	fn on_progress_increment(&self) {
		if let Some(ref callback) = self.increment {
			callback();
		}
	}

	fn on_progress_bound_set(&self, bound: i64) {
		if let Some(ref callback) = self.bound_set {
			callback(bound);
		}
	}

	fn on_progress_bound_get(&self) -> i64 {
		self.bound_get.as_ref().map(|callback| callback()).unwrap_or(0)
	}

	fn on_waiting_begin(&self) {
		if let Some(ref callback) = self.waiting_begin {
			callback();
		}
	}

	fn on_waiting_end(&self) {
		if let Some(ref callback) = self.waiting_end {
			callback();
		}
	}

	fn on_tree_changed(&self, tree: &Tree) {
		if let Some(ref callback) = self.tree_changed {
			callback(tree);
		}
	}

	fn on_authenticated(&self, account: &AccountInfo) {
		if let Some(ref callback) = self.authenticated {
			callback(account);
		}
	}

	fn on_signed_out(&self) {
		if let Some(ref callback) = self.signed_out {
			callback();
		}
	}

	fn on_unit_issued(&self, seq_id: SeqId, target: &PageTarget) {
		if let Some(ref callback) = self.unit_issued {
			callback(seq_id, target);
		}
	}

	fn on_error(&self, error: &CrawlError) {
		if let Some(ref callback) = self.error {
			callback(error);
		}
	}
}


// vim: ts=4
