//! Crawl orchestrator
//!
//! One tokio task owns the pacing queue, the node table and the provider
//! adapter. Everything that can happen to a crawl arrives at that task as
//! an event and is handled to completion before the next one:
//!
//! - a finished listing fetch
//! - the end of a rate-limit cooldown
//! - the pacing queue's next tick
//! - a command from a [`CrawlHandle`] (run, pause, resume, snapshot, ...)
//!
//! Fetches run concurrently with the loop (the queue throttles issuing, not
//! completion), but their results are folded one at a time. Results from a
//! superseded run are recognised by their run generation and dropped.

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

use crate::assembler::{Folded, TreeAssembler};
use crate::config::PacingConfig;
use crate::error::{CrawlError, ErrorClass, ProviderError};
use crate::logging::*;
use crate::node::{Node, NodeId, SeqId};
use crate::provider::{
	leaf_name, normalize_path, AccountInfo, ListingStyle, Page, PageTarget, ProviderAdapter, ProviderResult,
};
use crate::queue::{PacingQueue, SequenceSource, Unit};
use crate::sink::{CrawlSink, NoSink};
use crate::tree::{NodeSnapshot, Tree};

const COMMAND_BUFFER: usize = 32;

/// Path and kind of the synthetic free-space entry
pub const FREE_SPACE_NAME: &str = ".FreeSpace";
/// Path and kind of the synthetic trash entry
pub const TRASH_NAME: &str = ".Trash";

/// Where a crawl currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
	/// No run started, or the last run has nothing left to do
	Idle,
	/// Run is being reset and seeded
	Seeding,
	/// Units queued or fetches in flight
	Draining,
	/// Cooling down after a rate-limit signal
	Waiting,
}

impl fmt::Display for CrawlPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CrawlPhase::Idle => write!(f, "idle"),
			CrawlPhase::Seeding => write!(f, "seeding"),
			CrawlPhase::Draining => write!(f, "draining"),
			CrawlPhase::Waiting => write!(f, "waiting"),
		}
	}
}

enum Command {
	Run { root: String, reply: oneshot::Sender<NodeSnapshot> },
	Pause { reply: oneshot::Sender<()> },
	Resume { reply: oneshot::Sender<()> },
	IsPaused { reply: oneshot::Sender<bool> },
	Tree { reply: oneshot::Sender<NodeSnapshot> },
	NextSequenceId { reply: oneshot::Sender<SeqId> },
	Shutdown,
}

/// Builder for a crawl orchestrator bound to one adapter
pub struct Crawler<A: ProviderAdapter> {
	adapter: Arc<A>,
	sink: Arc<dyn CrawlSink>,
	pacing: PacingConfig,
	account: Option<AccountInfo>,
	synthetic_entries: bool,
}

impl<A: ProviderAdapter> Crawler<A> {
	pub fn new(adapter: A) -> Self {
		Crawler {
			adapter: Arc::new(adapter),
			sink: Arc::new(NoSink),
			pacing: PacingConfig::default(),
			account: None,
			synthetic_entries: true,
		}
	}

	pub fn with_sink(mut self, sink: Arc<dyn CrawlSink>) -> Self {
		self.sink = sink;
		self
	}

	pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
		self.pacing = pacing;
		self
	}

	/// Account details from the authentication collaborator
	///
	/// Supplies the root size (quota), the root folder id for flat
	/// listings and the figures behind the synthetic root entries.
	pub fn with_account(mut self, account: AccountInfo) -> Self {
		self.account = Some(account);
		self
	}

	pub fn with_synthetic_entries(mut self, enabled: bool) -> Self {
		self.synthetic_entries = enabled;
		self
	}

	/// Start the orchestrator task. Must be called inside a tokio runtime.
	pub fn spawn(self) -> CrawlHandle {
		let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
		let (phase_tx, phase_rx) = watch::channel(CrawlPhase::Idle);

		let root = Node::new("", "/", 0, true);
		let engine = Engine {
			assembler: TreeAssembler::new(self.adapter.style()),
			adapter: self.adapter,
			sink: self.sink,
			cooldown: self.pacing.cooldown(),
			account: self.account,
			synthetic_entries: self.synthetic_entries,
			queue: PacingQueue::new(self.pacing.interval()),
			tree: Tree::new(root),
			cooldown_until: None,
			generation: 0,
			run_id: Uuid::nil(),
			issued: 0,
			phase_tx,
			in_flight: FuturesUnordered::new(),
		};
		tokio::spawn(engine.run(command_rx));

		CrawlHandle { commands: command_tx, phase: phase_rx }
	}
}

/// Client side of a running orchestrator
///
/// Cheap to clone. Every method fails with [`CrawlError::EngineStopped`]
/// once the orchestrator task is gone, and with nothing else.
#[derive(Clone)]
pub struct CrawlHandle {
	commands: mpsc::Sender<Command>,
	phase: watch::Receiver<CrawlPhase>,
}

impl CrawlHandle {
	/// Discard any previous run and start crawling `root`
	///
	/// Returns the freshly seeded root; the tree fills in as the crawl
	/// proceeds (see [`tree`](Self::tree) and `CrawlSink::on_tree_changed`).
	pub async fn run(&self, root: impl Into<String>) -> Result<NodeSnapshot, CrawlError> {
		let root = root.into();
		self.request(|reply| Command::Run { root, reply }).await
	}

	/// Stop issuing requests; fetches already in flight still complete
	pub async fn pause(&self) -> Result<(), CrawlError> {
		self.request(|reply| Command::Pause { reply }).await
	}

	pub async fn resume(&self) -> Result<(), CrawlError> {
		self.request(|reply| Command::Resume { reply }).await
	}

	pub async fn is_paused(&self) -> Result<bool, CrawlError> {
		self.request(|reply| Command::IsPaused { reply }).await
	}

	/// Copy of the tree as it stands
	pub async fn tree(&self) -> Result<NodeSnapshot, CrawlError> {
		self.request(|reply| Command::Tree { reply }).await
	}

	/// Reserve a sequence id consistent with the crawl's discovery order
	pub async fn next_sequence_id(&self) -> Result<SeqId, CrawlError> {
		self.request(|reply| Command::NextSequenceId { reply }).await
	}

	pub fn phase(&self) -> CrawlPhase {
		*self.phase.borrow()
	}

	/// Receiver notified on every phase change
	pub fn phase_changes(&self) -> watch::Receiver<CrawlPhase> {
		self.phase.clone()
	}

	/// Resolve once the crawl has nothing queued, in flight or cooling down
	///
	/// A crawl paused with work still queued is not idle.
	pub async fn wait_idle(&self) -> Result<(), CrawlError> {
		let mut phase = self.phase.clone();
		phase.wait_for(|p| *p == CrawlPhase::Idle).await.map_err(|_| CrawlError::EngineStopped)?;
		Ok(())
	}

	/// Stop the orchestrator task
	pub async fn shutdown(&self) -> Result<(), CrawlError> {
		self.commands.send(Command::Shutdown).await.map_err(|_| CrawlError::EngineStopped)
	}

	async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, CrawlError> {
		let (reply, response) = oneshot::channel();
		self.commands.send(make(reply)).await.map_err(|_| CrawlError::EngineStopped)?;
		response.await.map_err(|_| CrawlError::EngineStopped)
	}
}

struct Fetched<R> {
	generation: u64,
	unit: Unit,
	result: ProviderResult<Page<R>>,
}

struct Engine<A: ProviderAdapter> {
	adapter: Arc<A>,
	sink: Arc<dyn CrawlSink>,
	cooldown: Duration,
	account: Option<AccountInfo>,
	synthetic_entries: bool,

	queue: PacingQueue,
	tree: Tree,
	assembler: TreeAssembler,
	cooldown_until: Option<Instant>,

	generation: u64,
	run_id: Uuid,
	issued: u64,

	phase_tx: watch::Sender<CrawlPhase>,
	in_flight: FuturesUnordered<BoxFuture<'static, Fetched<A::Raw>>>,
}

impl<A: ProviderAdapter> Engine<A> {
	async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
		debug!(provider = self.adapter.name(), "crawl engine started");
		loop {
			let tick = self.queue.next_tick();
			let cooldown = self.cooldown_until;

			// Crawl events take precedence over commands
			tokio::select! {
				biased;

				Some(fetched) = self.in_flight.next(), if !self.in_flight.is_empty() => {
					self.handle_fetched(fetched);
				}

				_ = sleep_until(cooldown.unwrap_or_else(Instant::now)), if cooldown.is_some() => {
					self.end_cooldown();
				}

				_ = sleep_until(tick.unwrap_or_else(Instant::now)), if tick.is_some() => {
					self.tick();
				}

				command = commands.recv() => match command {
					Some(Command::Shutdown) | None => break,
					Some(command) => self.handle_command(command),
				},
			}

			self.update_phase();
		}
		debug!(provider = self.adapter.name(), "crawl engine stopped");
	}

	fn handle_command(&mut self, command: Command) {
		match command {
			Command::Run { root, reply } => {
				let root = self.start_run(root);
				// Publish the new phase before the caller can observe the reply
				self.update_phase();
				let _ = reply.send(root);
			}
			Command::Pause { reply } => {
				debug!(run = %self.run_id, "queue paused");
				self.queue.pause();
				let _ = reply.send(());
			}
			Command::Resume { reply } => {
				debug!(run = %self.run_id, "queue resumed");
				self.queue.resume();
				let _ = reply.send(());
			}
			Command::IsPaused { reply } => {
				let _ = reply.send(self.queue.is_paused());
			}
			Command::Tree { reply } => {
				let _ = reply.send(self.tree.snapshot());
			}
			Command::NextSequenceId { reply } => {
				let _ = reply.send(self.queue.next_sequence_id());
			}
			Command::Shutdown => {}
		}
	}

	fn start_run(&mut self, root: String) -> NodeSnapshot {
		self.set_phase(CrawlPhase::Seeding);
		self.generation += 1;
		self.run_id = Uuid::new_v4();
		self.issued = 0;
		if self.cooldown_until.take().is_some() {
			self.sink.on_waiting_end();
		}
		self.queue.reset();
		self.assembler.reset();

		let root = normalize_path(&root).to_string();
		let mut root_node = Node::new(leaf_name(&root), root.clone(), 0, true);
		if let Some(account) = &self.account {
			root_node.size = account.quota;
		}
		let identity = self
			.account
			.as_ref()
			.and_then(|a| a.root_identity.clone())
			.or_else(|| self.adapter.root_identity().map(str::to_string));
		if let Some(identity) = &identity {
			root_node.identity = Some(identity.clone());
		}
		self.tree = Tree::new(root_node);
		match identity {
			Some(identity) => self.assembler.register(identity, self.tree.root()),
			None if self.assembler.style() == ListingStyle::Flat => {
				info!(run = %self.run_id, "root folder id unknown, taking it from items filed under the root");
			}
			None => {}
		}

		if root == "/" && self.synthetic_entries {
			self.add_synthetic_entries();
		}

		info!(run = %self.run_id, provider = self.adapter.name(), root = %root, "crawl started");
		self.sink.on_progress_bound_set(0);
		let target = self.adapter.root_target(&root);
		self.enqueue_node(self.tree.root(), target);
		self.sink.on_tree_changed(&self.tree);
		self.tree.snapshot()
	}

	fn add_synthetic_entries(&mut self) {
		let Some(account) = self.account.clone() else {
			return;
		};
		let root = self.tree.root();
		self.tree.ensure_children(root);

		let free = Node::new(FREE_SPACE_NAME, format!("/{}", FREE_SPACE_NAME), 1, false)
			.with_size(account.free_bytes())
			.with_seq_id(self.queue.next_sequence_id())
			.with_kind(Some(FREE_SPACE_NAME.to_string()));
		let id = self.tree.insert(free);
		self.tree.attach(root, id);

		if let Some(in_trash) = account.used_in_trash {
			let trash = Node::new(TRASH_NAME, format!("/{}", TRASH_NAME), 1, false)
				.with_size(in_trash)
				.with_seq_id(self.queue.next_sequence_id())
				.with_kind(Some(TRASH_NAME.to_string()));
			let id = self.tree.insert(trash);
			self.tree.attach(root, id);
		}
	}

	// Queue a listing for `node`, giving the node the unit's sequence id
	fn enqueue_node(&mut self, node: NodeId, target: PageTarget) {
		let mut unit = Unit::new(target, node);
		unit.seq_id = self.tree.get(node).seq_id;
		let seq_id = self.queue.enqueue(unit);
		self.tree.get_mut(node).seq_id.get_or_insert(seq_id);
	}

	fn tick(&mut self) {
		let Some(unit) = self.queue.poll_tick(Instant::now()) else {
			return;
		};
		let seq_id = unit.seq_id.unwrap_or_default();
		self.issued += 1;
		debug!(run = %self.run_id, seq_id, target = %unit.target, "issuing listing request");
		self.sink.on_unit_issued(seq_id, &unit.target);

		let adapter = Arc::clone(&self.adapter);
		let generation = self.generation;
		self.in_flight.push(
			async move {
				let result = adapter.list_page(&unit.target).await;
				Fetched { generation, unit, result }
			}
			.boxed(),
		);
	}

	fn handle_fetched(&mut self, fetched: Fetched<A::Raw>) {
		if fetched.generation != self.generation {
			debug!(run = %self.run_id, target = %fetched.unit.target, "discarding result from a previous run");
			return;
		}
		match fetched.result {
			Ok(page) => self.fold_page(fetched.unit, page),
			Err(error) => self.handle_failure(fetched.unit, error),
		}
	}

	fn fold_page(&mut self, unit: Unit, page: Page<A::Raw>) {
		trace!(run = %self.run_id, target = %unit.target, items = page.items.len(), "folding page");

		// The unit's own completion is counted separately below
		let bound = self.sink.on_progress_bound_get() + page.items.len() as i64 - 1;
		self.sink.on_progress_bound_set(bound);

		self.tree.ensure_children(unit.node);
		let flat = self.assembler.style() == ListingStyle::Flat;
		for raw in &page.items {
			let entry = self.adapter.to_entry(raw);
			if flat {
				self.sink.on_progress_increment();
			}
			match self.assembler.fold(&mut self.tree, unit.node, &entry, &mut self.queue) {
				Folded::Directory(id) => {
					let path = self.tree.get(id).path.clone();
					self.enqueue_node(id, PageTarget::Path(path));
				}
				Folded::Skipped(reason) => {
					trace!(run = %self.run_id, name = %entry.name, ?reason, "entry skipped");
				}
				Folded::Attached(_) | Folded::Described(_) => {}
			}
			self.sink.on_tree_changed(&self.tree);
		}

		if let Some(token) = page.next {
			self.queue.enqueue(Unit::new(PageTarget::Token(token), unit.node));
		}
		self.sink.on_progress_increment();
	}

	fn handle_failure(&mut self, unit: Unit, error: ProviderError) {
		let class = self.adapter.classify_error(&error);
		let target = unit.target.to_string();
		match class {
			ErrorClass::RateLimited => {
				warn!(run = %self.run_id, target = %target, seq_id = ?unit.seq_id, %error, "rate limited, cooling down");
				self.queue.pause();
				self.queue.reinsert_with_priority(unit);
				self.begin_cooldown();
			}
			ErrorClass::Transient => {
				warn!(run = %self.run_id, target = %target, %error, "listing failed, subtree left incomplete");
			}
			ErrorClass::Fatal => {
				error!(run = %self.run_id, target = %target, %error, "listing failed, subtree left incomplete");
			}
		}
		self.sink.on_error(&CrawlError::classified(class, target, error));
	}

	// A new signal while cooling down restarts the single timer
	fn begin_cooldown(&mut self) {
		let already_waiting = self.cooldown_until.is_some();
		self.cooldown_until = Some(Instant::now() + self.cooldown);
		if !already_waiting {
			self.sink.on_waiting_begin();
		}
	}

	fn end_cooldown(&mut self) {
		self.cooldown_until = None;
		debug!(run = %self.run_id, "cooldown over, resuming");
		self.sink.on_waiting_end();
		self.queue.resume();
	}

	fn current_phase(&self) -> CrawlPhase {
		if self.cooldown_until.is_some() {
			CrawlPhase::Waiting
		} else if self.queue.is_empty() && self.in_flight.is_empty() {
			CrawlPhase::Idle
		} else {
			CrawlPhase::Draining
		}
	}

	fn update_phase(&mut self) {
		let phase = self.current_phase();
		let previous = *self.phase_tx.borrow();
		if phase == previous {
			return;
		}
		if phase == CrawlPhase::Idle && self.generation > 0 {
			info!(
				run = %self.run_id,
				requests = self.issued,
				nodes = self.tree.reachable_count(),
				"crawl finished"
			);
		}
		self.set_phase(phase);
	}

	fn set_phase(&self, phase: CrawlPhase) {
		self.phase_tx.send_replace(phase);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::{DropboxAdapter, DropboxMetadata, FixtureClient};

	fn crawler(client: FixtureClient<DropboxMetadata>) -> Crawler<DropboxAdapter> {
		Crawler::new(DropboxAdapter::new(Arc::new(client)))
	}

	#[tokio::test(start_paused = true)]
	async fn test_run_returns_seeded_root() {
		let client = FixtureClient::new().with_page("/", Page::new(vec![DropboxMetadata::file("/a", 3)]));
		let handle = crawler(client).spawn();

		let root = handle.run("/").await.unwrap();
		assert_eq!(root.path, "/");
		assert_eq!(root.level, 0);
		assert!(root.is_dir);
		assert_eq!(root.seq_id, Some(1));
		assert_eq!(handle.phase(), CrawlPhase::Draining);

		handle.wait_idle().await.unwrap();
		let tree = handle.tree().await.unwrap();
		assert_eq!(tree.children().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_synthetic_entries_reserve_ids() {
		let account = AccountInfo { quota: 1000, used: 400, used_in_trash: Some(0), ..Default::default() };
		let client = FixtureClient::new().with_page("/", Page::new(vec![]));
		let handle = crawler(client).with_account(account).spawn();

		let root = handle.run("/").await.unwrap();
		assert_eq!(root.size, 1000);
		let free = root.child(FREE_SPACE_NAME).unwrap();
		assert_eq!(free.size, 600);
		assert_eq!(free.path, "/.FreeSpace");
		assert_eq!(free.seq_id, Some(1));
		// Empty trash is a zero-byte file and stays out of the tree
		assert!(root.child(TRASH_NAME).is_none());
		assert_eq!(root.seq_id, Some(3));
		assert_eq!(handle.next_sequence_id().await.unwrap(), 4);
	}

	#[tokio::test(start_paused = true)]
	async fn test_no_synthetic_entries_below_root() {
		let account = AccountInfo { quota: 1000, used: 400, ..Default::default() };
		let client = FixtureClient::new().with_page("/Docs", Page::new(vec![]));
		let handle = crawler(client).with_account(account).spawn();

		let root = handle.run("/Docs").await.unwrap();
		assert_eq!(root.name, "Docs");
		assert!(root.children().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_handle_reports_stopped_engine() {
		let handle = crawler(FixtureClient::new()).spawn();
		handle.shutdown().await.unwrap();
		tokio::task::yield_now().await;
		let result = handle.is_paused().await;
		assert!(matches!(result, Err(CrawlError::EngineStopped)));
	}
}

// vim: ts=4
