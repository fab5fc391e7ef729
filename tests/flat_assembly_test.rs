/// Tree assembly from flat, id-referenced listings
///
/// Items reference their parent by id and may arrive before it, so these
/// tests check that the assembled tree does not depend on arrival order.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cloudscan::progress::ProgressCounter;
use cloudscan::provider::{DriveItem, DriveParent, FixtureClient, Page};
use cloudscan::{AccountInfo, CrawlPhase, Crawler, DriveAdapter, NodeSnapshot, PacingConfig, ProviderError, SinkBuilder};

fn account() -> AccountInfo {
	AccountInfo {
		display_name: Some("Test User".into()),
		quota: 5_000,
		used: 1_000,
		used_in_trash: None,
		root_identity: Some("root-id".into()),
	}
}

fn trashed(mut item: DriveItem) -> DriveItem {
	item.labels.trashed = true;
	item
}

// Parent is the account root, known only by its flag
fn in_drive_root(mut item: DriveItem) -> DriveItem {
	item.parents = vec![DriveParent { id: "0AAroot".into(), is_root: true }];
	item
}

fn paths(tree: &NodeSnapshot) -> Vec<String> {
	let mut out = Vec::new();
	tree.visit(&mut |node| out.push(node.path.clone()));
	out
}

fn assert_levels(tree: &NodeSnapshot) {
	tree.visit(&mut |node| {
		for child in node.children() {
			assert_eq!(child.level, node.level + 1, "level of {}", child.path);
		}
	});
}

fn drive_crawler(client: FixtureClient<DriveItem>) -> Crawler<DriveAdapter> {
	Crawler::new(DriveAdapter::new(Arc::new(client)))
		.with_pacing(PacingConfig::new(Duration::from_millis(10), Duration::from_millis(3000)))
}

// ============================================================================
// ORDER INDEPENDENCE
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_children_before_parents() {
	let client = FixtureClient::new()
		.with_page(
			"",
			Page::new(vec![
				DriveItem::file("f1", "notes.txt", "P", 120),
				trashed(DriveItem::file("t1", "old.txt", "root-id", 50)),
				DriveItem::folder("P", "Docs", "root-id"),
				DriveItem::file("e1", "empty.txt", "root-id", 0),
			])
			.with_next("page-2"),
		)
		.with_page(
			"page-2",
			Page::new(vec![
				DriveItem::file("q1", "q.txt", "Q", 30),
				DriveItem::folder("Q", "Sub", "P"),
				DriveItem::file("f1", "notes.txt", "P", 120),
			]),
		);
	let counter = Arc::new(ProgressCounter::new());
	let handle = drive_crawler(client).with_account(account()).with_sink(counter.clone()).spawn();

	handle.run("/").await.unwrap();
	handle.wait_idle().await.unwrap();
	let tree = handle.tree().await.unwrap();

	assert_eq!(
		paths(&tree),
		vec!["/", "/.FreeSpace", "/Docs", "/Docs/notes.txt", "/Docs/Sub", "/Docs/Sub/q.txt"]
	);
	assert_eq!(tree.size, 5_000);
	assert_eq!(tree.child(".FreeSpace").unwrap().size, 4_000);
	let docs = tree.child("Docs").unwrap();
	assert!(docs.is_dir);
	assert_eq!(docs.identity.as_deref(), Some("P"));
	// The relisted file was updated in place, not added twice
	assert_eq!(docs.children().len(), 2);
	assert_eq!(tree.find("/Docs/Sub/q.txt").map(|n| n.size), Some(30));
	assert_levels(&tree);

	// Every item counts, trashed ones included, plus one per page
	let stats = counter.stats();
	assert_eq!(stats.completed, 9);
	assert_eq!(stats.bound, 5);
	assert_eq!(stats.issued, 2);
}

#[tokio::test(start_paused = true)]
async fn test_same_tree_for_any_arrival_order() {
	let items = vec![
		DriveItem::folder("A", "a", "root-id"),
		DriveItem::folder("B", "b", "A"),
		DriveItem::file("x", "x.bin", "B", 1),
		DriveItem::file("y", "y.bin", "A", 2),
	];
	let mut reversed = items.clone();
	reversed.reverse();

	let mut trees = Vec::new();
	for order in [items, reversed] {
		let client = FixtureClient::new().with_page("", Page::new(order));
		let handle = drive_crawler(client).with_account(account()).with_synthetic_entries(false).spawn();
		handle.run("/").await.unwrap();
		handle.wait_idle().await.unwrap();
		trees.push(handle.tree().await.unwrap());
	}

	for tree in &trees {
		let mut found = paths(tree);
		found.sort();
		assert_eq!(found, vec!["/", "/a", "/a/b", "/a/b/x.bin", "/a/y.bin"]);
		assert_eq!(tree.file_bytes(), 3);
		assert_levels(tree);
	}
}

#[tokio::test(start_paused = true)]
async fn test_orphans_stay_out_of_the_tree() {
	let client = FixtureClient::new().with_page(
		"",
		Page::new(vec![
			DriveItem::file("lost", "lost.txt", "never-listed", 10),
			DriveItem::file("kept", "kept.txt", "root-id", 10),
		]),
	);
	let handle = drive_crawler(client).with_account(account()).with_synthetic_entries(false).spawn();

	handle.run("/").await.unwrap();
	handle.wait_idle().await.unwrap();
	let tree = handle.tree().await.unwrap();

	assert_eq!(paths(&tree), vec!["/", "/kept.txt"]);
	assert!(tree.find("/lost.txt").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_relisted_file_never_becomes_empty() {
	let client = FixtureClient::new()
		.with_page("", Page::new(vec![DriveItem::file("f", "a.txt", "root-id", 10)]).with_next("p2"))
		.with_page("p2", Page::new(vec![DriveItem::file("f", "a.txt", "root-id", 0)]));
	let handle = drive_crawler(client).with_account(account()).with_synthetic_entries(false).spawn();

	handle.run("/").await.unwrap();
	handle.wait_idle().await.unwrap();
	let tree = handle.tree().await.unwrap();

	assert_eq!(tree.find("/a.txt").map(|n| n.size), Some(10));
	let mut empty_files = Vec::new();
	tree.visit(&mut |node| {
		for child in node.children() {
			if !child.is_dir && child.size == 0 {
				empty_files.push(child.path.clone());
			}
		}
	});
	assert!(empty_files.is_empty(), "zero-byte files attached: {:?}", empty_files);
}

// ============================================================================
// ROOT IDENTITY
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_root_identity_from_parent_flag() {
	let client = FixtureClient::new().with_page(
		"",
		Page::new(vec![
			DriveItem::file("n", "notes.txt", "D", 3),
			in_drive_root(DriveItem::file("a", "a.txt", "", 10)),
			in_drive_root(DriveItem::folder("D", "Docs", "")),
		]),
	);
	// No account and no configured root id
	let handle = Crawler::new(DriveAdapter::new(Arc::new(client))).spawn();

	handle.run("/").await.unwrap();
	handle.wait_idle().await.unwrap();
	let tree = handle.tree().await.unwrap();

	assert_eq!(tree.identity.as_deref(), Some("0AAroot"));
	assert_eq!(paths(&tree), vec!["/", "/a.txt", "/Docs", "/Docs/notes.txt"]);
	assert_eq!(tree.file_bytes(), 13);
	assert_levels(&tree);
}

#[tokio::test(start_paused = true)]
async fn test_root_identity_from_adapter() {
	let client = FixtureClient::new().with_page(
		"",
		Page::new(vec![DriveItem::folder("root-id", "My Drive", ""), DriveItem::file("a", "a.txt", "root-id", 4)]),
	);
	let adapter = DriveAdapter::new(Arc::new(client)).with_root_identity("root-id");
	let handle = Crawler::new(adapter).spawn();

	let root = handle.run("/").await.unwrap();
	assert_eq!(root.identity.as_deref(), Some("root-id"));
	handle.wait_idle().await.unwrap();

	let tree = handle.tree().await.unwrap();
	// The root's own record does not rename it
	assert_eq!(tree.path, "/");
	assert_eq!(tree.name, "");
	assert_eq!(paths(&tree), vec!["/", "/a.txt"]);
}

#[tokio::test(start_paused = true)]
async fn test_account_root_identity_wins() {
	let client = FixtureClient::new().with_page("", Page::new(vec![DriveItem::file("a", "a.txt", "root-id", 4)]));
	let adapter = DriveAdapter::new(Arc::new(client)).with_root_identity("stale-id");
	let handle = Crawler::new(adapter).with_account(account()).with_synthetic_entries(false).spawn();

	handle.run("/").await.unwrap();
	handle.wait_idle().await.unwrap();
	assert!(handle.tree().await.unwrap().child("a.txt").is_some());
}

// ============================================================================
// THROTTLING
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_user_rate_limit_pauses_and_retries_page() {
	let begun = Arc::new(AtomicUsize::new(0));
	let ended = Arc::new(AtomicUsize::new(0));
	let issued = Arc::new(Mutex::new(Vec::new()));
	let sink = {
		let begun = begun.clone();
		let ended = ended.clone();
		let issued = issued.clone();
		SinkBuilder::new()
			.on_waiting_begin(move || {
				begun.fetch_add(1, Ordering::SeqCst);
			})
			.on_waiting_end(move || {
				ended.fetch_add(1, Ordering::SeqCst);
			})
			.on_unit_issued(move |seq_id, target| issued.lock().unwrap().push((seq_id, target.key().to_string())))
			.build()
	};

	let client = FixtureClient::new()
		.with_page("", Page::new(vec![DriveItem::folder("P", "Docs", "root-id")]).with_next("page-2"))
		.with_page("page-2", Page::new(vec![DriveItem::file("f", "f.txt", "P", 9)]))
		.with_failure("page-2", ProviderError::http(403, "User Rate Limit Exceeded").with_code("userRateLimitExceeded"));
	let handle = drive_crawler(client).with_account(account()).with_synthetic_entries(false).with_sink(sink).spawn();

	handle.run("/").await.unwrap();
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert_eq!(handle.phase(), CrawlPhase::Waiting);
	assert_eq!(begun.load(Ordering::SeqCst), 1);

	handle.wait_idle().await.unwrap();
	assert_eq!(ended.load(Ordering::SeqCst), 1);
	let issued = issued.lock().unwrap().clone();
	assert_eq!(issued, vec![(1, String::new()), (3, "page-2".to_string()), (3, "page-2".to_string())]);
	assert!(handle.tree().await.unwrap().find("/Docs/f.txt").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_plain_forbidden_is_fatal() {
	let counter = Arc::new(ProgressCounter::new());
	let client = FixtureClient::new()
		.with_page("", Page::new(vec![]))
		.with_failure("", ProviderError::http(403, "Forbidden").with_code("insufficientPermissions"));
	let handle = drive_crawler(client).with_sink(counter.clone()).spawn();

	handle.run("/").await.unwrap();
	handle.wait_idle().await.unwrap();
	let stats = counter.stats();
	assert_eq!(stats.dropped, 1);
	assert_eq!(stats.rate_limited, 0);
	assert_eq!(stats.issued, 1);
}

// vim: ts=4
