use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cloudscan::config::{LogFormat, OutputMode};
use cloudscan::logging::{self, *};
use cloudscan::progress::{LoggingSink, ProgressCounter, ProgressStats};
use cloudscan::provider::{DavResponse, DriveItem, DropboxMetadata};
use cloudscan::{
	AccountInfo, Config, CrawlError, CrawlSink, Crawler, DriveAdapter, DropboxAdapter, FixtureClient, NodeSnapshot,
	ProviderAdapter, ProviderKind, WebDavAdapter,
};

///////////////////////
// Utility functions //
///////////////////////

fn cli() -> Command {
	Command::new("cloudscan")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Rate-limited crawler for remote storage account trees")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.global(true)
				.help("Config file (.toml, .json or .json5)"),
		)
		.arg(Arg::new("log-level").long("log-level").value_name("LEVEL").global(true).help("Log level"))
		.arg(
			Arg::new("log-format")
				.long("log-format")
				.value_name("FORMAT")
				.value_parser(["pretty", "compact"])
				.global(true)
				.help("Log format"),
		)
		.subcommand(
			Command::new("crawl")
				.about("Crawl a recorded account listing")
				.arg(Arg::new("fixture").short('f').long("fixture").value_name("FILE").help("Listing fixture (JSON5)"))
				.arg(
					Arg::new("provider")
						.short('p')
						.long("provider")
						.value_name("PROVIDER")
						.help("Backend: dropbox, webdav or drive"),
				)
				.arg(Arg::new("root").short('r').long("root").value_name("PATH").help("Directory to start from"))
				.arg(Arg::new("interval-ms").long("interval-ms").value_name("MS").help("Spacing between requests"))
				.arg(Arg::new("cooldown-ms").long("cooldown-ms").value_name("MS").help("Pause after a rate limit"))
				.arg(
					Arg::new("output")
						.short('o')
						.long("output")
						.value_name("MODE")
						.value_parser(["text", "json", "quiet"])
						.help("Tree output"),
				)
				.arg(
					Arg::new("no-synthetic")
						.long("no-synthetic")
						.action(ArgAction::SetTrue)
						.help("Do not add free space / trash entries under \"/\""),
				),
		)
		.subcommand(
			Command::new("check-config")
				.about("Validate a config file and print the effective settings")
				.arg(Arg::new("file").required(true)),
		)
}

fn load_config(path: Option<&String>) -> Result<Config, CrawlError> {
	let mut config = match path {
		Some(path) => Config::from_file(Path::new(path))?,
		None => Config::default(),
	};
	config.apply_env()?;
	Ok(config)
}

fn parse_ms(matches: &ArgMatches, name: &str) -> Result<Option<u64>, CrawlError> {
	match matches.get_one::<String>(name) {
		Some(value) => value
			.parse()
			.map(Some)
			.map_err(|_| CrawlError::InvalidConfig { message: format!("--{}: not a number: {}", name, value) }),
		None => Ok(None),
	}
}

fn apply_cli(config: &mut Config, global: &ArgMatches, crawl: &ArgMatches) -> Result<(), CrawlError> {
	if let Some(level) = global.get_one::<String>("log-level") {
		config.log_level = level.clone();
	}
	if let Some(format) = global.get_one::<String>("log-format") {
		config.log_format = if format == "compact" { LogFormat::Compact } else { LogFormat::Pretty };
	}
	if let Some(fixture) = crawl.get_one::<String>("fixture") {
		config.fixture = Some(PathBuf::from(fixture));
	}
	if let Some(provider) = crawl.get_one::<String>("provider") {
		config.provider = provider.parse::<ProviderKind>()?;
	}
	if let Some(root) = crawl.get_one::<String>("root") {
		config.root = root.clone();
	}
	if let Some(ms) = parse_ms(crawl, "interval-ms")? {
		config.pacing.interval_ms = ms;
	}
	if let Some(ms) = parse_ms(crawl, "cooldown-ms")? {
		config.pacing.cooldown_ms = ms;
	}
	if let Some(output) = crawl.get_one::<String>("output") {
		config.output = match output.as_str() {
			"json" => OutputMode::Json,
			"quiet" => OutputMode::Quiet,
			_ => OutputMode::Text,
		};
	}
	if crawl.get_flag("no-synthetic") {
		config.synthetic_entries = false;
	}
	Ok(())
}

fn format_size(bytes: u64) -> String {
	const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
	let mut value = bytes as f64;
	let mut unit = 0;
	while value >= 1024.0 && unit < UNITS.len() - 1 {
		value /= 1024.0;
		unit += 1;
	}
	if unit == 0 {
		format!("{} {}", bytes, UNITS[0])
	} else {
		format!("{:.1} {}", value, UNITS[unit])
	}
}

fn print_tree(node: &NodeSnapshot) {
	let indent = "  ".repeat(node.level as usize);
	let label = if node.level == 0 { node.path.as_str() } else { node.name.as_str() };
	if node.is_dir {
		println!("{}{}/ ({})", indent, label.trim_end_matches('/'), format_size(node.file_bytes()));
	} else {
		println!("{}{} ({})", indent, label, format_size(node.size));
	}
	for child in node.children() {
		print_tree(child);
	}
}

fn summary(tree: &NodeSnapshot, stats: &ProgressStats) -> String {
	format!(
		"{} nodes, {} in files, {} requests, {} rate limits, {} dropped units, progress {}/{}",
		tree.count(),
		format_size(tree.file_bytes()),
		stats.issued,
		stats.rate_limited,
		stats.dropped,
		stats.completed,
		stats.bound
	)
}

///////////
// Crawl //
///////////

async fn crawl_with<A: ProviderAdapter>(
	adapter: A,
	account: Option<AccountInfo>,
	config: &Config,
) -> Result<(NodeSnapshot, ProgressStats), CrawlError> {
	let counter = Arc::new(ProgressCounter::new());
	let sink = Arc::new(LoggingSink::new(Arc::clone(&counter)));

	let mut crawler = Crawler::new(adapter)
		.with_sink(sink.clone())
		.with_pacing(config.pacing.clone())
		.with_synthetic_entries(config.synthetic_entries);
	if let Some(account) = account {
		sink.on_authenticated(&account);
		crawler = crawler.with_account(account);
	}

	let handle = crawler.spawn();
	handle.run(config.root.clone()).await?;
	handle.wait_idle().await?;
	let tree = handle.tree().await?;
	handle.shutdown().await?;
	Ok((tree, counter.stats()))
}

async fn crawl(config: &Config) -> Result<(), Box<dyn Error>> {
	let fixture =
		config.fixture.as_deref().ok_or("crawl: a listing fixture is required (--fixture or config `fixture`)")?;
	info!(provider = %config.provider, fixture = %fixture.display(), "loading listing");

	let (tree, stats) = match config.provider {
		ProviderKind::Dropbox => {
			let client = Arc::new(FixtureClient::<DropboxMetadata>::from_file(fixture)?);
			let account = client.account().cloned();
			crawl_with(DropboxAdapter::new(client), account, config).await?
		}
		ProviderKind::Webdav => {
			let client = Arc::new(FixtureClient::<DavResponse>::from_file(fixture)?);
			let account = client.account().cloned();
			crawl_with(WebDavAdapter::new(client), account, config).await?
		}
		ProviderKind::Drive => {
			let client = Arc::new(FixtureClient::<DriveItem>::from_file(fixture)?);
			let account = client.account().cloned();
			crawl_with(DriveAdapter::new(client), account, config).await?
		}
	};

	match config.output {
		OutputMode::Text => {
			print_tree(&tree);
			println!("{}", summary(&tree, &stats));
		}
		OutputMode::Json => {
			println!("{}", serde_json::to_string_pretty(&tree)?);
			eprintln!("{}", summary(&tree, &stats));
		}
		OutputMode::Quiet => println!("{}", summary(&tree, &stats)),
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = cli().get_matches();

	if let Some(sub_matches) = matches.subcommand_matches("check-config") {
		let file = sub_matches.get_one::<String>("file").ok_or("check-config: file argument required")?;
		let config = load_config(Some(file))?;
		config.validate()?;
		print!("{}", config.to_toml()?);
		return Ok(());
	}

	if let Some(sub_matches) = matches.subcommand_matches("crawl") {
		let mut config = load_config(matches.get_one::<String>("config"))?;
		apply_cli(&mut config, &matches, sub_matches)?;
		config.validate()?;
		logging::init_tracing(&config.log_level, config.log_format);
		crawl(&config).await?;
	}

	Ok(())
}


// vim: ts=4
