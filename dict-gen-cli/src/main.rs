use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};

use dict_gen_core::io::build_output_path;
use dict_gen_core::model::extractor::Extractor;
use dict_gen_core::model::ngram_counts::NgramCounts;
use dict_gen_core::pipeline::{self, BuildConfig};
use dict_gen_core::{
	ExtractOptions, LogObserver, MergeEngine, MergeOptions, MergeStrategy, Observer, SourceFormat,
};

/// Default number of entries kept when converting a CSV word list.
const CSV_DEFAULT_LIMIT: usize = 50_000;

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about = "Word-frequency dictionary and n-gram table builder",
	long_about = None
)]
struct Cli {
	/// Increase log verbosity (-v debug, -vv trace)
	#[arg(short = 'v', long, global = true, action = ArgAction::Count)]
	verbose: u8,

	/// Decrease log verbosity (-q warnings, -qq errors only)
	#[arg(short = 'q', long, global = true, action = ArgAction::Count)]
	quiet: u8,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Extract bigram and trigram tables from a text corpus
	Extract(ExtractArgs),
	/// Count the n-grams of one corpus shard into a partial file
	ExtractShard(ExtractShardArgs),
	/// Combine partial counts into filtered n-gram tables
	Combine(CombineArgs),
	/// Merge several word-frequency dictionaries
	Merge(MergeArgs),
	/// Convert a frequency list or CSV into the JSON dictionary format
	Convert(ConvertArgs),
	/// Run the extraction and merge steps for one language
	Build(BuildArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
	/// Text corpus, one sentence per line
	input: PathBuf,
	bigrams_out: PathBuf,
	trigrams_out: PathBuf,
	/// Minimum count for an n-gram to be kept
	#[arg(long, value_name = "FREQ", default_value_t = 1)]
	min_freq: u64,
	/// Worker threads (defaults to the number of CPUs)
	#[arg(long, value_name = "N")]
	workers: Option<usize>,
}

#[derive(Args, Debug)]
struct ExtractShardArgs {
	input: PathBuf,
	/// Partial counts file (defaults to the input with a `.bin` extension)
	partial_out: Option<PathBuf>,
	#[arg(long, value_name = "N")]
	workers: Option<usize>,
}

#[derive(Args, Debug)]
struct CombineArgs {
	/// Partial count files produced by `extract-shard`
	#[arg(required = true)]
	partials: Vec<PathBuf>,
	#[arg(long, value_name = "PATH")]
	bigrams: PathBuf,
	#[arg(long, value_name = "PATH")]
	trigrams: PathBuf,
	#[arg(long, value_name = "FREQ", default_value_t = 1)]
	min_freq: u64,
}

#[derive(Args, Debug)]
struct MergeArgs {
	/// Dictionaries to merge, most authoritative first
	#[arg(required = true)]
	inputs: Vec<PathBuf>,
	#[arg(short, long, value_name = "PATH")]
	output: PathBuf,
	/// max, sum, avg or weighted
	#[arg(short, long, value_name = "STRATEGY", default_value_t = MergeStrategy::Max)]
	strategy: MergeStrategy,
	#[arg(short = 'm', long, value_name = "FREQ", default_value_t = 1)]
	min_freq: u64,
	/// Keep only the first N entries of each source
	#[arg(long, value_name = "N")]
	limit: Option<usize>,
}

#[derive(Args, Debug)]
struct ConvertArgs {
	input: PathBuf,
	output: PathBuf,
	/// list, csv or json (detected from the extension when omitted)
	#[arg(long, value_name = "FORMAT")]
	format: Option<SourceFormat>,
	/// Keep only the first N entries (CSV defaults to 50000)
	#[arg(long, value_name = "N")]
	limit: Option<usize>,
}

#[derive(Args, Debug)]
struct BuildArgs {
	/// JSON build description; flags override its fields
	#[arg(long, value_name = "PATH")]
	config: Option<PathBuf>,
	#[arg(short, long, value_name = "CODE")]
	language: Option<String>,
	#[arg(long)]
	extract_ngrams: bool,
	#[arg(long)]
	merge: bool,
	/// Enable every step
	#[arg(long)]
	all: bool,
	#[arg(long, value_name = "DIR")]
	corpora_dir: Option<PathBuf>,
	#[arg(long, value_name = "DIR")]
	base_dir: Option<PathBuf>,
	#[arg(long, value_name = "DIR")]
	output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose, cli.quiet);

	match cli.command {
		Commands::Extract(args) => run_extract(args),
		Commands::ExtractShard(args) => run_extract_shard(args),
		Commands::Combine(args) => run_combine(args),
		Commands::Merge(args) => run_merge(args),
		Commands::Convert(args) => run_convert(args),
		Commands::Build(args) => run_build(args),
	}
}

fn init_logging(verbose: u8, quiet: u8) {
	use log::LevelFilter;

	let level = match (quiet, verbose) {
		(0, 0) => LevelFilter::Info,
		(0, 1) => LevelFilter::Debug,
		(0, _) => LevelFilter::Trace,
		(1, _) => LevelFilter::Warn,
		_ => LevelFilter::Error,
	};

	let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
	builder.format_timestamp_millis();
	builder.filter_level(level);
	let _ = builder.try_init();
}

fn extract_options(min_freq: u64, workers: Option<usize>) -> ExtractOptions {
	let mut options = ExtractOptions::new(min_freq);
	if let Some(workers) = workers {
		options.workers = workers;
	}
	options
}

fn run_extract(args: ExtractArgs) -> Result<()> {
	let observer = LogObserver;
	let options = extract_options(args.min_freq, args.workers);
	let extractor = Extractor::new(options)?.with_observer(&observer);
	let tables = extractor
		.extract_file(&args.input)
		.with_context(|| format!("extracting n-grams from {}", args.input.display()))?;

	pipeline::save_ngrams(&tables, &args.bigrams_out, &args.trigrams_out)?;
	observer.artifact_written(&args.bigrams_out);
	observer.artifact_written(&args.trigrams_out);
	Ok(())
}

fn run_extract_shard(args: ExtractShardArgs) -> Result<()> {
	let output = match args.partial_out {
		Some(path) => path,
		None => build_output_path(&args.input, "bin")
			.with_context(|| format!("deriving an output path from {}", args.input.display()))?,
	};

	let observer = LogObserver;
	let extractor = Extractor::new(extract_options(1, args.workers))?.with_observer(&observer);
	let (counts, lines) = extractor
		.count_file(&args.input)
		.with_context(|| format!("counting n-grams of {}", args.input.display()))?;

	counts.save_partial(&output)?;
	info!(
		"{lines} lines, {} bigrams and {} trigrams before filtering",
		counts.bigram_len(),
		counts.trigram_len()
	);
	observer.artifact_written(&output);
	Ok(())
}

fn run_combine(args: CombineArgs) -> Result<()> {
	let observer = LogObserver;
	let extractor = Extractor::new(ExtractOptions::new(args.min_freq))?.with_observer(&observer);

	let mut total = NgramCounts::new();
	for path in &args.partials {
		let partial = NgramCounts::load_partial(path)
			.with_context(|| format!("loading partial counts {}", path.display()))?;
		total.merge(&partial);
	}

	// line counts are not stored in partials
	let tables = extractor.finish(total, 0)?;
	pipeline::save_ngrams(&tables, &args.bigrams, &args.trigrams)?;
	observer.artifact_written(&args.bigrams);
	observer.artifact_written(&args.trigrams);
	Ok(())
}

fn run_merge(args: MergeArgs) -> Result<()> {
	let options = MergeOptions {
		strategy: args.strategy,
		min_freq: args.min_freq,
		limit: args.limit,
	};
	let observer = LogObserver;
	let engine = MergeEngine::new(options)?.with_observer(&observer);

	let report = engine.merge_sources(&args.inputs).context("merging dictionaries")?;
	for failure in &report.failures {
		warn!("{} was not merged", failure.path.display());
	}

	pipeline::save_dictionary(&args.output, &report.entries)?;
	observer.artifact_written(&args.output);
	Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<()> {
	let format = args.format.unwrap_or_else(|| SourceFormat::detect(&args.input));
	let limit = match (args.limit, format) {
		(Some(limit), _) => Some(limit),
		(None, SourceFormat::Csv) => Some(CSV_DEFAULT_LIMIT),
		(None, _) => None,
	};

	let written = pipeline::convert(&args.input, format, &args.output, limit)
		.with_context(|| format!("converting {}", args.input.display()))?;
	info!("converted {written} entries from {} ({format})", args.input.display());
	LogObserver.artifact_written(&args.output);
	Ok(())
}

fn build_config(args: BuildArgs) -> Result<BuildConfig> {
	let mut config = match (&args.config, args.language) {
		(Some(path), language) => {
			let mut config = BuildConfig::from_file(path)?;
			if let Some(language) = language {
				config.language = language;
			}
			config
		}
		(None, Some(language)) => BuildConfig::new(language),
		(None, None) => bail!("either --config or --language is required"),
	};

	config.extract_ngrams |= args.extract_ngrams || args.all;
	config.merge |= args.merge || args.all;
	if let Some(dir) = args.corpora_dir {
		config.corpora_dir = dir;
	}
	if let Some(dir) = args.base_dir {
		config.base_dir = dir;
	}
	if args.output_dir.is_some() {
		config.output_dir = args.output_dir;
	}
	Ok(config)
}

fn run_build(args: BuildArgs) -> Result<()> {
	let config = build_config(args)?;
	info!("building '{}' from {}", config.language, config.corpora_dir.display());

	let report = pipeline::build(&config, &LogObserver)?;
	if report.ngrams.is_none() && report.merged.is_none() {
		warn!("nothing was built for '{}'", config.language);
	}
	print_artifact("bigrams", report.ngrams.as_ref().map(|(b, _)| b.as_path()));
	print_artifact("trigrams", report.ngrams.as_ref().map(|(_, t)| t.as_path()));
	print_artifact("merged", report.merged.as_deref());
	Ok(())
}

fn print_artifact(label: &str, path: Option<&Path>) {
	if let Some(path) = path {
		println!("{label}: {}", path.display());
	}
}
