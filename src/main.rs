//! cfgtree CLI
//!
//! Entry point for the `cfgtree` command-line tool.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use cfgtree::{
    loader, CombinedConfiguration, Configuration, DefaultExpressionEngine, NodeCombiner,
    OverrideGranularity, SharedConfiguration, Symbols, TreeConfiguration,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cfgtree")]
#[command(about = "Combine configuration files and query the result", version)]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG applies otherwise
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value of a key in the combined configuration
    Get {
        key: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// List all keys of the combined configuration
    Keys {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Print the combined configuration
    Dump {
        /// Print the tree as JSON instead of key = value lines
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Show which source provides a key
    Which {
        key: String,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// List the loaded sources with their provenance
    Sources {
        /// Output in JSON format
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        sources: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Configuration file, optionally placed below a key (PATH@AT).
    /// Earlier files take priority.
    #[arg(long = "file", short = 'f', value_name = "PATH[@AT]")]
    files: Vec<String>,

    /// Also load every .toml and .json file below this directory, after the
    /// files given with -f
    #[arg(long)]
    dir: Option<PathBuf>,

    /// How the sources are merged [default: union]
    #[arg(long, value_enum)]
    combiner: Option<CombinerArg>,

    /// Node name whose occurrences are concatenated instead of merged
    #[arg(long = "list-node", value_name = "NAME")]
    list_nodes: Vec<String>,

    /// TOML file with combiner, list nodes and key syntax; command-line
    /// options take precedence
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum CombinerArg {
    Union,
    Override,
    OverrideSubtree,
}

/// Combination settings read from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    combiner: Option<CombinerArg>,
    list_nodes: Vec<String>,
    key_syntax: Symbols,
}

/// A source as given on the command line.
struct Loaded {
    name: String,
    at: Option<String>,
    config: Arc<TreeConfiguration>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Get { key, json, sources } => run_get(&key, json, &sources),
        Commands::Keys { sources } => run_keys(&sources),
        Commands::Dump { json, sources } => run_dump(json, &sources),
        Commands::Which { key, sources } => run_which(&key, &sources),
        Commands::Sources { json, sources } => run_sources(json, &sources),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_get(key: &str, json: bool, args: &SourceArgs) {
    let (combined, _) = open(args);
    let value = match combined.get_property(key) {
        Ok(Some(v)) => v,
        Ok(None) => {
            eprintln!("Key not found: {}", key);
            process::exit(1);
        }
        Err(e) => fail("Error reading configuration", e),
    };

    if json {
        print_json(&value);
        return;
    }
    match value {
        Value::Array(items) => items.iter().for_each(|v| println!("{}", render(v))),
        single => println!("{}", render(&single)),
    }
}

fn run_keys(args: &SourceArgs) {
    let (combined, _) = open(args);
    match combined.keys() {
        Ok(keys) => keys.iter().for_each(|k| println!("{}", k)),
        Err(e) => fail("Error reading configuration", e),
    }
}

fn run_dump(json: bool, args: &SourceArgs) {
    let (combined, _) = open(args);

    if json {
        match combined.combined_root() {
            Ok(root) => print_json(&root.to_json()),
            Err(e) => fail("Error reading configuration", e),
        }
        return;
    }

    let keys = match combined.keys() {
        Ok(keys) => keys,
        Err(e) => fail("Error reading configuration", e),
    };
    for key in keys {
        match combined.get_property(&key) {
            Ok(Some(value)) => println!("{} = {}", key, value),
            Ok(None) => {}
            Err(e) => fail("Error reading configuration", e),
        }
    }
}

fn run_which(key: &str, args: &SourceArgs) {
    let (combined, loaded) = open(args);
    match combined.source_index(key) {
        Ok(Some(index)) => println!("{}", loaded[index].name),
        Ok(None) => {
            eprintln!("Key not found: {}", key);
            process::exit(1);
        }
        Err(e) => fail("Error reading configuration", e),
    }
}

fn run_sources(json: bool, args: &SourceArgs) {
    let (_, loaded) = open(args);

    if json {
        let entries: Vec<Value> = loaded
            .iter()
            .map(|l| {
                serde_json::json!({
                    "name": l.name,
                    "at": l.at,
                    "source": l.config.source(),
                })
            })
            .collect();
        print_json(&Value::Array(entries));
        return;
    }

    for l in &loaded {
        let at = l.at.as_deref().unwrap_or("-");
        match l.config.source() {
            Some(info) => println!(
                "{}  at={}  format={:?}  sha256={}  loaded={}",
                l.name,
                at,
                info.format,
                info.digest,
                info.loaded_at.to_rfc3339()
            ),
            None => println!("{}  at={}", l.name, at),
        }
    }
}

/// Load all sources and combine them in command-line order.
fn open(args: &SourceArgs) -> (CombinedConfiguration, Vec<Loaded>) {
    let settings = match &args.settings {
        Some(path) => load_settings(path).unwrap_or_else(|e| fail("Error loading settings", e)),
        None => Settings::default(),
    };
    let mut loaded = Vec::new();
    let mut names = HashSet::new();

    for spec in &args.files {
        let (path, at) = split_source(spec);
        match loader::load_file(&PathBuf::from(path)) {
            Ok(config) => loaded.push(Loaded {
                name: unique_name(&mut names, spec),
                at: at.map(str::to_string),
                config: Arc::new(config),
            }),
            Err(e) => fail("Error loading configuration", e),
        }
    }

    if let Some(dir) = &args.dir {
        match loader::load_dir(dir) {
            Ok(configs) => loaded.extend(configs.into_iter().map(|(path, config)| Loaded {
                name: unique_name(&mut names, &path.display().to_string()),
                at: None,
                config: Arc::new(config),
            })),
            Err(e) => fail("Error loading configuration", e),
        }
    }

    if loaded.is_empty() {
        eprintln!("No configuration sources given (use -f or --dir)");
        process::exit(1);
    }

    let engine = DefaultExpressionEngine::new(settings.key_syntax.clone());
    let combined = CombinedConfiguration::new(combiner(args, &settings))
        .with_expression_engine(Arc::new(engine));
    for l in &loaded {
        let config = Arc::clone(&l.config) as SharedConfiguration;
        if let Err(e) = combined.add_configuration(config, Some(&l.name), l.at.as_deref()) {
            fail("Error combining configuration", e);
        }
    }
    debug!(sources = loaded.len(), "combined configuration ready");

    (combined, loaded)
}

fn load_settings(path: &Path) -> cfgtree::Result<Settings> {
    let text = fs::read_to_string(path).map_err(|e| cfgtree::Error::Io(path.to_path_buf(), e))?;
    parse_settings(&text)
}

fn parse_settings(text: &str) -> cfgtree::Result<Settings> {
    toml::from_str(text).map_err(|e| cfgtree::Error::Parse(format!("TOML parse error: {}", e)))
}

fn combiner(args: &SourceArgs, settings: &Settings) -> NodeCombiner {
    let kind = args.combiner.or(settings.combiner).unwrap_or(CombinerArg::Union);
    let mut combiner = match kind {
        CombinerArg::Union => NodeCombiner::union(),
        CombinerArg::Override => NodeCombiner::override_with(OverrideGranularity::Leaf),
        CombinerArg::OverrideSubtree => NodeCombiner::override_with(OverrideGranularity::Subtree),
    };
    for name in settings.list_nodes.iter().chain(&args.list_nodes) {
        combiner.add_list_node(name.as_str());
    }
    combiner
}

/// Split `PATH@AT` at the last `@`.
///
/// An `@` followed by a path separator belongs to the path. An empty `AT`
/// means no graft path.
fn split_source(spec: &str) -> (&str, Option<&str>) {
    match spec.rsplit_once('@') {
        Some((path, at)) if path.is_empty() || at.contains(&['/', '\\'][..]) => (spec, None),
        Some((path, "")) => (path, None),
        Some((path, at)) => (path, Some(at)),
        None => (spec, None),
    }
}

/// `base`, or `base#N` when that name is taken.
fn unique_name(taken: &mut HashSet<String>, base: &str) -> String {
    let mut name = base.to_string();
    let mut n = 1;
    while !taken.insert(name.clone()) {
        n += 1;
        name = format!("{}#{}", base, n);
    }
    name
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn fail(context: &str, e: cfgtree::Error) -> ! {
    eprintln!("{}: {}", context, e);
    process::exit(1);
}
