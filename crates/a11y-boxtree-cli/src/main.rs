use a11y_boxtree_config::Config;
use a11y_boxtree_engine::{
    BoxNode, EntryStatus, Fragment, Outcome, Remediation, RemediationStack, Rewrite, Transformer,
    io,
};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "a11y-boxtree")]
#[command(about = "Apply accessibility remediations to CSS box trees")]
struct Args {
    /// Config file (defaults to ~/.config/a11y-boxtree/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a remediation plan and write the resulting tree
    Apply {
        /// Box tree JSON
        document: PathBuf,
        /// Plan JSON: an array of remediations (defaults to the configured plan_path)
        #[arg(long, short)]
        plan: Option<PathBuf>,
        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Run rewrites on one fragment, e.g. `run doc.json b0-s3 "markupHeading(H1)"`
    Run {
        document: PathBuf,
        fragment: String,
        #[arg(required = true)]
        rewrites: Vec<String>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the path key of every box
    Keys { document: PathBuf },
    /// Print the keys of the leaf blocks a fragment id (e.g. `b1-i0-s1`) covers
    Locate { document: PathBuf, fragment: String },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let loaded = match path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_context(|| format!("Config file not found: {}", path.display()))?,
        None => Config::load()?.unwrap_or_default(),
    };
    Ok(loaded)
}

fn init_logging(config: &Config) {
    let level = log::LevelFilter::from_str(&config.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn parse_fragment(id: &str) -> Result<Fragment> {
    Fragment::from_str(id).with_context(|| format!("Invalid fragment id {id:?}"))
}

fn load_document(path: &Path) -> Result<BoxNode> {
    io::load_tree(path).with_context(|| format!("Failed to load box tree {}", path.display()))
}

fn write_document(document: &BoxNode, output: Option<&Path>, config: &Config) -> Result<()> {
    match output {
        Some(path) => io::save_tree(path, document, config.pretty)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", io::tree_to_string(document, config.pretty)?),
    }
    Ok(())
}

fn report(outcome: &Outcome, config: &Config) -> Result<()> {
    for entry in &outcome.reports {
        match &entry.status {
            EntryStatus::Applied => log::info!("remediation {}: applied", entry.index),
            EntryStatus::Inactive => log::info!("remediation {}: inactive", entry.index),
            EntryStatus::NotApplicable(reason) => {
                log::warn!("remediation {}: not applicable ({reason})", entry.index)
            }
        }
    }
    let skipped = outcome.not_applicable().count();
    if config.strict && skipped > 0 {
        bail!("{skipped} remediation(s) could not be applied");
    }
    Ok(())
}

fn apply(config: &Config, document: &Path, plan: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let plan = plan
        .or(config.plan_path.as_deref())
        .context("No plan given and no plan_path configured")?;
    let stack = io::load_plan(plan).with_context(|| format!("Failed to load plan {}", plan.display()))?;
    let source = load_document(document)?;

    let outcome = stack.apply(&source)?;
    write_document(&outcome.document, output, config)?;
    report(&outcome, config)
}

fn run(
    config: &Config,
    document: &Path,
    fragment: &str,
    rewrites: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let range = parse_fragment(fragment)?;
    let rewrites = rewrites
        .iter()
        .map(|r| r.parse::<Rewrite>())
        .collect::<Result<Vec<_>, _>>()?;
    let stack = RemediationStack::new(vec![Remediation::new(range, rewrites)]);
    let source = load_document(document)?;

    let outcome = stack.apply(&source)?;
    write_document(&outcome.document, output, config)?;
    report(&outcome, config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    init_logging(&config);
    log::debug!("using config {config:?}");

    match args.command {
        Command::Apply {
            document,
            plan,
            output,
        } => apply(&config, &document, plan.as_deref(), output.as_deref()),
        Command::Run {
            document,
            fragment,
            rewrites,
            output,
        } => run(&config, &document, &fragment, &rewrites, output.as_deref()),
        Command::Keys { document } => {
            for key in load_document(&document)?.keys() {
                println!("{key}");
            }
            Ok(())
        }
        Command::Locate { document, fragment } => {
            let document = load_document(&document)?;
            let fragment = parse_fragment(&fragment)?;
            for key in Transformer::fragment_keys(&document, &fragment)? {
                println!("{key}");
            }
            Ok(())
        }
    }
}
