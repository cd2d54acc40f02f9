//! normrules - Build normative rule lists from tagged standards text

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use owo_colors::OwoColorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use normrules::output::{OutputFormat, write_output};
use normrules::report::{render_changes, render_validation};
use normrules::{DEFAULT_CONFIG_PATH, ResolveSettings, load_config, load_config_or_default};
use normrules_core::changes::merge_additions;
use normrules_core::{FieldType, Resolver, TagStore, detect_changes};

#[derive(Parser, Debug)]
#[command(
    name = "normrules",
    version,
    about = "Build normative rule lists from tagged standards text"
)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve rule definitions against tags and write the rule list
    Resolve(ResolveArgs),

    /// Compare a reference tag file against a current one
    TagDiff(TagDiffArgs),
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// Tag file (repeatable)
    #[arg(short = 't', long = "tags", value_name = "FILE")]
    tags: Vec<PathBuf>,

    /// Rule definition file (repeatable)
    #[arg(short = 'd', long = "defs", value_name = "FILE")]
    defs: Vec<PathBuf>,

    /// Standards document URL for a tag file (repeatable)
    #[arg(long = "tag-url", num_args = 2, value_names = ["TAG_FILE", "URL"])]
    tag_url: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,

    /// Report unreferenced tags without failing
    #[arg(short, long)]
    warn_orphans: bool,

    /// Output file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Config file (default: .config/normrules/config.yaml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TagDiffArgs {
    /// Reference tag file
    reference: PathBuf,

    /// Current tag file
    current: PathBuf,

    /// Add new tags from the current file to the reference file
    #[arg(short = 'u', long)]
    update_reference: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("normrules=debug,normrules_core=debug")
        } else {
            EnvFilter::new("normrules=info,normrules_core=info")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Resolve(args) => run_resolve_command(args),
        Command::TagDiff(args) => run_tag_diff_command(args, cli.verbose),
    }
}

const RESOLVE_USAGE: &str = "normrules resolve -t <tags.json> -d <defs.yaml> -o <out>";

fn run_resolve_command(args: ResolveArgs) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_config_or_default(Path::new(DEFAULT_CONFIG_PATH))?,
    };

    let tag_urls = args
        .tag_url
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    let settings = ResolveSettings::from_config(config).with_args(
        args.tags,
        args.defs,
        tag_urls,
        args.warn_orphans,
    );

    if settings.tag_files.is_empty() {
        eyre::bail!("No tag files specified. Usage: {RESOLVE_USAGE}");
    }
    if settings.def_files.is_empty() {
        eyre::bail!("No definition files specified. Usage: {RESOLVE_USAGE}");
    }
    if args.format.needs_urls() && settings.tag_urls.is_empty() {
        eyre::bail!(
            "Output format {} needs at least one --tag-url <TAG_FILE> <URL> mapping",
            args.format.as_str()
        );
    }

    for (file, url) in &settings.tag_urls {
        tracing::info!("Tag file {file} links to URL {url}");
    }

    eprintln!(
        "{} Loading {} tag files and {} definition files...",
        "->".blue().bold(),
        settings.tag_files.len(),
        settings.def_files.len()
    );
    let (tags, defs) = settings.load_stores()?;
    eprintln!(
        "   Found {} tags and {} rules",
        tags.len().to_string().green(),
        defs.len().to_string().green()
    );

    let urls = settings.url_map();
    let options = settings.resolve_options(args.format.needs_urls())?;
    let resolution = Resolver::new(&tags, &defs)
        .urls(&urls)
        .options(options)
        .resolve();

    eprint!("{}", render_validation(&resolution.report));

    let rules = match resolution.into_result() {
        Ok(rules) => rules,
        Err(failed) => {
            tracing::debug!("{failed}");
            return Ok(ExitCode::FAILURE);
        }
    };

    tracing::info!(
        "Storing {} normative rules into file {}",
        rules.len(),
        args.output.display()
    );
    tracing::info!(
        "Includes {} implementation-defined behavior normative rules",
        rules.impl_def_count()
    );
    for ft in FieldType::ALL {
        tracing::info!("Includes {} {ft} normative rules", rules.field_type_count(ft));
    }

    write_output(args.format, &rules, &urls, &args.output)?;

    eprintln!(
        "\n{} Wrote {} rules to {}",
        "OK".green().bold(),
        rules.len(),
        args.output.display()
    );

    Ok(ExitCode::SUCCESS)
}

fn run_tag_diff_command(args: TagDiffArgs, verbose: bool) -> Result<ExitCode> {
    let mut reference = TagStore::new();
    reference.load_from(&args.reference).wrap_err_with(|| {
        format!("Failed to load reference tag file {}", args.reference.display())
    })?;

    let mut current = TagStore::new();
    current
        .load_from(&args.current)
        .wrap_err_with(|| format!("Failed to load current tag file {}", args.current.display()))?;

    let changes = detect_changes(&reference, &current);
    print!(
        "{}",
        render_changes(
            &changes,
            &args.reference.display().to_string(),
            &args.current.display().to_string(),
            verbose,
        )
    );

    if args.update_reference {
        if changes.added.is_empty() {
            println!("No additions to merge into {}", args.reference.display());
        } else {
            let (before, after) = merge_additions(&args.reference, &changes)
                .wrap_err_with(|| format!("Failed to update {}", args.reference.display()))?;
            println!(
                "Updated {}: added {} new tags ({} -> {} total tags)",
                args.reference.display(),
                changes.added.len(),
                before,
                after
            );
        }
    }

    if changes.is_breaking() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
