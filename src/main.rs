use kwild::action::{label_summary, ActionPlan, DryRunExecutor, MatchedRef, Verb};
use kwild::cli::{Cli, Commands, ConfigAction, SelectArgs};
use kwild::config::Config;
use kwild::discovery::{JsonListDiscovery, ResourceDiscovery};
use kwild::error::{KwildError, Result};
use kwild::filtering::{CompiledFilter, FilterPipeline};
use std::path::PathBuf;
use std::sync::Arc;

fn main() {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Config { action } = cli.command {
        return cmd_config(cli.config, action);
    }
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Get {
            select,
            group_by_label,
        } => {
            let keep_labels = group_by_label.is_some();
            cmd_select(&config, Verb::Get, &select, keep_labels, |plan| {
                match group_by_label {
                    Some(key) => {
                        print_label_summary(plan.refs(), &key);
                        Ok(Some(plan.with_flag("-L").with_flag(key)))
                    }
                    None => Ok(Some(plan)),
                }
            })
        }
        Commands::Describe { select } => {
            cmd_select(&config, Verb::Describe, &select, false, |plan| Ok(Some(plan)))
        }
        Commands::Top { select } => {
            cmd_select(&config, Verb::Top, &select, false, |plan| Ok(Some(plan)))
        }
        Commands::Delete {
            select,
            yes,
            dry_run,
            server_dry_run,
            confirm_threshold,
        } => {
            let threshold = confirm_threshold.unwrap_or(config.actions.confirm_threshold);
            cmd_select(&config, Verb::Delete, &select, false, |plan| {
                plan.check_confirm_threshold(threshold, yes)?;
                if dry_run {
                    println!("{}", plan.dry_run_summary());
                    return Ok(None);
                }
                if server_dry_run {
                    return Ok(Some(plan.with_flag("--dry-run=server")));
                }
                Ok(Some(plan))
            })
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "kwild=debug" } else { "kwild=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Compile, discover, filter, then hand the plan to `finish`
///
/// `finish` may adjust the plan, or return `None` when nothing should run.
fn cmd_select<F>(
    config: &Config,
    verb: Verb,
    select: &SelectArgs,
    keep_labels: bool,
    finish: F,
) -> Result<()>
where
    F: FnOnce(ActionPlan) -> Result<Option<ActionPlan>>,
{
    let mut spec = config.base_spec(&select.resource, select.profile.as_deref())?;
    select.apply_to(&mut spec);

    // Bad patterns fail here, before any input is read
    let filter = Arc::new(CompiledFilter::compile(&spec)?);

    let discovery = JsonListDiscovery::from_arg(&select.input);
    let candidates = discovery.discover(&select.resource)?;

    let pipeline = FilterPipeline::new(filter);
    let workers = config.pipeline.workers_for(candidates.len());
    let (matched, stats) = pipeline.filter_parallel(&candidates, workers);

    tracing::info!(
        "Matched {} of {} {} in {}ms",
        stats.matched,
        stats.candidates,
        select.resource,
        stats.processing_time_ms
    );

    if matched.is_empty() {
        eprintln!("No {} matched given criteria.", select.resource);
        return Ok(());
    }

    let refs: Vec<MatchedRef> = matched
        .iter()
        .map(|c| MatchedRef::from_candidate(c, keep_labels))
        .collect();

    let batch_size = select.batch_size.unwrap_or(config.actions.batch_size);
    let plan = ActionPlan::new(verb, &select.resource, refs, spec.all_namespaces)
        .with_batch_size(batch_size);

    let Some(plan) = finish(plan)? else {
        return Ok(());
    };

    let mut executor = DryRunExecutor::new(std::io::stdout().lock());
    plan.execute(&mut executor)?;
    Ok(())
}

fn print_label_summary(refs: &[MatchedRef], key: &str) {
    eprintln!("Grouping by label {}:", key);
    for (value, count) in label_summary(refs, key) {
        eprintln!("{} → {}", value, count);
    }
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path)?;
            let value = serde_json::to_value(&config).map_err(|e| KwildError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let shown = match section {
                Some(section) => value
                    .get(&section)
                    .cloned()
                    .ok_or_else(|| KwildError::Config(format!("Unknown section '{}'", section)))?,
                None => value,
            };

            let json = serde_json::to_string_pretty(&shown).map_err(|e| KwildError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Profiles: {}", config.profiles.len());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::debug!("Config file not found, using defaults. Run 'kwild config init' to create one.");
    }
    Config::load_or_default(&path)
}
