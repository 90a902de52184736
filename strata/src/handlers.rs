use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_core::config::WalkConfig;
use strata_core::report::{
    OutputFormat, generate_terminal_json, generate_walk_report, save_report,
};
use strata_core::{WalkOptions, execute_walk};
use strata_scanner::{Extract, HtmlExtractor};
use tracing::{Level, debug};

/// Install the stderr log subscriber. Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Expand `~` in a user-supplied path
pub fn expand_path(raw: &Path) -> PathBuf {
    let raw = raw.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Command-line values that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct WalkOverrides {
    pub seed_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub user_agent: Option<String>,
    pub retries: Option<u32>,
    pub backoff_factor: Option<f64>,
    pub timeout_secs: Option<u64>,
}

impl WalkOverrides {
    pub fn from_matches(args: &ArgMatches) -> Self {
        Self {
            seed_url: args.get_one::<String>("seed-url").cloned(),
            output_dir: args.get_one::<PathBuf>("output").cloned(),
            format: args
                .get_one::<String>("format")
                .and_then(|f| OutputFormat::from_str(f)),
            user_agent: args.get_one::<String>("user-agent").cloned(),
            retries: args.get_one::<u32>("retries").copied(),
            backoff_factor: args.get_one::<f64>("backoff").copied(),
            timeout_secs: args.get_one::<u64>("timeout").copied(),
        }
    }

    pub fn apply(&self, config: &mut WalkConfig) {
        if let Some(ref seed_url) = self.seed_url {
            config.seed_url = seed_url.clone();
        }
        if let Some(ref output_dir) = self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(ref user_agent) = self.user_agent {
            config.user_agent = Some(user_agent.clone());
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(backoff_factor) = self.backoff_factor {
            config.backoff_factor = backoff_factor;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
    }
}

/// Load a configuration file, apply overrides and validate the result
pub fn load_config(path: &Path, overrides: &WalkOverrides) -> Result<WalkConfig> {
    let path = expand_path(path);
    let mut config = WalkConfig::from_file(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    overrides.apply(&mut config);
    config.validate()?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

/// Write the sample configuration to `path`, refusing to clobber an
/// existing file unless `force` is set.
pub fn write_config_template(path: &Path, force: bool) -> Result<PathBuf> {
    let path = expand_path(path);
    if path.exists() && !force {
        bail!(
            "{} already exists; use --force to overwrite it",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(&path, WalkConfig::default_template())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

/// Compile every selector and describe what a walk would do, without
/// touching the network.
pub fn describe_plan(config: &WalkConfig) -> Result<String> {
    config.validate()?;
    let extractor = HtmlExtractor::new();

    let mut plan = String::new();
    plan.push_str(&format!("Seed: {}\n", config.seed_url));
    for (depth, target) in config.targets.iter().enumerate() {
        extractor
            .compile(&target.selector)
            .with_context(|| format!("Target at depth {} is invalid", depth))?;

        plan.push_str(&format!("  Depth {}: {}\n", depth + 1, target.selector));
        for (key, value) in &target.params {
            plan.push_str(&format!("    {}={}\n", key, value));
        }
    }
    plan.push_str(&format!("Output: {}\n", config.output_path().display()));
    Ok(plan)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<String>("PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("strata.json"));
    let force = args.get_flag("force");

    let written = write_config_template(&path, force)?;
    println!(
        "{} Sample configuration written to {}",
        "✓".green().bold(),
        written.display().to_string().bright_white()
    );
    println!(
        "{} Edit the seed URL and targets, then run: strata walk --config {}",
        "→".blue(),
        written.display()
    );
    Ok(())
}

pub fn handle_check(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("config")
        .context("--config is required")?;
    let config = load_config(path, &WalkOverrides::default())?;
    let plan = describe_plan(&config)?;

    println!("{} Configuration is valid", "✓".green().bold());
    print!("{}", plan);
    Ok(())
}

pub async fn handle_walk(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("config")
        .context("--config is required")?;
    let overrides = WalkOverrides::from_matches(args);
    let config = load_config(path, &overrides)?;
    let terminal_out = args.get_one::<PathBuf>("terminal-out").map(|p| expand_path(p));

    print_divider();
    println!(
        "{} {}",
        "  WALKING".bright_white().bold(),
        config.seed_url.bright_white()
    );
    print_divider();
    println!("Depth levels: {}", config.targets.len());
    println!("Output: {}\n", config.output_path().display());

    let options = WalkOptions {
        config,
        show_progress_bars: !args.get_flag("no-progress"),
    };
    let message_callback = Arc::new(|msg: String| {
        println!("{} {}", "→".blue(), msg);
    });

    let summary = execute_walk(options, Some(message_callback))
        .await
        .context("Walk failed")?;

    println!("\n{} Walk complete!\n", "✓".green().bold());
    print!("{}", generate_walk_report(&summary.outcome));

    if let Some(terminal_path) = terminal_out {
        let json = generate_terminal_json(&summary.outcome)?;
        save_report(&json, &terminal_path)
            .with_context(|| format!("Failed to write {}", terminal_path.display()))?;
        println!(
            "{} Terminal frontier saved to {}",
            "✓".green().bold(),
            terminal_path.display().to_string().bright_white()
        );
    }

    Ok(())
}
