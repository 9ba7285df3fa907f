//! proplink — resolve `${key}` placeholders across launch properties.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Init logger (CLI `-v` flags > `PROPLINK_LOG_LEVEL` > `RUST_LOG` > warn)
//!   4. Build the store from overrides and property files
//!   5. Resolve placeholders
//!   6. Apply runtime defaults, read server and migration settings
//!   7. Print the requested keys, or every key

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use proplink::config::{self, Sources};
use proplink::interpolate::DEFAULT_MAX_PASSES;
use proplink::settings::{self, MigrationSettings, ServerSettings};
use proplink::{AppError, ConfigurationStore, ProcessEnv, Resolver, logger};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args(std::env::args().skip(1))?;
    if args.help {
        print_help();
        return Ok(());
    }

    let env_log_level = std::env::var("PROPLINK_LOG_LEVEL").ok();
    if let Some(level) = env_log_level.as_deref() {
        logger::parse_level(level)?;
    }
    let effective_log_level = args.log_level.or(env_log_level.as_deref()).unwrap_or("warn");
    let force_level = args.log_level.is_some() || env_log_level.is_some();
    logger::init(effective_log_level, force_level, args.log_file.as_deref())?;

    let max_passes = match args.max_passes {
        Some(n) => n,
        None => max_passes_from_env()?,
    };

    let env = ProcessEnv;
    let mut store = config::load(&args.sources, &env)?;
    info!(
        keys = store.len(),
        files = args.sources.files.len(),
        overrides = args.sources.overrides.len(),
        "properties loaded"
    );

    let resolution = Resolver::new(max_passes).resolve(&mut store, &env)?;
    if !resolution.unresolved.is_empty() {
        warn!(unresolved = ?resolution.unresolved, "placeholders left unresolved");
    }
    info!(
        passes = resolution.passes,
        substitutions = resolution.substitutions,
        "placeholders resolved"
    );

    settings::apply_runtime_defaults(&mut store, &env, settings::DEFAULT_APP_PACKAGE);
    let server = ServerSettings::from_store(&store, &env)?;
    let migration = MigrationSettings::from_store(&store, &env);
    migration.write_back(&mut store);
    info!(
        port = server.port,
        bind_ip = %server.bind_ip,
        mode = %server.mode,
        "launch settings ready"
    );

    let properties = select(&store, &args.keys)?;
    if args.json {
        let report = Report {
            properties,
            server: &server,
            migration: &migration,
            unresolved: &resolution.unresolved,
        };
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::Config(format!("cannot encode output: {e}")))?;
        println!("{text}");
    } else {
        for (key, value) in properties {
            println!("{key}={value}");
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct Report<'a> {
    properties: BTreeMap<&'a str, &'a str>,
    server: &'a ServerSettings,
    migration: &'a MigrationSettings,
    unresolved: &'a BTreeSet<String>,
}

/// The requested keys, or every key when none were named.
fn select<'a>(
    store: &'a ConfigurationStore,
    keys: &'a [String],
) -> Result<BTreeMap<&'a str, &'a str>, AppError> {
    if keys.is_empty() {
        return Ok(store.iter().collect());
    }

    let mut selected = BTreeMap::new();
    let mut unknown = Vec::new();
    for key in keys {
        match store.get(key) {
            Some(value) => {
                selected.insert(key.as_str(), value);
            }
            None => unknown.push(key.as_str()),
        }
    }
    if !unknown.is_empty() {
        return Err(AppError::Config(format!("unknown keys: {}", unknown.join(", "))));
    }
    Ok(selected)
}

fn max_passes_from_env() -> Result<usize, AppError> {
    match std::env::var("PROPLINK_MAX_PASSES") {
        Ok(raw) => parse_max_passes(&raw),
        Err(_) => Ok(DEFAULT_MAX_PASSES),
    }
}

fn parse_max_passes(raw: &str) -> Result<usize, AppError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::Config(format!(
            "max passes must be a positive integer, got '{raw}'"
        ))),
    }
}

// ── CLI arg parsing ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CliArgs {
    help: bool,
    log_level: Option<&'static str>,
    log_file: Option<PathBuf>,
    max_passes: Option<usize>,
    json: bool,
    sources: Sources,
    keys: Vec<String>,
}

fn parse_cli_args<I>(args: I) -> Result<CliArgs, AppError>
where
    I: IntoIterator<Item = String>,
{
    let mut cli = CliArgs::default();
    let mut verbosity = 0u8;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--" => {
                cli.keys.extend(iter.by_ref());
                break;
            }
            "-h" | "--help" => cli.help = true,
            "--json" => cli.json = true,
            "-D" | "--define" => {
                let pair = required(&mut iter, &arg)?;
                cli.sources.overrides.push(config::parse_override(&pair)?);
            }
            "-f" | "--file" => {
                let path = required(&mut iter, &arg)?;
                cli.sources.files.push(config::expand_home(&path));
            }
            "--log-file" => {
                let path = required(&mut iter, &arg)?;
                cli.log_file = Some(config::expand_home(&path));
            }
            "--max-passes" => {
                let raw = required(&mut iter, &arg)?;
                cli.max_passes = Some(parse_max_passes(&raw)?);
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with("-D") => {
                cli.sources.overrides.push(config::parse_override(&a[2..])?);
            }
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add(u8::try_from(a.len() - 1).unwrap_or(u8::MAX));
            }
            a if a.starts_with('-') && a.len() > 1 => {
                return Err(AppError::Config(format!("unknown option '{a}' (see --help)")));
            }
            _ => cli.keys.push(arg),
        }
    }

    // Each -v raises verbosity one tier above the warn default:
    //   -v    → info   (load and resolve summaries)
    //   -vv   → debug  (per-file and per-property rewrites)
    //   -vvv+ → trace  (per-pass detail)
    cli.log_level = match verbosity {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    };

    Ok(cli)
}

fn required<I>(iter: &mut I, flag: &str) -> Result<String, AppError>
where
    I: Iterator<Item = String>,
{
    iter.next()
        .ok_or_else(|| AppError::Config(format!("{flag} requires an argument")))
}

fn print_help() {
    println!("Usage: proplink [OPTIONS] [KEY]...");
    println!();
    println!("Resolves ${{key}} placeholders across properties and prints the result.");
    println!("With no KEY arguments every property is printed as key=value.");
    println!();
    println!("Options:");
    println!("  -D <KEY=VALUE>, -DKEY=VALUE   Set a property (repeatable)");
    println!("  -f, --file <PATH>             Load a .properties or .toml file (repeatable)");
    println!("      --max-passes <N>          Pass ceiling before giving up (default: {DEFAULT_MAX_PASSES})");
    println!("      --json                    Print properties and launch settings as JSON");
    println!("      --log-file <PATH>         Append logs to a file instead of stderr");
    println!("  -v, -vv, -vvv                 Increase logging verbosity");
    println!("  -h, --help                    Print help");
    println!();
    println!("Environment:");
    println!("  application.properties        Extra property file, loaded after -D");
    println!("  PROPLINK_LOG_LEVEL            Log level when no -v flag is given");
    println!("  PROPLINK_MAX_PASSES           Pass ceiling when --max-passes is absent");
    println!("  any other variable            Fallback for ${{key}} lookups");
}
