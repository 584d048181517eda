use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use nova_pool::{Item, Pool, PoolConfig, PoolStats};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod logging;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "nova-pool", version, about = "Inspect and edit a persistent cache pool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Pool directory (overrides `NOVA_POOL_DIR` and the config file)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    /// Config file (defaults to `nova-pool.toml` in the working directory, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit JSON suitable for scripts
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the value stored under a key
    Get(GetArgs),
    /// Look up several keys at once
    GetMany(GetManyArgs),
    /// Store a value under a key
    Set(SetArgs),
    /// Check whether a key has an entry on disk
    Has(KeyArgs),
    /// Delete one or more keys
    Delete(DeleteArgs),
    /// Delete every entry and the index
    Clear,
    /// List indexed keys
    Keys,
    /// Show the pool location and size
    Status,
}

#[derive(Args)]
struct GetArgs {
    key: String,
}

#[derive(Args)]
struct GetManyArgs {
    #[arg(required = true)]
    keys: Vec<String>,
}

#[derive(Args)]
struct SetArgs {
    key: String,
    value: String,
    /// Expire the entry after this many seconds
    #[arg(long)]
    ttl_secs: Option<u64>,
    /// Queue the write and commit it explicitly instead of saving immediately
    #[arg(long)]
    deferred: bool,
}

#[derive(Args)]
struct KeyArgs {
    key: String,
}

#[derive(Args)]
struct DeleteArgs {
    #[arg(required = true)]
    keys: Vec<String>,
}

#[derive(Serialize)]
struct ItemReport {
    key: String,
    hit: bool,
    value: Option<String>,
    expires_at_millis: Option<u64>,
}

impl From<&Item> for ItemReport {
    fn from(item: &Item) -> Self {
        let hit = item.is_hit();
        Self {
            key: item.key().to_string(),
            hit,
            value: item
                .get()
                .filter(|_| hit)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
            expires_at_millis: item.expiration_millis(),
        }
    }
}

#[derive(Serialize)]
struct StatusReport {
    directory: PathBuf,
    index_path: PathBuf,
    index_exists: bool,
    entries: usize,
    stats: PoolStats,
}

#[derive(Serialize)]
struct OkReport {
    ok: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = CliConfig::discover(cli.config.as_deref())?;
    logging::init_tracing(&config.logging);

    let directory = resolve_directory(cli.dir, &config)?;
    tracing::debug!(target: "nova.pool.cli", directory = %directory.display(), "using pool");
    let pool = Pool::new(&directory);

    match cli.command {
        Command::Get(args) => {
            let item = pool.get_item(&args.key)?;
            let report = ItemReport::from(&item);
            if cli.json {
                print_json(&report)?;
            } else if let Some(value) = &report.value {
                println!("{value}");
            } else {
                println!("{}: miss", report.key);
            }
            Ok(exit_code(report.hit))
        }
        Command::GetMany(args) => {
            let items = pool.get_items(&args.keys)?;
            let reports: Vec<ItemReport> = items.values().map(ItemReport::from).collect();
            if cli.json {
                print_json(&reports)?;
            } else {
                for report in &reports {
                    match &report.value {
                        Some(value) => println!("{}: {value}", report.key),
                        None => println!("{}: miss", report.key),
                    }
                }
            }
            Ok(exit_code(reports.iter().all(|report| report.hit)))
        }
        Command::Set(args) => {
            let mut item = Item::new(args.key)?;
            item.set(args.value.into_bytes());
            item.expires_after(args.ttl_secs.map(Duration::from_secs));
            let ok = if args.deferred {
                pool.save_deferred(&item) && pool.commit()
            } else {
                pool.save(&item)
            };
            print_ok(ok, cli.json)?;
            Ok(exit_code(ok))
        }
        Command::Has(args) => {
            let present = pool.has_item(&args.key)?;
            if cli.json {
                print_json(&serde_json::json!({ "key": args.key, "present": present }))?;
            } else {
                println!("{present}");
            }
            Ok(exit_code(present))
        }
        Command::Delete(args) => {
            let ok = match args.keys.as_slice() {
                [key] => pool.delete_item(key)?,
                keys => pool.delete_items(keys)?,
            };
            print_ok(ok, cli.json)?;
            Ok(exit_code(ok))
        }
        Command::Clear => {
            let ok = pool.clear();
            if cli.json {
                print_json(&OkReport { ok })?;
            } else if ok {
                println!("pool: cleared {}", pool.directory().display());
            } else {
                println!("pool: failed to clear {}", pool.directory().display());
            }
            Ok(exit_code(ok))
        }
        Command::Keys => {
            let keys = pool.keys();
            if cli.json {
                print_json(&keys)?;
            } else {
                for key in keys {
                    println!("{key}");
                }
            }
            Ok(0)
        }
        Command::Status => {
            let report = StatusReport {
                directory: pool.directory().to_path_buf(),
                index_path: pool.index_path().to_path_buf(),
                index_exists: pool.index_path().is_file(),
                entries: pool.len(),
                stats: pool.stats(),
            };
            if cli.json {
                print_json(&report)?;
            } else {
                println!("pool:");
                println!("  dir: {}", report.directory.display());
                println!("  index: {}", report.index_path.display());
                println!("    exists: {}", report.index_exists);
                println!("  entries: {}", report.entries);
            }
            Ok(0)
        }
    }
}

/// `--dir`, then `NOVA_POOL_DIR`, then the config file, then `~/.nova/pool`.
fn resolve_directory(flag: Option<PathBuf>, config: &CliConfig) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    let mut pool_config = PoolConfig::from_env();
    if pool_config.directory_override.is_none() {
        pool_config.directory_override = config.pool.directory.clone();
    }
    pool_config
        .directory()
        .context("failed to resolve pool directory (pass --dir or set NOVA_POOL_DIR)")
}

fn exit_code(ok: bool) -> i32 {
    if ok {
        0
    } else {
        1
    }
}

fn print_ok(ok: bool, json: bool) -> Result<()> {
    if json {
        print_json(&OkReport { ok })
    } else {
        println!("{}", if ok { "ok" } else { "failed" });
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
