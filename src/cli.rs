//! CLI argument parsing for graphvault
//!
//! Defines the Command enum and parse_args() for all CLI commands.

use anyhow::Result;
use chrono::{DateTime, Utc};
use graphvault::{GraphVaultConfig, OutputFormat};
use std::path::PathBuf;

pub fn print_usage() {
    eprintln!("graphvault - Versioned repository graph store");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  graphvault <command> [arguments]");
    eprintln!("  graphvault --help");
    eprintln!("  graphvault --version");
    eprintln!();
    eprintln!("  graphvault store --owner <OWNER> --repo <REPO> --sha <SHA> --graph <FILE> [--message <MSG>] [--date <RFC3339>] [--secondary-db <FILE>]");
    eprintln!("  graphvault history [--owner <OWNER> --repo <REPO>]");
    eprintln!("  graphvault load --owner <OWNER> --repo <REPO> --sha <SHA>");
    eprintln!("  graphvault compare --owner <OWNER> --repo <REPO> --from <SHA> --to <SHA>");
    eprintln!("  graphvault delete --owner <OWNER> --repo <REPO> --sha <SHA>");
    eprintln!("  graphvault verify");
    eprintln!("  graphvault fingerprint --root <DIR> [--save <FILE>]");
    eprintln!("  graphvault changes --root <DIR> --baseline <FILE> [--update]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  store        Ingest a graph file and store it as a commit snapshot");
    eprintln!("  history      List stored commits (all repositories or one)");
    eprintln!("  load         Print the graph stored for a commit");
    eprintln!("  compare      Diff two stored commits of a repository");
    eprintln!("  delete       Remove a stored commit");
    eprintln!("  verify       Check the history index against payloads on disk");
    eprintln!("  fingerprint  Hash every file of a local checkout");
    eprintln!("  changes      Compare a checkout against saved fingerprints");
    eprintln!();
    eprintln!("Global arguments:");
    eprintln!("  --data-dir <DIR>    Store root (default: $GRAPHVAULT_DATA_DIR or .graphvault)");
    eprintln!("  --output <FORMAT>   Output format: human (default) or json");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GRAPHVAULT_DATA_DIR         Store root");
    eprintln!("  GRAPHVAULT_BATCH_THRESHOLD  Secondary writes buffered before a flush (default: 500)");
    eprintln!("  GRAPHVAULT_SECONDARY_DB     SQLite file mirroring stored graphs");
    eprintln!("  RUST_LOG                    Log filter (default: warn)");
}

/// Arguments accepted by every command
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalArgs {
    pub data_dir: Option<PathBuf>,
    pub output_format: OutputFormat,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            data_dir: None,
            output_format: OutputFormat::Human,
        }
    }
}

impl GlobalArgs {
    /// Environment configuration with command-line overrides applied
    pub fn config(&self) -> GraphVaultConfig {
        let mut config = GraphVaultConfig::from_env();
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Store {
        owner: Option<String>,
        repo: Option<String>,
        commit_sha: Option<String>,
        message: Option<String>,
        date: Option<DateTime<Utc>>,
        graph_path: Option<PathBuf>,
        secondary_db: Option<PathBuf>,
    },
    History {
        owner: Option<String>,
        repo: Option<String>,
    },
    Load {
        owner: String,
        repo: String,
        commit_sha: String,
    },
    Compare {
        owner: String,
        repo: String,
        from: String,
        to: String,
    },
    Delete {
        owner: String,
        repo: String,
        commit_sha: String,
    },
    Verify,
    Fingerprint {
        root: PathBuf,
        save: Option<PathBuf>,
    },
    Changes {
        root: PathBuf,
        baseline: PathBuf,
        update: bool,
    },
    Help,
    Version,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub global: GlobalArgs,
    pub command: Command,
}

/// Value following the flag at `args[i]`
fn flag_value(args: &[String], i: usize) -> Result<String> {
    match args.get(i + 1) {
        Some(value) => Ok(value.clone()),
        None => Err(anyhow::anyhow!("{} requires an argument", args[i])),
    }
}

/// Consume a global flag at `args[i]`, returning how many arguments it used
fn parse_global(args: &[String], i: usize, global: &mut GlobalArgs) -> Result<Option<usize>> {
    match args[i].as_str() {
        "--data-dir" => {
            global.data_dir = Some(PathBuf::from(flag_value(args, i)?));
            Ok(Some(2))
        }
        "--output" => {
            let raw = flag_value(args, i)?;
            global.output_format = raw.parse::<OutputFormat>().map_err(|e| anyhow::anyhow!(e))?;
            Ok(Some(2))
        }
        _ => Ok(None),
    }
}

fn required(value: Option<String>, flag: &str) -> Result<String> {
    value.ok_or_else(|| anyhow::anyhow!("{} is required", flag))
}

fn unknown(command: &str, arg: &str) -> anyhow::Error {
    anyhow::anyhow!("Unknown argument for {}: {}", command, arg)
}

/// Parse a full argv (including the program name)
pub fn parse_args_from(args: &[String]) -> Result<Cli> {
    let mut global = GlobalArgs::default();

    let Some(command) = args.get(1) else {
        return Ok(Cli {
            global,
            command: Command::Help,
        });
    };

    let command = match command.as_str() {
        "--help" | "-h" | "help" => Command::Help,
        "--version" | "-V" | "version" => Command::Version,
        "store" => {
            let mut owner = None;
            let mut repo = None;
            let mut commit_sha = None;
            let mut message = None;
            let mut date = None;
            let mut graph_path = None;
            let mut secondary_db = None;

            let mut i = 2;
            while i < args.len() {
                if let Some(used) = parse_global(args, i, &mut global)? {
                    i += used;
                    continue;
                }
                match args[i].as_str() {
                    "--owner" => owner = Some(flag_value(args, i)?),
                    "--repo" => repo = Some(flag_value(args, i)?),
                    "--sha" => commit_sha = Some(flag_value(args, i)?),
                    "--message" => message = Some(flag_value(args, i)?),
                    "--date" => {
                        let raw = flag_value(args, i)?;
                        let parsed = DateTime::parse_from_rfc3339(&raw)
                            .map_err(|e| anyhow::anyhow!("Invalid --date {}: {}", raw, e))?;
                        date = Some(parsed.with_timezone(&Utc));
                    }
                    "--graph" => graph_path = Some(PathBuf::from(flag_value(args, i)?)),
                    "--secondary-db" => secondary_db = Some(PathBuf::from(flag_value(args, i)?)),
                    other => return Err(unknown("store", other)),
                }
                i += 2;
            }

            Command::Store {
                owner,
                repo,
                commit_sha,
                message,
                date,
                graph_path,
                secondary_db,
            }
        }
        "history" => {
            let mut owner = None;
            let mut repo = None;

            let mut i = 2;
            while i < args.len() {
                if let Some(used) = parse_global(args, i, &mut global)? {
                    i += used;
                    continue;
                }
                match args[i].as_str() {
                    "--owner" => owner = Some(flag_value(args, i)?),
                    "--repo" => repo = Some(flag_value(args, i)?),
                    other => return Err(unknown("history", other)),
                }
                i += 2;
            }

            if owner.is_some() != repo.is_some() {
                return Err(anyhow::anyhow!("--owner and --repo must be given together"));
            }
            Command::History { owner, repo }
        }
        "load" | "delete" => {
            let mut owner = None;
            let mut repo = None;
            let mut commit_sha = None;

            let mut i = 2;
            while i < args.len() {
                if let Some(used) = parse_global(args, i, &mut global)? {
                    i += used;
                    continue;
                }
                match args[i].as_str() {
                    "--owner" => owner = Some(flag_value(args, i)?),
                    "--repo" => repo = Some(flag_value(args, i)?),
                    "--sha" => commit_sha = Some(flag_value(args, i)?),
                    other => return Err(unknown(command, other)),
                }
                i += 2;
            }

            let owner = required(owner, "--owner")?;
            let repo = required(repo, "--repo")?;
            let commit_sha = required(commit_sha, "--sha")?;
            if command == "load" {
                Command::Load {
                    owner,
                    repo,
                    commit_sha,
                }
            } else {
                Command::Delete {
                    owner,
                    repo,
                    commit_sha,
                }
            }
        }
        "compare" => {
            let mut owner = None;
            let mut repo = None;
            let mut from = None;
            let mut to = None;

            let mut i = 2;
            while i < args.len() {
                if let Some(used) = parse_global(args, i, &mut global)? {
                    i += used;
                    continue;
                }
                match args[i].as_str() {
                    "--owner" => owner = Some(flag_value(args, i)?),
                    "--repo" => repo = Some(flag_value(args, i)?),
                    "--from" => from = Some(flag_value(args, i)?),
                    "--to" => to = Some(flag_value(args, i)?),
                    other => return Err(unknown("compare", other)),
                }
                i += 2;
            }

            Command::Compare {
                owner: required(owner, "--owner")?,
                repo: required(repo, "--repo")?,
                from: required(from, "--from")?,
                to: required(to, "--to")?,
            }
        }
        "verify" => {
            let mut i = 2;
            while i < args.len() {
                match parse_global(args, i, &mut global)? {
                    Some(used) => i += used,
                    None => return Err(unknown("verify", &args[i])),
                }
            }
            Command::Verify
        }
        "fingerprint" => {
            let mut root = None;
            let mut save = None;

            let mut i = 2;
            while i < args.len() {
                if let Some(used) = parse_global(args, i, &mut global)? {
                    i += used;
                    continue;
                }
                match args[i].as_str() {
                    "--root" => root = Some(PathBuf::from(flag_value(args, i)?)),
                    "--save" => save = Some(PathBuf::from(flag_value(args, i)?)),
                    other => return Err(unknown("fingerprint", other)),
                }
                i += 2;
            }

            Command::Fingerprint {
                root: root.ok_or_else(|| anyhow::anyhow!("--root is required"))?,
                save,
            }
        }
        "changes" => {
            let mut root = None;
            let mut baseline = None;
            let mut update = false;

            let mut i = 2;
            while i < args.len() {
                if let Some(used) = parse_global(args, i, &mut global)? {
                    i += used;
                    continue;
                }
                match args[i].as_str() {
                    "--root" => {
                        root = Some(PathBuf::from(flag_value(args, i)?));
                        i += 2;
                    }
                    "--baseline" => {
                        baseline = Some(PathBuf::from(flag_value(args, i)?));
                        i += 2;
                    }
                    "--update" => {
                        update = true;
                        i += 1;
                    }
                    other => return Err(unknown("changes", other)),
                }
            }

            Command::Changes {
                root: root.ok_or_else(|| anyhow::anyhow!("--root is required"))?,
                baseline: baseline.ok_or_else(|| anyhow::anyhow!("--baseline is required"))?,
                update,
            }
        }
        other => return Err(anyhow::anyhow!("Unknown command: {}", other)),
    };

    Ok(Cli { global, command })
}

pub fn parse_args() -> Result<Cli> {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from(&args)
}
