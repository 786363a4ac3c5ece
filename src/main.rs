//! graphvault CLI - versioned repository graph store
//!
//! Usage: graphvault <command> [arguments]

mod changes_cmd;
mod cli;
mod compare_cmd;
mod history_cmd;
mod store_cmd;
mod verify_cmd;

use anyhow::Result;
use graphvault::output::{generate_execution_id, ErrorResponse, JsonResponse};
use graphvault::{GraphService, GraphVaultError, OutputFormat};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, exec_id: &str) -> Result<u8> {
    let config = cli.global.config();
    let output_format = cli.global.output_format;
    let service = GraphService::open(&config.data_dir);

    match cli.command {
        Command::Help => {
            cli::print_usage();
            Ok(0)
        }
        Command::Version => {
            println!("{}", graphvault::version::version());
            Ok(0)
        }
        Command::Store {
            owner,
            repo,
            commit_sha,
            message,
            date,
            graph_path,
            secondary_db,
        } => store_cmd::run_store(
            config,
            store_cmd::StoreArgs {
                owner,
                repo,
                commit_sha,
                message,
                date,
                graph_path,
                secondary_db,
            },
            output_format,
            exec_id,
        ),
        Command::History { owner, repo } => {
            let repo = owner.as_deref().zip(repo.as_deref());
            history_cmd::run_history(&service, repo, output_format, exec_id)
        }
        Command::Load {
            owner,
            repo,
            commit_sha,
        } => store_cmd::run_load(&service, &owner, &repo, &commit_sha, output_format, exec_id),
        Command::Compare {
            owner,
            repo,
            from,
            to,
        } => compare_cmd::run_compare(&service, &owner, &repo, &from, &to, output_format, exec_id),
        Command::Delete {
            owner,
            repo,
            commit_sha,
        } => store_cmd::run_delete(&service, &owner, &repo, &commit_sha, output_format, exec_id),
        Command::Verify => verify_cmd::run_verify(&service, output_format, exec_id),
        Command::Fingerprint { root, save } => {
            changes_cmd::run_fingerprint(&config, &root, save.as_deref(), output_format, exec_id)
        }
        Command::Changes {
            root,
            baseline,
            update,
        } => changes_cmd::run_changes(&config, &root, &baseline, update, output_format, exec_id),
    }
}

fn report_error(err: &anyhow::Error, output_format: OutputFormat, exec_id: &str) {
    let response = match err.downcast_ref::<GraphVaultError>() {
        Some(gv) => ErrorResponse::from(gv),
        None => ErrorResponse::generic("error", format!("{:#}", err)),
    };

    if output_format == OutputFormat::Json {
        let envelope = JsonResponse::new(&response, exec_id);
        match serde_json::to_string_pretty(&envelope) {
            Ok(json) => println!("{}", json),
            Err(_) => eprintln!("Error: {}", response.message),
        }
    } else {
        match &response.code {
            Some(code) => eprintln!("Error [{}]: {}", code, response.message),
            None => eprintln!("Error: {}", response.message),
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = match cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            cli::print_usage();
            return ExitCode::from(2);
        }
    };

    let exec_id = generate_execution_id();
    let output_format = cli.global.output_format;
    match run(cli, &exec_id) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            report_error(&e, output_format, &exec_id);
            ExitCode::from(1)
        }
    }
}
