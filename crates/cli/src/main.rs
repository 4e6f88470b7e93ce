//! Command-line front end for the EMPI identity-resolution engine.
//!
//! Operates directly against an embedded, `redb`-backed [`Store`] —
//! no HTTP server involved — which is why `create_db` exists here and
//! nowhere in the HTTP surface: schema lifecycle is a CLI-only
//! concern. `post`/`get` mirror `server::routes::process`/`query`'s
//! endpoint set, with one flag per payload field instead of a JSON
//! body.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use commands::{GetArgs, PostArgs};

#[derive(Parser)]
#[command(name = "empi", version, about = "EMPI identity-resolution engine command-line front end")]
struct Cli {
    /// Path to the embedded redb database file.
    #[arg(long, global = true, default_value = "empi.redb")]
    db: String,

    /// User recorded against every row this invocation mints.
    #[arg(long, global = true, default_value = "cli")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drop and recreate the database file.
    CreateDb,
    /// Run a mutating endpoint's processor against the database.
    Post(PostCommandArgs),
    /// Run an equality-filtered read over a table.
    Get(GetCommandArgs),
}

#[derive(Args)]
struct PostCommandArgs {
    /// Table/action name, e.g. `demographic`, `match_affirm`.
    endpoint: String,

    #[arg(long = "record-id")]
    record_id: Option<i64>,
    #[arg(long = "record-id-low")]
    record_id_low: Option<i64>,
    #[arg(long = "record-id-high")]
    record_id_high: Option<i64>,
    #[arg(long = "batch-id")]
    batch_id: Option<i64>,
    #[arg(long = "proc-id")]
    proc_id: Option<i64>,
    /// One of `delete`, `affirm`, `deny` — for `delete_action`.
    #[arg(long)]
    action: Option<String>,
    /// Path to a JSON array of demographic records — for `demographic`.
    #[arg(long = "demographics-file", value_name = "FILE")]
    demographics_file: Option<std::path::PathBuf>,
}

#[derive(Args)]
struct GetCommandArgs {
    /// Table name, e.g. `demographic`, `enterprise_group`.
    endpoint: String,

    /// Equality filter, repeatable: `--filter family_name=Smith`.
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> error::CliResult<()> {
    match &cli.command {
        Command::CreateDb => {
            commands::create_db(&cli.db)?;
            println!("{}", serde_json::json!({ "status": 200, "db": cli.db }));
            Ok(())
        }
        Command::Post(args) => {
            let store = commands::open_store(&cli.db)?;
            let post_args = PostArgs {
                endpoint: args.endpoint.clone(),
                user: cli.user.clone(),
                record_id: args.record_id,
                record_id_low: args.record_id_low,
                record_id_high: args.record_id_high,
                batch_id: args.batch_id,
                proc_id: args.proc_id,
                action: args.action.clone(),
                demographics_file: args.demographics_file.clone(),
            };
            let batch_id = commands::run_post(&store, &post_args, env!("CARGO_PKG_VERSION"))?;
            println!("{}", serde_json::json!({ "batch_key": batch_id, "status": 200 }));
            Ok(())
        }
        Command::Get(args) => {
            let store = commands::open_store(&cli.db)?;
            let get_args = GetArgs {
                endpoint: args.endpoint.clone(),
                filters: args.filters.clone(),
            };
            let rows = commands::run_get(&store, &get_args)?;
            println!("{}", serde_json::json!({ "status": 200, "response": rows }));
            Ok(())
        }
    }
}
