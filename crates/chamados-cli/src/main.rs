#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use actor::ActorResolutionError;
use chamados_core::error::{EngineError, ErrorKind};
use clap::{Parser, Subcommand};
use cmd::GlobalArgs;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "chm",
    author,
    version,
    about = "chamados: service tickets, audit trail and cash ledger for repair shops",
    long_about = None
)]
struct Cli {
    /// Output format (defaults to pretty on a TTY, text when piped).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    globals: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a chamados store",
        after_help = "EXAMPLES:\n    chm init\n    chm --db /srv/shop.sqlite3 init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Parties",
        about = "Register, remove or inspect clients",
        after_help = "EXAMPLES:\n    chm client add --phone 11987654321 --name \"Marina Costa\"\n    chm client tickets 1"
    )]
    Client(cmd::client::ClientArgs),

    #[command(
        next_help_heading = "Parties",
        about = "Manage technician accounts",
        after_help = "EXAMPLES:\n    # First account of an empty store (no actor needed)\n    chm tech add --username admin --name \"Shop Owner\" --password pw --role admin\n\n    chm --actor-id 1 tech deactivate 4"
    )]
    Tech(cmd::tech::TechArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Open a ticket for a client",
        after_help = "EXAMPLES:\n    chm create --client 1 --device \"Brastemp washer\" --description \"Does not spin\""
    )]
    Create(cmd::ticket::CreateArgs),

    #[command(next_help_heading = "Tickets", about = "Show a ticket with its items")]
    Show(cmd::ticket::ShowArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Change ticket fields",
        after_help = "EXAMPLES:\n    chm update 3 --status \"In Progress\" --assignee 7\n    chm update 3 --status Completed --completed-at 2024-07-15T16:00:00Z"
    )]
    Update(cmd::ticket::UpdateArgs),

    #[command(next_help_heading = "Tickets", about = "Cancel a ticket")]
    Cancel(cmd::ticket::CancelArgs),

    #[command(next_help_heading = "Tickets", about = "Show a ticket's change history")]
    History(cmd::ticket::HistoryArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "List tickets expected on a day",
        after_help = "EXAMPLES:\n    chm due\n    chm --actor-id 7 due 2024-07-20"
    )]
    Due(cmd::ticket::DueArgs),

    #[command(
        next_help_heading = "Tickets",
        about = "Add, change, remove or list line items",
        after_help = "EXAMPLES:\n    chm item add 3 --description \"Drive belt\" --quantity 2 --price 45.50\n    chm item rm 12"
    )]
    Item(cmd::item::ItemArgs),

    #[command(
        next_help_heading = "Reports",
        about = "List ledger entries or period totals",
        after_help = "EXAMPLES:\n    chm ledger list --month 7 --year 2024\n    chm ledger summary --year 2024"
    )]
    Ledger(cmd::ledger::LedgerArgs),

    #[command(next_help_heading = "Reports", about = "Shop-wide ticket statistics")]
    Stats(cmd::stats::StatsArgs),
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CHAMADOS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "chamados=debug,info"
        } else {
            "chamados=info,warn"
        })
    });

    let format = env::var("CHAMADOS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Process exit status for a failed command.
const fn exit_code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Invalid => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Forbidden => 4,
        ErrorKind::InvalidState => 5,
        ErrorKind::Conflict => 6,
        ErrorKind::Storage => 1,
    }
}

/// Map a command failure onto its rendered form and exit status.
fn classify(err: &anyhow::Error) -> (CliError, u8) {
    if let Some(engine) = err.downcast_ref::<EngineError>() {
        return (CliError::from(engine), exit_code_for(engine.kind()));
    }
    if let Some(actor) = err.downcast_ref::<ActorResolutionError>() {
        let suggestion = match actor.code {
            "missing_actor" | "invalid_actor_id" => "Set --actor-id or CHAMADOS_ACTOR_ID.",
            "role_mismatch" | "invalid_role" => {
                "Drop --actor-role or pass the technician's stored role."
            }
            _ => "Ask an administrator or manager to reactivate the account.",
        };
        return (
            CliError::with_details(&actor.message, suggestion, actor.code),
            2,
        );
    }
    (CliError::new(format!("{err:#}")), 1)
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();
    tracing::debug!(command = ?cli.command, ?output, "dispatching");

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|project_root| run(&cli, output, &project_root));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let (cli_error, code) = classify(&err);
            tracing::debug!(error = %err, code, "command failed");
            if let Err(render_err) = render_error(output, &cli_error) {
                eprintln!("error: {err:#} (while rendering: {render_err})");
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli, output: OutputMode, project_root: &std::path::Path) -> anyhow::Result<()> {
    let globals = &cli.globals;
    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, globals, output, project_root),
        Commands::Client(args) => cmd::client::run_client(args, globals, output, project_root),
        Commands::Tech(args) => cmd::tech::run_tech(args, globals, output, project_root),
        Commands::Create(args) => cmd::ticket::run_create(args, globals, output, project_root),
        Commands::Show(args) => cmd::ticket::run_show(args, globals, output, project_root),
        Commands::Update(args) => cmd::ticket::run_update(args, globals, output, project_root),
        Commands::Cancel(args) => cmd::ticket::run_cancel(args, globals, output, project_root),
        Commands::History(args) => cmd::ticket::run_history(args, globals, output, project_root),
        Commands::Due(args) => cmd::ticket::run_due(args, globals, output, project_root),
        Commands::Item(args) => cmd::item::run_item(args, globals, output, project_root),
        Commands::Ledger(args) => cmd::ledger::run_ledger(args, globals, output, project_root),
        Commands::Stats(args) => cmd::stats::run_stats(args, globals, output, project_root),
    }
}
