mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{CONFIG_ERROR_PREFIX, EXIT_CONFIG_ERROR, EXIT_FAILURE};
use packsync_core::{install_signal_handler, Side};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "packsync",
    version,
    about = "Keep a game server's mod pack and its clients in sync"
)]
struct Cli {
    /// Game directory containing servermods/ and clientmods/.
    #[arg(long, default_value = ".", global = true)]
    game_dir: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideArg {
    Client,
    Server,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::Client => Side::Client,
            SideArg::Server => Side::DedicatedServer,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the pack locator for one side: serve the pack, or pull it.
    Launch {
        /// Which side of the connection this process is.
        #[arg(long, value_enum)]
        side: SideArg,
    },
    /// Print the manifest the server side would publish.
    Manifest,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PACKSYNC_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    let result = match cli.command {
        Commands::Launch { side } => commands::launch::run(&cli.game_dir, side.into(), cli.json),
        Commands::Manifest => commands::manifest::run(&cli.game_dir, cli.json),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with(CONFIG_ERROR_PREFIX) {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
