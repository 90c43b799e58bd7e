use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use backdrop_ajax::cli::commands::{cmd_bindings, cmd_replay, cmd_submit};
use backdrop_ajax::cli::config::{Cli, Commands, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref());
    let trace = cli.trace.as_deref();

    match cli.command {
        Commands::Bindings { page, format } => {
            cmd_bindings(&page, &format, &config, trace)?;
        }
        Commands::Replay {
            page,
            trigger,
            responses,
            output,
        } => {
            let applied = cmd_replay(&page, &trigger, &responses, output.as_deref(), &config, trace)?;
            if !applied {
                std::process::exit(1);
            }
        }
        Commands::Submit {
            page,
            trigger,
            timeout,
            output,
        } => {
            let applied = cmd_submit(&page, &trigger, timeout, output.as_deref(), &config, trace)?;
            if !applied {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
