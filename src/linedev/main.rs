use clap::Parser;
use linedev::error::LineResult;
use query::{ListOptions, QueryOptions, handle_list, handle_query};

mod query;

#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
struct Cli {
    /// Log debug diagnostics
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
enum Command {
    /// List serial ports visible on this host
    #[command(name = "list", alias = "l")]
    List(ListOptions),

    /// Send a query to the device and print its reply
    #[command(name = "query", alias = "q")]
    Query(QueryOptions),
}

fn main() -> LineResult<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Command::List(opts) => handle_list(opts)?,
        Command::Query(opts) => handle_query(opts)?,
    }

    Ok(())
}
