use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{execute_serve_command, execute_uri_command, ServeArgs, UriArgs};

/// Log filter used when `RUST_LOG` is unset or invalid
const DEFAULT_LOG_FILTER: &str = "testbed=debug,info";

#[derive(Parser)]
#[command(name = "testbed")]
#[command(about = "Testbed - embedded servlet container for integration tests")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve a demo echo application until interrupted
    Serve(ServeCommandArgs),
    /// Print the base URI a container would use
    Uri(UriCommandArgs),
}

#[derive(Args)]
pub struct ServeCommandArgs {
    /// Host used in the base URI (overrides TESTBED_HOST)
    #[arg(long)]
    pub host: Option<String>,
    /// Port to listen on (overrides TESTBED_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Context path of the application
    #[arg(short, long, default_value = "")]
    pub context_path: String,
    /// Servlet path below the context
    #[arg(short, long, default_value = "")]
    pub servlet_path: String,
    /// Context parameter as key=value (repeatable)
    #[arg(long = "param")]
    pub params: Vec<String>,
    /// Servlet init parameter as key=value (repeatable)
    #[arg(long = "init")]
    pub init_params: Vec<String>,
    /// Install a logging filter with this name (repeatable)
    #[arg(long = "filter")]
    pub filters: Vec<String>,
}

#[derive(Args)]
pub struct UriCommandArgs {
    #[arg(long)]
    pub host: Option<String>,
    #[arg(short, long)]
    pub port: Option<u16>,
    #[arg(short, long, default_value = "")]
    pub context_path: String,
    #[arg(short, long, default_value = "")]
    pub servlet_path: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
            tracing_subscriber::fmt().with_env_filter(filter).init();

            let serve_args = ServeArgs {
                host: args.host,
                port: args.port,
                context_path: args.context_path,
                servlet_path: args.servlet_path,
                params: args.params,
                init_params: args.init_params,
                filters: args.filters,
            };
            execute_serve_command(serve_args).await
        }
        Commands::Uri(args) => execute_uri_command(UriArgs {
            host: args.host,
            port: args.port,
            context_path: args.context_path,
            servlet_path: args.servlet_path,
        }),
    }
}
