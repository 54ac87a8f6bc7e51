//! envme - spin up Docker services and dev environments
//!
//! This is the main CLI entry point for envme.

use clap::{Parser, Subcommand};
use envme::commands::{self, CreateOptions, DevInput, Dispatcher, ExposeInput, ServiceInput};
use envme::compose::DockerfileTemplate;
use envme::engine::{DockerEngine, Engine};
use envme::error::Result;
use envme::state::{Settings, StateDir};
use envme::tui::ServiceTable;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "ENVME_LOG";

/// envme - Docker services and dev environments on a shared network
#[derive(Parser)]
#[command(name = "envme")]
#[command(version)]
#[command(
    about = "Spin up Docker services and development containers on a shared local network",
    long_about = None
)]
struct Cli {
    /// Fill in missing arguments with interactive forms
    #[arg(short, long, global = true)]
    interactive: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a service or development environment
    #[command(visible_aliases = ["generate", "g"])]
    Create {
        /// Environment variable (KEY=VALUE)
        #[arg(short, long, global = true)]
        env: Vec<String>,
        /// Read environment variables from a .env file instead of --env
        #[arg(long, global = true)]
        env_file: Option<String>,
        /// Expose a port under a hostname (PORT:HOSTNAME)
        #[arg(short = 'p', long = "expose", global = true)]
        expose: Vec<String>,
        #[command(subcommand)]
        command: CreateCommands,
    },

    /// Expose a service port under a public hostname
    #[command(visible_aliases = ["publish", "p"])]
    Expose {
        /// Service name
        name: Option<String>,
        /// Container port
        port: Option<String>,
        /// Hostname to route to the port
        hostname: Option<String>,
    },

    /// List resources
    #[command(visible_aliases = ["ls", "ps"])]
    List {
        #[command(subcommand)]
        command: ListCommands,
    },

    /// Stop a service's containers
    Stop {
        /// Service name
        name: String,
    },

    /// Remove a service's containers
    #[command(visible_alias = "rm")]
    Remove {
        /// Service name
        name: String,
        /// Also delete the service's files and ingress rules
        #[arg(long)]
        purge: bool,
    },

    /// Show a service's logs
    Logs {
        /// Service name
        name: String,
        /// Follow log output
        #[arg(short, long)]
        follow: bool,
    },
}

#[derive(Subcommand)]
enum CreateCommands {
    /// Run a pre-built image as a service
    #[command(visible_aliases = ["srv", "s"])]
    Service {
        /// Service name
        name: Option<String>,
        /// Image to run
        image: Option<String>,
    },

    /// Build and run a development environment from a local directory
    #[command(visible_aliases = ["dev", "d"])]
    Development {
        /// Environment name
        name: Option<String>,
        /// Directory holding the source (and Dockerfile)
        dir: Option<String>,
        /// Dockerfile name inside the directory
        #[arg(long)]
        dockerfile: Option<String>,
        /// Build stage
        #[arg(long)]
        target: Option<String>,
        /// Generate a Dockerfile from a template (none, nextjs, nestjs, laravel)
        #[arg(long)]
        template: Option<DockerfileTemplate>,
    },
}

#[derive(Subcommand)]
enum ListCommands {
    /// List services
    #[command(visible_aliases = ["services", "srv", "s"])]
    Service {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match std::env::var(LOG_ENV) {
        Ok(filter) if !filter.is_empty() => EnvFilter::new(filter),
        _ if cli.debug => EnvFilter::new("debug"),
        _ => EnvFilter::new("info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn connect(state: StateDir, settings: Settings) -> Result<Dispatcher<DockerEngine>> {
    let engine = DockerEngine::connect(&settings).await?;
    engine.ping().await?;
    Ok(Dispatcher::new(state, settings, engine))
}

async fn run(cli: Cli) -> Result<()> {
    let interactive = cli.interactive;

    let state = StateDir::from_env()?;
    state.ensure()?;
    let settings = Settings::load(&state)?;

    match cli.command {
        Commands::Create {
            env,
            env_file,
            expose,
            command,
        } => {
            let options = CreateOptions {
                env,
                env_file,
                expose,
            };

            match command {
                CreateCommands::Service { name, image } => {
                    let request = ServiceInput {
                        name,
                        image,
                        options,
                    }
                    .collect(interactive, &settings)?;

                    let dispatcher = connect(state, settings).await?;
                    let path = dispatcher.create_service(&request).await?;
                    println!("Service {} is up ({})", request.name, path.display());
                }

                CreateCommands::Development {
                    name,
                    dir,
                    dockerfile,
                    target,
                    template,
                } => {
                    let request = DevInput {
                        name,
                        dir,
                        dockerfile,
                        target,
                        template,
                        options,
                    }
                    .collect(interactive, &settings, &state)?;

                    let dispatcher = connect(state, settings).await?;
                    let path = dispatcher.create_development(&request).await?;
                    println!(
                        "Development environment {} is up ({})",
                        request.name,
                        path.display()
                    );
                }
            }
        }

        Commands::Expose {
            name,
            port,
            hostname,
        } => {
            let request = ExposeInput {
                name,
                port,
                hostname,
            }
            .collect(interactive, &settings, &state)?;

            commands::expose(&state, &settings, &request)?;
            println!(
                "{} -> https://{}",
                request.exposure.service_url(&request.name),
                request.exposure.hostname
            );
        }

        Commands::List { command } => match command {
            ListCommands::Service { json } => {
                let dispatcher = connect(state, settings).await?;
                let rows = dispatcher.list_services().await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else if interactive {
                    ServiceTable::new(rows).run()?;
                } else {
                    commands::write_rows(&rows, &mut std::io::stdout().lock())?;
                }
            }
        },

        Commands::Stop { name } => {
            let dispatcher = connect(state, settings).await?;
            dispatcher.stop(&name).await?;
            println!("{}", name);
        }

        Commands::Remove { name, purge } => {
            let dispatcher = connect(state, settings).await?;
            dispatcher.remove(&name, purge).await?;
            println!("{}", name);
        }

        Commands::Logs { name, follow } => {
            let dispatcher = connect(state, settings).await?;
            dispatcher.logs(&name, follow, &mut std::io::stdout()).await?;
        }
    }

    Ok(())
}
