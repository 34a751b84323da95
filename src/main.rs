use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use affooh_relay::{report, server::RelayServer, testdata, utils::Config};

#[derive(Parser)]
#[command(name = "affooh-relay")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(about = "Trigger Playwright runs and relay their results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP relay server
    Serve {
        /// Server port
        #[arg(short, long, env = "PORT", default_value = "3000")]
        port: u16,

        /// Directory the runner executes in; state files live here
        #[arg(short, long, env = "RELAY_WORKDIR", default_value = ".")]
        workdir: PathBuf,

        /// Command line that runs the test suite
        #[arg(long, env = "RELAY_RUNNER_COMMAND", default_value = "npx playwright test")]
        runner_command: String,
    },

    /// Flatten a Playwright JSON report into a run report
    Parse {
        /// Path to the result tree, relative to --workdir
        #[arg(default_value = "test-results.json")]
        results: PathBuf,

        /// Project id stamped on the report
        #[arg(short, long, default_value = "")]
        project: String,

        /// Directory screenshot paths resolve against
        #[arg(short, long, default_value = ".")]
        workdir: PathBuf,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect test-case fixtures
    Data {
        /// Directory holding testdata.json / current-test-data.json
        #[arg(short, long, default_value = ".")]
        workdir: PathBuf,

        /// Print the fixture of one test case
        #[arg(long)]
        id: Option<String>,

        /// List test case ids containing this pattern
        #[arg(long)]
        pattern: Option<String>,

        /// Validate a fixture file instead of loading the store
        #[arg(long)]
        validate: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            workdir,
            runner_command,
        } => {
            let config = Config {
                port,
                runner_command,
                ..Config::with_workdir(workdir)
            };
            RelayServer::new(config).start().await?;
        }

        Commands::Parse {
            results,
            project,
            workdir,
            output,
        } => {
            eprintln!(
                "{} Parsing results from: {}",
                "📂".to_string().blue(),
                results.display()
            );
            let run = report::generate_report(&results, &project, &workdir, output.as_deref()).await?;
            eprintln!("{} {}", "✅".green(), run.summary());
        }

        Commands::Data {
            workdir,
            id,
            pattern,
            validate,
        } => {
            if let Some(path) = validate {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let value: serde_json::Value = serde_json::from_str(&raw)?;
                match testdata::validate(&value) {
                    Ok(()) => println!("{} {} is valid", "✅".green(), path.display()),
                    Err(reason) => anyhow::bail!("{}: {}", path.display(), reason),
                }
                return Ok(());
            }

            let store = testdata::TestDataStore::from_config(&Config::with_workdir(workdir))?;
            if let Some(id) = id {
                println!("{}", serde_json::to_string_pretty(store.get(&id)?)?);
            } else if let Some(pattern) = pattern {
                for id in store.filter_by_pattern(&pattern) {
                    println!("{}", id);
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&store.info())?);
            }
        }
    }

    Ok(())
}
