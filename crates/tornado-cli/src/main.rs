//! tornado: deploy a Tornado web application to one or more regions.
//!
//! Results are printed to stdout as JSON; logs go to stderr.
//!
//! ```text
//! tornado plan   -f tornado.toml
//! tornado deploy -f tornado.toml --data-dir .tornado
//! tornado state  -p demo
//! tornado remove -p demo
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tornado",
    about = "Tornado: multi-region deployer for Tornado web applications",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical configuration and every region's settings
    Plan {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        data: DataArgs,
    },
    /// Deploy against the sandbox cloud and print the aggregated output
    Deploy {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        data: DataArgs,
        /// Directory holding the runtime shim (default: the built-in shim)
        #[arg(long)]
        shim_dir: Option<PathBuf>,
    },
    /// Tear a project down from its persisted state
    Remove {
        #[arg(short, long)]
        project: String,
        #[command(flatten)]
        data: DataArgs,
    },
    /// Print persisted state (all projects when --project is omitted)
    State {
        #[arg(short, long)]
        project: Option<String>,
        #[command(flatten)]
        data: DataArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Input document (TOML, or JSON by extension)
    #[arg(short, long, default_value = "tornado.toml")]
    pub file: PathBuf,
    /// Seed for the generated function name
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory for persisted deployment state
    #[arg(long, default_value = ".tornado")]
    pub data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,tornado=debug"))?,
        )
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Plan { input, data } => {
            serde_json::to_value(commands::plan::plan(&input, &data)?)?
        }
        Commands::Deploy {
            input,
            data,
            shim_dir,
        } => serde_json::to_value(
            commands::deploy::deploy(&input, &data, shim_dir.as_deref()).await?,
        )?,
        Commands::Remove { project, data } => {
            serde_json::to_value(commands::remove::remove(&project, &data).await?)?
        }
        Commands::State { project, data } => {
            commands::state::state(project.as_deref(), &data)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_flags() {
        let cli = Cli::try_parse_from([
            "tornado", "deploy", "-f", "app.json", "--seed", "7", "--data-dir", "/tmp/d",
            "--shim-dir", "shim",
        ])
        .unwrap();
        let Commands::Deploy {
            input,
            data,
            shim_dir,
        } = cli.command
        else {
            panic!("expected deploy");
        };
        assert_eq!(input.file, PathBuf::from("app.json"));
        assert_eq!(input.seed, Some(7));
        assert_eq!(data.data_dir, PathBuf::from("/tmp/d"));
        assert_eq!(shim_dir, Some(PathBuf::from("shim")));
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["tornado", "plan"]).unwrap();
        let Commands::Plan { input, data } = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(input.file, PathBuf::from("tornado.toml"));
        assert_eq!(input.seed, None);
        assert_eq!(data.data_dir, PathBuf::from(".tornado"));
    }

    #[test]
    fn remove_requires_project() {
        assert!(Cli::try_parse_from(["tornado", "remove"]).is_err());
        assert!(Cli::try_parse_from(["tornado", "remove", "-p", "demo"]).is_ok());
    }
}
