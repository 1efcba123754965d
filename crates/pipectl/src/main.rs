use std::path::PathBuf;

use anyhow::Context;
use clap::{Arg, Command};
use pipeline::StageRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .long("config")
        .short('c')
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .help("Pipeline configuration file (.toml, .yaml or .json)");

    Command::new("pipectl")
        .about("Inspect, validate and dry-run event pipelines")
        .subcommand_required(true)
        .subcommand(Command::new("stages").about("List stage kinds and their parameters"))
        .subcommand(
            Command::new("validate")
                .about("Assemble a pipeline and report its stages")
                .arg(config_arg.clone()),
        )
        .subcommand(
            Command::new("run")
                .about("Push one event through a pipeline with logging-only transports")
                .arg(config_arg)
                .arg(
                    Arg::new("event")
                        .long("event")
                        .short('e')
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("JSON file holding the event"),
                ),
        )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipectl=info,pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let registry = StageRegistry::with_builtin_stages();
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("stages", _)) => {
            let described = pipectl::describe_stages(&registry);
            println!("{}", serde_json::to_string_pretty(&described)?);
        }
        Some(("validate", args)) => {
            let config = args
                .get_one::<PathBuf>("config")
                .context("missing --config")?;
            for (position, name) in pipectl::validate(config, &registry)?.iter().enumerate() {
                println!("{:>2}. {}", position + 1, name);
            }
        }
        Some(("run", args)) => {
            let config = args
                .get_one::<PathBuf>("config")
                .context("missing --config")?;
            let event = args
                .get_one::<PathBuf>("event")
                .context("missing --event")?;
            match pipectl::run(config, event, &registry)? {
                Some(output) => println!("{}", String::from_utf8_lossy(&output)),
                None => tracing::info!("pipeline produced no output data"),
            }
        }
        _ => unreachable!("subcommand_required is set"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_run_requires_event() {
        let result = cli().try_get_matches_from(["pipectl", "run", "--config", "p.toml"]);
        assert!(result.is_err());

        let matches = cli()
            .try_get_matches_from(["pipectl", "run", "-c", "p.toml", "-e", "event.json"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(args.get_one::<PathBuf>("event").unwrap(), &PathBuf::from("event.json"));
    }
}
