use clap::{Parser, Subcommand};
use tracing::Level;

use self::{forget::ForgetArg, stats::StatsArg};

mod forget;
mod stats;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log verbosity (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value_t = Level::WARN)]
    log_level: Level,
    /// What to do
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Compute, or fetch from the cache, the statistics of a dataset
    Stats(#[clap(flatten)] StatsArg),
    /// Remove a dataset and its cached statistics from a store
    Forget(#[clap(flatten)] ForgetArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_logging(args.log_level);
    match args.mode {
        Mode::Stats(arg) => stats::run(&arg)?,
        Mode::Forget(arg) => forget::run(&arg)?,
    }
    Ok(())
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;
    use survstat_dataset::record::{DatasetId, TimeUnit};

    use super::*;

    fn parse(args: &[&str]) -> CommandArgs {
        CommandArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_command_definition_is_valid() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_stats_defaults() {
        let args = parse(&["survstat", "stats", "cohort.csv"]);
        assert_eq!(args.log_level, Level::WARN);
        let Mode::Stats(arg) = args.mode else {
            panic!("expected stats mode");
        };
        assert_eq!(arg.file.as_deref(), Some(std::path::Path::new("cohort.csv")));
        assert_eq!(arg.dataset_id, DatasetId(1));
        assert_eq!(arg.time_unit, TimeUnit::Month);
        assert!(arg.store.is_none());
        assert!(!arg.no_cox);
    }

    #[test]
    fn test_stats_options() {
        let args = parse(&[
            "survstat",
            "stats",
            "--time-unit",
            "day",
            "--dataset-id",
            "42",
            "--refresh",
            "yes",
            "--no-cox",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.log_level, Level::DEBUG);
        let Mode::Stats(arg) = args.mode else {
            panic!("expected stats mode");
        };
        assert!(arg.file.is_none());
        assert_eq!(arg.dataset_id, DatasetId(42));
        assert_eq!(arg.time_unit, TimeUnit::Day);
        assert_eq!(arg.refresh.as_deref(), Some("yes"));
        assert!(arg.no_cox);
    }

    #[test]
    fn test_forget_requires_store() {
        assert!(CommandArgs::try_parse_from(["survstat", "forget", "3"]).is_err());
        let args = parse(&["survstat", "forget", "3", "--store", "cache"]);
        let Mode::Forget(arg) = args.mode else {
            panic!("expected forget mode");
        };
        assert_eq!(arg.dataset_id, DatasetId(3));
    }

    #[test]
    fn test_invalid_time_unit_is_rejected() {
        let result =
            CommandArgs::try_parse_from(["survstat", "stats", "a.csv", "--time-unit", "week"]);
        assert!(result.is_err());
    }
}
