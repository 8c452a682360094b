use std::{fs, path::PathBuf};

use anyhow::Context as _;
use survstat_dataset::{
    engine::{EnsureOptions, StatisticsEngine, StatisticsOutcome, parse_refresh_flag},
    loader::LocalFileStorage,
    record::{Dataset, DatasetId, TimeUnit},
    store::{DatasetCatalog, InMemoryStore, JsonFileStore, StatisticsStore},
};
use survstat_stats::cox::PartialLikelihoodCox;

use crate::util::Output;

const STORE_UNAVAILABLE: &str = "statistics storage is unavailable, try again later";

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct StatsArg {
    /// Dataset file (CSV, or TSV for a `.tsv` suffix), relative to `--data-root`
    ///
    /// When omitted, the dataset registered under `--dataset-id` in the store
    /// is used.
    pub file: Option<PathBuf>,
    /// Directory dataset paths are resolved against
    #[arg(long, default_value = ".")]
    pub data_root: PathBuf,
    /// Directory of persisted statistics; statistics are not kept without it
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Identifier of the dataset
    #[arg(long, default_value_t = DatasetId(1))]
    pub dataset_id: DatasetId,
    /// Unit of the survival times (year, month, day, hour)
    #[arg(long, default_value = "month")]
    pub time_unit: TimeUnit,
    /// Recompute even if cached statistics are current (true, 1, yes, recompute)
    #[arg(long)]
    pub refresh: Option<String>,
    /// Skip the per-feature Cox regression
    #[arg(long)]
    pub no_cox: bool,
    /// Output file path
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &StatsArg) -> anyhow::Result<()> {
    match &arg.store {
        Some(dir) => {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create statistics store: {}", dir.display())
            })?;
            let store = JsonFileStore::open(dir).context(STORE_UNAVAILABLE)?;
            compute(arg, store)
        }
        None => compute(arg, InMemoryStore::new()),
    }
}

fn compute<S>(arg: &StatsArg, store: S) -> anyhow::Result<()>
where
    S: StatisticsStore + DatasetCatalog,
{
    let mut engine = StatisticsEngine::new(LocalFileStorage::new(arg.data_root.clone()), store);
    if !arg.no_cox {
        engine = engine.with_cox_fitter(PartialLikelihoodCox::default());
    }
    let mut options = EnsureOptions {
        force_recalculate: arg.refresh.as_deref().is_some_and(parse_refresh_flag),
        include_table: false,
    };

    let outcome = match &arg.file {
        Some(file) => {
            let file_path = file
                .to_str()
                .with_context(|| format!("Dataset path is not valid UTF-8: {}", file.display()))?;
            let dataset = Dataset::new(arg.dataset_id, Some(file_path.to_owned()), arg.time_unit);
            // A re-registered dataset with another file or unit invalidates the cache
            let registered = engine.store().dataset(dataset.id).context(STORE_UNAVAILABLE)?;
            if registered.as_ref() != Some(&dataset) {
                options.force_recalculate = true;
                engine
                    .store()
                    .put_dataset(dataset.clone())
                    .context(STORE_UNAVAILABLE)?;
            }
            engine.ensure_statistics(&dataset, options)?
        }
        None => engine.ensure_statistics_by_id(arg.dataset_id, options)?,
    };

    report(&outcome);
    Output::save_json(&outcome.into_response(), arg.output.clone())
}

fn report(outcome: &StatisticsOutcome) {
    let general = &outcome.stats.general_stats;
    eprintln!(
        "Dataset {}: {} statistics, {} samples, {} features, times in {}s",
        outcome.stats.dataset_id,
        if outcome.source.is_cached() {
            "cached"
        } else {
            "computed"
        },
        general.num_samples,
        general.num_features,
        general.time_unit.as_str(),
    );
    for diagnostic in &outcome.diagnostics {
        eprintln!("  {diagnostic}");
    }
}
