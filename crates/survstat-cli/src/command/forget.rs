use std::path::PathBuf;

use anyhow::Context as _;
use survstat_dataset::{
    record::DatasetId,
    store::{DatasetCatalog, JsonFileStore, StatisticsStore as _},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ForgetArg {
    /// Identifier of the dataset
    pub dataset_id: DatasetId,
    /// Directory of persisted statistics
    #[arg(long)]
    pub store: PathBuf,
}

pub(crate) fn run(arg: &ForgetArg) -> anyhow::Result<()> {
    let store = JsonFileStore::open(&arg.store)
        .with_context(|| format!("Failed to open statistics store: {}", arg.store.display()))?;

    // Statistics may exist without a registered dataset
    let had_dataset = store.delete_dataset(arg.dataset_id)?;
    let had_statistics = store.delete(arg.dataset_id)?;
    if had_dataset || had_statistics {
        eprintln!("Forgot dataset {}", arg.dataset_id);
    } else {
        eprintln!("Dataset {} was not in the store", arg.dataset_id);
    }
    Ok(())
}
