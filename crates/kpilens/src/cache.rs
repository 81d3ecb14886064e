//! Loading sources with synthetic fallback, and the per-path dataset cache.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    dataset::Dataset,
    error::{Error, SchemaError},
    filter::{Filter, FilteredView, apply_filter},
    schema::{DefaultSelection, Schema, infer_schema_with, select_defaults},
    source,
    synth::synthesize_dataset,
};

/// Where a loaded dataset came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    File { path: PathBuf },
    /// The source could not be read; `reason` says why.
    Synthetic { reason: String },
}

/// A dataset together with the schema and defaults derived from it at load
/// time.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    dataset: Dataset,
    schema: Schema,
    defaults: DefaultSelection,
    origin: Origin,
}

impl LoadedDataset {
    /// Infer, conform and select defaults for an in-memory dataset.
    pub fn from_dataset(dataset: Dataset, origin: Origin, config: &Config) -> Result<Self, Error> {
        let schema = infer_schema_with(&dataset, &config.inference)?;
        let dataset = dataset.conform(&schema)?;
        let defaults = select_defaults(&schema)?;
        Ok(Self {
            dataset,
            schema,
            defaults,
            origin,
        })
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn defaults(&self) -> &DefaultSelection {
        &self.defaults
    }

    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Recompute the filtered view from scratch.
    pub fn view(&self, filter: &Filter) -> Result<FilteredView, Error> {
        apply_filter(&self.dataset, &self.defaults, filter)
    }
}

/// Reads sources, falling back to synthetic data when a source is missing
/// or malformed.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: Config,
}

impl Loader {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load `path`. Read and parse failures, including an empty file, fall
    /// back to synthetic data; schema errors on data that was read are
    /// returned.
    pub fn load(&self, path: &Path) -> Result<LoadedDataset, SchemaError> {
        let dataset = match source::read_csv(path, &self.config.source) {
            Ok(dataset) => dataset,
            Err(e) => return self.fallback(path, &e),
        };
        let schema = match infer_schema_with(&dataset, &self.config.inference) {
            Ok(schema) => schema,
            // nothing was parsed, not even a header
            Err(SchemaError::NoColumns) => {
                return self.fallback(path, &SchemaError::NoColumns.into());
            }
            Err(e) => return Err(e),
        };
        let dataset = match dataset.conform(&schema) {
            Ok(dataset) => dataset,
            Err(e) => return self.fallback(path, &e),
        };
        let defaults = select_defaults(&schema)?;
        info!(
            path = %path.display(),
            rows = dataset.num_rows(),
            measure = %defaults.measure_column,
            "Loaded dataset"
        );
        Ok(LoadedDataset {
            dataset,
            schema,
            defaults,
            origin: Origin::File {
                path: path.to_owned(),
            },
        })
    }

    fn fallback(&self, path: &Path, reason: &Error) -> Result<LoadedDataset, SchemaError> {
        warn!(
            "Failed to read {}: {reason}. Using synthetic data.",
            path.display()
        );
        let fallback = &self.config.fallback;
        let dataset = synthesize_dataset(fallback.rows, fallback.seed);
        // synthetic columns are already in canonical storage
        let schema = infer_schema_with(&dataset, &self.config.inference)?;
        let defaults = select_defaults(&schema)?;
        Ok(LoadedDataset {
            dataset,
            schema,
            defaults,
            origin: Origin::Synthetic {
                reason: reason.to_string(),
            },
        })
    }
}

type LoadFn = dyn Fn(&Path) -> Result<LoadedDataset, SchemaError> + Send + Sync;
type Slot = OnceLock<Result<Arc<LoadedDataset>, SchemaError>>;

/// Loaded datasets keyed by source path.
///
/// Each path is loaded at most once, even under concurrent callers: the
/// first caller loads while the others for the same path wait for its
/// result. Loads of different paths do not block each other.
pub struct DatasetCache {
    load: Box<LoadFn>,
    slots: Mutex<HashMap<PathBuf, Arc<Slot>>>,
}

impl DatasetCache {
    #[must_use]
    pub fn new(loader: Loader) -> Self {
        Self::with_load_fn(move |path| loader.load(path))
    }

    pub fn with_load_fn<F>(load: F) -> Self
    where
        F: Fn(&Path) -> Result<LoadedDataset, SchemaError> + Send + Sync + 'static,
    {
        Self {
            load: Box::new(load),
            slots: Mutex::default(),
        }
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Result<Arc<LoadedDataset>, SchemaError> {
        let path = path.as_ref();
        let slot = Arc::clone(self.lock().entry(path.to_owned()).or_default());
        slot.get_or_init(|| {
            debug!(path = %path.display(), "Loading dataset into cache");
            (self.load)(path).map(Arc::new)
        })
        .clone()
    }

    /// Forget `path` so the next [`get`](Self::get) loads it again.
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        self.lock().remove(path.as_ref()).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<Slot>>> {
        // the map is never left half-updated
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(Loader::default())
    }
}

impl fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
