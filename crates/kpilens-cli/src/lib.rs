//! Command line interface

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use kpilens::{
    CategoryFilter, ColumnKind, Config, DatasetCache, DefaultSelection, Filter, FilteredView,
    LoadedDataset, Loader, Order, compute_summary, correlation::correlation_matrix,
    group::group_shares, nested_group_sums, normalized_group_means, top_n_by_group,
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

pub use clap;

pub trait Main {
    fn main(self) -> Result<()>;
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show inferred column kinds and default selections
    Schema {
        /// CSV file to load
        path: PathBuf,
    },
    /// Summary statistics of the measure column
    Summary(Query),
    /// Groups with the largest summed measure
    Top {
        #[command(flatten)]
        query: Query,
        /// Number of groups to show
        #[arg(short, long, default_value_t = 5)]
        n: usize,
        /// Smallest groups first
        #[arg(long)]
        ascending: bool,
    },
    /// Each group's share of the summed measure
    Shares(Query),
    /// Summed measure per group and sub-group
    Breakdown {
        #[command(flatten)]
        query: Query,
        /// Sub-group column, the next categorical column when omitted
        #[arg(long, value_name = "COLUMN")]
        within: Option<String>,
    },
    /// Normalized per-group means of several metrics
    Radar {
        #[command(flatten)]
        query: Query,
        /// Metric columns, all numeric columns when omitted
        #[arg(long = "metric", value_name = "COLUMN")]
        metrics: Vec<String>,
    },
    /// Pearson correlation between numeric columns
    Correlate {
        #[command(flatten)]
        query: Query,
        /// Columns to correlate, all numeric columns when omitted
        #[arg(long = "column", value_name = "COLUMN")]
        columns: Vec<String>,
    },
    /// Write the filtered rows as CSV
    Export {
        #[command(flatten)]
        query: Query,
        /// Output file, standard output when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Source and filter shared by the analysis commands.
#[derive(Debug, Args)]
pub struct Query {
    /// CSV file to load
    path: PathBuf,
    /// Measure column to use instead of the default
    #[arg(long, value_name = "COLUMN")]
    measure: Option<String>,
    /// Dimension column to group by instead of the default
    #[arg(long, value_name = "COLUMN")]
    by: Option<String>,
    /// Keep rows whose dimension value is VALUE; may be repeated
    #[arg(long = "category", value_name = "VALUE", conflicts_with = "no_category")]
    categories: Vec<String>,
    /// Keep no category at all
    #[arg(long)]
    no_category: bool,
    /// Lower bound of the measure, inclusive
    #[arg(long, requires = "max", allow_negative_numbers = true)]
    min: Option<f64>,
    /// Upper bound of the measure, inclusive
    #[arg(long, requires = "min", allow_negative_numbers = true)]
    max: Option<f64>,
}

struct Session {
    loaded: Arc<LoadedDataset>,
    selection: DefaultSelection,
    view: FilteredView,
}

impl Query {
    fn filter(&self) -> Filter {
        let categories = if self.no_category {
            CategoryFilter::none()
        } else if self.categories.is_empty() {
            CategoryFilter::All
        } else {
            CategoryFilter::only(self.categories.iter().cloned())
        };
        let filter = Filter::all().with_categories(categories);
        match (self.min, self.max) {
            (Some(min), Some(max)) => filter.with_range(min, max),
            _ => filter,
        }
    }

    fn open(&self, cache: &DatasetCache) -> Result<Session> {
        let loaded = cache
            .get(&self.path)
            .with_context(|| format!("Failed to load {}", self.path.display()))?;
        let schema = loaded.schema();
        let mut selection = loaded.defaults().clone();
        if let Some(measure) = &self.measure {
            if schema.kind_of(measure) != Some(ColumnKind::Numeric) {
                bail!("{measure} is not a numeric column");
            }
            selection.measure_column.clone_from(measure);
        }
        if let Some(by) = &self.by {
            if schema.kind_of(by) != Some(ColumnKind::Categorical) {
                bail!("{by} is not a categorical column");
            }
            selection.dimension_column = Some(by.clone());
        }
        let filter = self.filter();
        debug!(?selection, ?filter, "Applying filter");
        let view = kpilens::apply_filter(loaded.dataset(), &selection, &filter)?;
        Ok(Session {
            loaded,
            selection,
            view,
        })
    }
}

impl Session {
    fn dimension(&self) -> Result<&str> {
        self.selection
            .dimension_column
            .as_deref()
            .context("Dataset has no categorical column to group by")
    }

    fn inner_dimension(&self, within: Option<String>) -> Result<String> {
        if let Some(column) = within {
            if self.loaded.schema().kind_of(&column) != Some(ColumnKind::Categorical) {
                bail!("{column} is not a categorical column");
            }
            return Ok(column);
        }
        let outer = self.dimension()?;
        self.loaded
            .schema()
            .categorical_columns()
            .iter()
            .find(|column| column.as_str() != outer)
            .cloned()
            .context("Dataset has no second categorical column")
    }

    fn numeric_or(&self, columns: Vec<String>) -> Vec<String> {
        if columns.is_empty() {
            self.loaded.schema().numeric_columns().to_vec()
        } else {
            columns
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

impl Main for Cli {
    fn main(self) -> Result<()> {
        init_tracing();
        let config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => Config::default(),
        };
        let cache = DatasetCache::new(Loader::new(config));
        match self.command {
            Commands::Schema { path } => {
                let loaded = cache
                    .get(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?;
                print_json(&json!({
                    "origin": loaded.origin(),
                    "rows": loaded.dataset().num_rows(),
                    "schema": loaded.schema(),
                    "defaults": loaded.defaults(),
                }))?;
            }
            Commands::Summary(query) => {
                let session = query.open(&cache)?;
                let summary = compute_summary(&session.view, &session.selection.measure_column)?;
                print_json(&json!({
                    "measure": session.selection.measure_column,
                    "summary": summary,
                    "trend": summary.trend(),
                }))?;
            }
            Commands::Top { query, n, ascending } => {
                let session = query.open(&cache)?;
                let order = if ascending {
                    Order::Ascending
                } else {
                    Order::Descending
                };
                let top = top_n_by_group(
                    &session.view,
                    session.dimension()?,
                    &session.selection.measure_column,
                    n,
                    order,
                )?;
                print_json(&top)?;
            }
            Commands::Shares(query) => {
                let session = query.open(&cache)?;
                let shares = group_shares(
                    &session.view,
                    session.dimension()?,
                    &session.selection.measure_column,
                )?;
                print_json(&shares)?;
            }
            Commands::Breakdown { query, within } => {
                let session = query.open(&cache)?;
                let inner = session.inner_dimension(within)?;
                let sums = nested_group_sums(
                    &session.view,
                    session.dimension()?,
                    &inner,
                    &session.selection.measure_column,
                )?;
                print_json(&sums)?;
            }
            Commands::Radar { query, metrics } => {
                let session = query.open(&cache)?;
                let metrics = session.numeric_or(metrics);
                let means = normalized_group_means(&session.view, session.dimension()?, &metrics)?;
                print_json(&means)?;
            }
            Commands::Correlate { query, columns } => {
                let session = query.open(&cache)?;
                let columns = session.numeric_or(columns);
                print_json(&correlation_matrix(&session.view, &columns)?)?;
            }
            Commands::Export { query, output } => {
                let session = query.open(&cache)?;
                match output {
                    Some(path) => {
                        let file = File::create(&path)
                            .with_context(|| format!("Failed to create {}", path.display()))?;
                        session.view.write_csv(BufWriter::new(file))?;
                    }
                    None => session.view.write_csv(io::stdout().lock())?,
                }
            }
        }
        Ok(())
    }
}
