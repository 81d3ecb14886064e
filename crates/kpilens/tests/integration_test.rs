use std::{collections::HashSet, fs, sync::Arc, thread};

use chrono::NaiveDate;
use kpilens::{
    CategoryFilter, Config, DatasetCache, Filter, Loader, Order, Origin, SchemaError, Stat,
    apply_filter, compute_summary, group::group_shares, infer_schema, normalized_group_means,
    select_defaults, synth::synthesize_dataset_at, top_n_by_group,
};
use tempfile::TempDir;

const SALES_CSV: &str = "\
dimension,measure,satisfaction,date
A,10,4.5,2024-01-01
B,20,3.0,2024-01-02
A,30,4.0,2024-01-03
B,40,2.5,2024-01-04
A,50,5.0,2024-01-05
";

fn write_source(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_csv_to_aggregates() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_source(&temp_dir, "sales.csv", SALES_CSV);

    let cache = DatasetCache::new(Loader::default());
    let loaded = cache.get(&path)?;
    assert_eq!(loaded.origin(), &Origin::File { path: path.clone() });

    let defaults = loaded.defaults();
    assert_eq!(defaults.measure_column, "measure");
    assert_eq!(defaults.dimension_column.as_deref(), Some("dimension"));
    assert_eq!(defaults.time_column.as_deref(), Some("date"));

    let view = loaded.view(&Filter::all())?;
    let summary = compute_summary(&view, "measure")?;
    assert_eq!(summary.total, Stat::Defined(150.0));
    assert_eq!(summary.count, 5);
    assert_eq!(summary.mean, Stat::Defined(30.0));
    assert_eq!(summary.max, Stat::Defined(50.0));
    assert_eq!(summary.min, Stat::Defined(10.0));

    let top = top_n_by_group(&view, "dimension", "measure", 2, Order::Descending)?;
    let top: Vec<_> = top.iter().map(|g| (g.group.as_str(), g.value)).collect();
    assert_eq!(top, [("A", 90.0), ("B", 60.0)]);

    let shares = group_shares(&view, "dimension", "measure")?;
    assert_eq!(shares[0].share, Stat::Defined(0.6));
    assert_eq!(shares[1].share, Stat::Defined(0.4));
    Ok(())
}

#[test]
fn test_category_and_range_filter() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_source(&temp_dir, "sales.csv", SALES_CSV);
    let loaded = Loader::default().load(&path)?;

    let filter = Filter::all()
        .with_categories(CategoryFilter::only(["A"]))
        .with_range(0.0, 100.0);
    let view = loaded.view(&filter)?;
    assert_eq!(view.source_rows(), [0, 2, 4]);
    assert_eq!(compute_summary(&view, "measure")?.total, Stat::Defined(90.0));

    let empty = loaded.view(&Filter::all().with_categories(CategoryFilter::none()).with_range(0.0, 100.0))?;
    assert_eq!(empty.num_rows(), 0);
    let summary = compute_summary(&empty, "measure")?;
    assert_eq!(summary.count, 0);
    assert_eq!(summary.total, Stat::Defined(0.0));
    assert_eq!(summary.mean, Stat::Undefined);
    assert_eq!(summary.min, Stat::Undefined);
    assert_eq!(summary.max, Stat::Undefined);
    Ok(())
}

#[test]
fn test_normalized_means_from_csv() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_source(
        &temp_dir,
        "flat.csv",
        "team,score,bonus\nX,1,7\nY,3,7\nX,1,7\n",
    );
    let loaded = Loader::default().load(&path)?;
    let view = loaded.view(&Filter::all())?;

    let means = normalized_group_means(&view, "team", &["score", "bonus"])?;
    assert_eq!(means.get("X", "score"), Some(0.0));
    assert_eq!(means.get("Y", "score"), Some(1.0));
    assert_eq!(means.get("X", "bonus"), Some(0.5));
    assert_eq!(means.get("Y", "bonus"), Some(0.5));
    assert_eq!(means.degenerate.len(), 1);
    assert_eq!(means.degenerate[0].column, "bonus");
    Ok(())
}

#[test]
fn test_unreadable_sources_fall_back() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let ragged = write_source(&temp_dir, "ragged.csv", "a,b\n1,2\n3\n");
    let absent = temp_dir.path().join("absent.csv");

    let mut config = Config::default();
    config.fallback.rows = 30;
    config.fallback.seed = 9;
    let cache = DatasetCache::new(Loader::new(config));

    for path in [&ragged, &absent] {
        let loaded = cache.get(path)?;
        assert!(matches!(loaded.origin(), Origin::Synthetic { .. }));
        assert_eq!(loaded.dataset().num_rows(), 30);
        assert_eq!(loaded.defaults().measure_column, "revenue");
    }
    // both fallbacks come from the same seed
    let a = cache.get(&ragged)?;
    let b = cache.get(&absent)?;
    assert_eq!(
        a.dataset().numbers("revenue")?,
        b.dataset().numbers("revenue")?
    );
    Ok(())
}

#[test]
fn test_schema_errors_surface() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let labels = write_source(&temp_dir, "labels.csv", "name,city\nann,Oslo\nbob,Rome\n");
    let header_only = write_source(&temp_dir, "header.csv", "name,amount\n");

    let cache = DatasetCache::default();
    assert_eq!(cache.get(&labels).unwrap_err(), SchemaError::NoNumericColumn);
    assert_eq!(cache.get(&header_only).unwrap_err(), SchemaError::NoRows);
    Ok(())
}

#[test]
fn test_concurrent_first_access() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_source(&temp_dir, "sales.csv", SALES_CSV);
    let cache = DatasetCache::default();

    let loaded = thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| cache.get(&path))).collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Result<Vec<_>, _>>()
    })?;
    assert!(loaded.iter().all(|d| Arc::ptr_eq(d, &loaded[0])));
    assert_eq!(cache.len(), 1);
    Ok(())
}

#[test]
fn test_view_properties_over_synthetic_data() -> anyhow::Result<()> {
    let anchor = NaiveDate::from_ymd_opt(2025, 6, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    let filters = [
        Filter::all(),
        Filter::all().with_categories(CategoryFilter::only(["North"])),
        Filter::all().with_categories(CategoryFilter::only(["East", "West"])),
        Filter::all().with_categories(CategoryFilter::none()),
        Filter::all().with_range(10_000.0, 30_000.0),
        Filter::all()
            .with_categories(CategoryFilter::only(["South", "Central"]))
            .with_range(20_000.0, 50_000.0),
        // empty interval
        Filter::all().with_range(30_000.0, 10_000.0),
    ];

    let mut empty_views = 0;
    for seed in [1, 7, 42, 1234, 98_765] {
        for rows in [1, 17, 120] {
            let dataset = synthesize_dataset_at(rows, seed, anchor);
            let defaults = select_defaults(&infer_schema(&dataset)?)?;
            let measure = defaults.measure_column.as_str();
            let dimension = defaults.dimension_column.as_deref().unwrap();

            for filter in &filters {
                let view = apply_filter(&dataset, &defaults, filter)?;
                if view.is_empty() {
                    empty_views += 1;
                }

                // rows kept are exactly those that satisfy the filter
                let labels = view.labels(dimension)?;
                let values = view.numbers(measure)?;
                for row in 0..view.num_rows() {
                    if let CategoryFilter::Only(allowed) = &filter.category_filter {
                        assert!(allowed.contains(labels.value(row)));
                    }
                    if let Some(range) = filter.value_range {
                        assert!(range.contains(values.value(row)));
                    }
                }

                let summary = compute_summary(&view, measure)?;
                assert_eq!(summary.count, view.num_rows());
                match (summary.min.value(), summary.mean.value(), summary.max.value()) {
                    (Some(min), Some(mean), Some(max)) => {
                        assert!(min <= mean && mean <= max, "{summary:?}");
                    }
                    (None, None, None) => assert_eq!(summary.count, 0),
                    _ => panic!("partially defined summary {summary:?}"),
                }

                let again = apply_filter(&view, &defaults, filter)?;
                assert_eq!(again.dataset(), view.dataset());
                assert_eq!(again.source_rows(), (0..view.num_rows()).collect::<Vec<_>>());

                let distinct: HashSet<_> = labels.iter().flatten().collect();
                for n in [0, 1, 3, 10] {
                    let top = top_n_by_group(&view, dimension, measure, n, Order::Descending)?;
                    assert!(top.len() <= n);
                    assert_eq!(top.len(), n.min(distinct.len()));
                    assert!(top.windows(2).all(|w| w[0].value >= w[1].value));
                }
            }
        }
    }
    assert!(empty_views > 0);
    Ok(())
}
