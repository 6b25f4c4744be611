use std::collections::BTreeMap;

use thiserror::Error;

use super::model::{PurchaseDataset, PurchaseRecord, AGE_GROUPS};
use super::model::{COL_AGE, COL_AMOUNT, COL_PREVIOUS, COL_RATING};

// ---------------------------------------------------------------------------
// Non-fatal pipeline outcomes
// ---------------------------------------------------------------------------

/// The final view is empty: every visualization is withheld for this cycle
/// and a single notice invites the user to relax their filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no data matches the current filters")]
pub struct EmptyFilterResult;

/// A transform needs more rows than the final view holds. Per-chart: only
/// the affected visualization is replaced by a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{required} rows required, {actual} available")]
pub struct InsufficientData {
    pub required: usize,
    pub actual: usize,
}

// ---------------------------------------------------------------------------
// Group-by transforms
// ---------------------------------------------------------------------------

/// Sum of purchase amounts per category. Only observed categories appear;
/// a group is never emitted as a zero/null placeholder.
pub fn category_totals(dataset: &PurchaseDataset, view: &[usize]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for &idx in view {
        let rec = &dataset.records[idx];
        *totals.entry(rec.category.clone()).or_insert(0.0) += rec.purchase_amount;
    }
    totals
}

/// Sum of purchase amounts per (category, item) pair, nested for the
/// two-level hierarchy view. A parent's value is implicitly the sum of its
/// children.
pub fn category_item_totals(
    dataset: &PurchaseDataset,
    view: &[usize],
) -> BTreeMap<String, BTreeMap<String, f64>> {
    let mut totals: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for &idx in view {
        let rec = &dataset.records[idx];
        *totals
            .entry(rec.category.clone())
            .or_default()
            .entry(rec.item.clone())
            .or_insert(0.0) += rec.purchase_amount;
    }
    totals
}

/// Sum of purchase amounts per age-group bucket, in bucket order. Empty
/// buckets are omitted, as are records whose age falls outside every bucket.
pub fn age_group_totals(dataset: &PurchaseDataset, view: &[usize]) -> Vec<(&'static str, f64)> {
    let mut sums: BTreeMap<&'static str, f64> = BTreeMap::new();
    for &idx in view {
        let rec = &dataset.records[idx];
        if let Some(label) = rec.age_group() {
            *sums.entry(label).or_insert(0.0) += rec.purchase_amount;
        }
    }
    AGE_GROUPS
        .iter()
        .filter_map(|label| sums.get(label).map(|&total| (*label, total)))
        .collect()
}

// ---------------------------------------------------------------------------
// Correlation matrix
// ---------------------------------------------------------------------------

/// The numeric columns feeding the correlation matrix, in axis order.
pub const CORRELATION_FIELDS: [&str; 4] = [COL_AGE, COL_AMOUNT, COL_RATING, COL_PREVIOUS];

/// Pairwise Pearson correlations over [`CORRELATION_FIELDS`]. Symmetric by
/// construction; the diagonal is exactly 1.0; defined entries are clamped to
/// [-1, 1]. An entry is NaN when either column has zero variance in the
/// view; correlation is undefined there and the cell renders as blank.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub values: [[f64; 4]; 4],
}

fn numeric_profile(rec: &PurchaseRecord) -> [f64; 4] {
    [
        rec.age as f64,
        rec.purchase_amount,
        rec.review_rating,
        rec.previous_purchases as f64,
    ]
}

/// Compute the correlation matrix over the view. Correlation is undefined
/// for fewer than two rows and is not attempted.
pub fn correlation_matrix(
    dataset: &PurchaseDataset,
    view: &[usize],
) -> Result<CorrelationMatrix, InsufficientData> {
    const MIN_ROWS: usize = 2;
    if view.len() < MIN_ROWS {
        return Err(InsufficientData {
            required: MIN_ROWS,
            actual: view.len(),
        });
    }

    let rows: Vec<[f64; 4]> = view
        .iter()
        .map(|&idx| numeric_profile(&dataset.records[idx]))
        .collect();
    let n = rows.len() as f64;

    let mut mean = [0.0f64; 4];
    for row in &rows {
        for (acc, value) in mean.iter_mut().zip(row) {
            *acc += value;
        }
    }
    for acc in &mut mean {
        *acc /= n;
    }

    let mut values = [[0.0f64; 4]; 4];
    for i in 0..4 {
        values[i][i] = 1.0;
        for j in (i + 1)..4 {
            let mut cov = 0.0;
            let mut var_i = 0.0;
            let mut var_j = 0.0;
            for row in &rows {
                let di = row[i] - mean[i];
                let dj = row[j] - mean[j];
                cov += di * dj;
                var_i += di * di;
                var_j += dj * dj;
            }
            let denom = (var_i * var_j).sqrt();
            let r = if denom > 0.0 {
                (cov / denom).clamp(-1.0, 1.0)
            } else {
                f64::NAN
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix { values })
}

// ---------------------------------------------------------------------------
// Per-cycle chart bundle
// ---------------------------------------------------------------------------

/// Everything the charts read for one recompute cycle, built in one go so a
/// frame never mixes aggregates from different filter states.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub category_totals: BTreeMap<String, f64>,
    pub sales_hierarchy: BTreeMap<String, BTreeMap<String, f64>>,
    pub age_group_totals: Vec<(&'static str, f64)>,
    pub correlation: Result<CorrelationMatrix, InsufficientData>,
}

impl ChartData {
    /// Run every per-chart transform over the final view. An empty view
    /// short-circuits: no aggregate may be built from nothing.
    pub fn compute(dataset: &PurchaseDataset, view: &[usize]) -> Result<ChartData, EmptyFilterResult> {
        if view.is_empty() {
            return Err(EmptyFilterResult);
        }
        Ok(ChartData {
            category_totals: category_totals(dataset, view),
            sales_hierarchy: category_item_totals(dataset, view),
            age_group_totals: age_group_totals(dataset, view),
            correlation: correlation_matrix(dataset, view),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap as Map;

    use super::*;

    fn record(
        age: i64,
        category: &str,
        item: &str,
        amount: f64,
        rating: f64,
        previous: i64,
    ) -> PurchaseRecord {
        PurchaseRecord {
            age,
            gender: "Female".to_string(),
            category: category.to_string(),
            item: item.to_string(),
            purchase_amount: amount,
            review_rating: rating,
            season: "Summer".to_string(),
            previous_purchases: previous,
            extras: Map::new(),
        }
    }

    fn scenario_dataset() -> PurchaseDataset {
        PurchaseDataset::from_records(vec![
            record(20, "Shoes", "Sneakers", 50.0, 4.0, 2),
            record(30, "Shoes", "Loafers", 70.0, 3.5, 3),
            record(40, "Bags", "Tote", 30.0, 4.5, 4),
            record(50, "Bags", "Clutch", 0.0, 2.5, 5),
            record(60, "Hats", "Beanie", 10.0, 5.0, 6),
        ])
    }

    fn all(ds: &PurchaseDataset) -> Vec<usize> {
        (0..ds.len()).collect()
    }

    #[test]
    fn category_totals_sum_amounts_per_category() {
        let ds = scenario_dataset();
        let totals = category_totals(&ds, &all(&ds));

        assert_eq!(totals.len(), 3);
        assert_eq!(totals["Shoes"], 120.0);
        assert_eq!(totals["Bags"], 30.0);
        assert_eq!(totals["Hats"], 10.0);
    }

    #[test]
    fn category_totals_conserve_the_view_total() {
        let ds = scenario_dataset();
        let view = [0usize, 1, 3];
        let totals = category_totals(&ds, &view);

        let from_groups: f64 = totals.values().sum();
        let from_view: f64 = view.iter().map(|&i| ds.records[i].purchase_amount).sum();
        assert!((from_groups - from_view).abs() < 1e-9);
    }

    #[test]
    fn unobserved_categories_are_omitted_not_zeroed() {
        let ds = scenario_dataset();
        // Only Shoes rows in the view → no Bags/Hats keys at all.
        let totals = category_totals(&ds, &[0, 1]);
        assert_eq!(totals.len(), 1);
        assert!(totals.contains_key("Shoes"));
    }

    #[test]
    fn scenario_interactive_shoes_totals() {
        let ds = scenario_dataset();
        let totals = category_totals(&ds, &[0, 1]);
        assert_eq!(totals, Map::from([("Shoes".to_string(), 120.0)]));

        let hierarchy = category_item_totals(&ds, &[0, 1]);
        assert_eq!(hierarchy.len(), 1);
        assert_eq!(hierarchy["Shoes"]["Sneakers"], 50.0);
        assert_eq!(hierarchy["Shoes"]["Loafers"], 70.0);
    }

    #[test]
    fn hierarchy_children_sum_to_the_category_total() {
        let ds = scenario_dataset();
        let view = all(&ds);
        let totals = category_totals(&ds, &view);
        let hierarchy = category_item_totals(&ds, &view);

        for (category, items) in &hierarchy {
            let children: f64 = items.values().sum();
            assert!((children - totals[category]).abs() < 1e-9);
        }
    }

    #[test]
    fn repeated_purchases_of_one_item_accumulate() {
        let ds = PurchaseDataset::from_records(vec![
            record(25, "Shoes", "Sneakers", 40.0, 4.0, 1),
            record(31, "Shoes", "Sneakers", 35.0, 4.0, 2),
        ]);
        let hierarchy = category_item_totals(&ds, &all(&ds));
        assert_eq!(hierarchy["Shoes"]["Sneakers"], 75.0);
    }

    #[test]
    fn age_group_totals_follow_bucket_order_and_skip_empties() {
        let ds = scenario_dataset();
        let totals = age_group_totals(&ds, &all(&ds));

        let labels: Vec<&str> = totals.iter().map(|(label, _)| *label).collect();
        // Ages 20/30/40/50/60 → five distinct buckets, "65+" untouched.
        assert_eq!(labels, vec!["18-25", "26-35", "36-45", "46-55", "56-65"]);
        assert_eq!(totals[0], ("18-25", 50.0));
        assert_eq!(totals[4], ("56-65", 10.0));
    }

    #[test]
    fn bucketless_records_do_not_reach_age_totals() {
        let ds = PurchaseDataset::from_records(vec![
            record(120, "Hats", "Beanie", 99.0, 4.0, 1),
            record(30, "Hats", "Beanie", 12.0, 4.0, 1),
        ]);
        let totals = age_group_totals(&ds, &all(&ds));
        assert_eq!(totals, vec![("26-35", 12.0)]);
    }

    #[test]
    fn correlation_needs_two_rows() {
        let ds = scenario_dataset();
        let err = correlation_matrix(&ds, &[2]).unwrap_err();
        assert_eq!(err, InsufficientData { required: 2, actual: 1 });
        assert!(correlation_matrix(&ds, &[2, 3]).is_ok());
    }

    #[test]
    fn correlation_diagonal_is_exactly_one() {
        let ds = scenario_dataset();
        let matrix = correlation_matrix(&ds, &all(&ds)).unwrap();
        for i in 0..4 {
            assert_eq!(matrix.values[i][i], 1.0);
        }
    }

    #[test]
    fn correlation_matrix_is_symmetric_and_bounded() {
        let ds = scenario_dataset();
        let matrix = correlation_matrix(&ds, &all(&ds)).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                let v = matrix.values[i][j];
                assert_eq!(v.to_bits(), matrix.values[j][i].to_bits());
                if !v.is_nan() {
                    assert!((-1.0..=1.0).contains(&v));
                }
            }
        }
    }

    #[test]
    fn perfectly_linear_columns_correlate_to_one() {
        // Amount is exactly 2 × age → r(age, amount) = 1.
        let ds = PurchaseDataset::from_records(vec![
            record(10, "Shoes", "A", 20.0, 3.0, 1),
            record(20, "Shoes", "B", 40.0, 4.0, 5),
            record(30, "Shoes", "C", 60.0, 3.5, 2),
            record(40, "Shoes", "D", 80.0, 4.5, 7),
        ]);
        let matrix = correlation_matrix(&ds, &all(&ds)).unwrap();
        assert!((matrix.values[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn anti_correlated_columns_reach_minus_one() {
        let ds = PurchaseDataset::from_records(vec![
            record(10, "Shoes", "A", 90.0, 3.0, 1),
            record(20, "Shoes", "B", 80.0, 4.0, 5),
            record(30, "Shoes", "C", 70.0, 3.5, 2),
        ]);
        let matrix = correlation_matrix(&ds, &all(&ds)).unwrap();
        assert!((matrix.values[0][1] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_variance_column_yields_undefined_cells() {
        // Every rating identical → rating correlations are undefined.
        let ds = PurchaseDataset::from_records(vec![
            record(10, "Shoes", "A", 20.0, 4.0, 1),
            record(20, "Shoes", "B", 40.0, 4.0, 5),
            record(30, "Shoes", "C", 60.0, 4.0, 2),
        ]);
        let matrix = correlation_matrix(&ds, &all(&ds)).unwrap();
        assert!(matrix.values[0][2].is_nan());
        assert!(matrix.values[2][3].is_nan());
        assert_eq!(matrix.values[2][2], 1.0);
    }

    #[test]
    fn chart_data_short_circuits_on_an_empty_view() {
        let ds = scenario_dataset();
        assert_eq!(ChartData::compute(&ds, &[]).unwrap_err(), EmptyFilterResult);
    }

    #[test]
    fn chart_data_carries_per_chart_insufficiency() {
        let ds = scenario_dataset();
        let charts = ChartData::compute(&ds, &[4]).unwrap();
        // One row: totals exist, correlation alone is withheld.
        assert_eq!(charts.category_totals["Hats"], 10.0);
        assert!(charts.correlation.is_err());
    }
}
