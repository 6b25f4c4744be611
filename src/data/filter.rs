use std::collections::BTreeSet;

use super::model::PurchaseDataset;

// ---------------------------------------------------------------------------
// Manual layer: sidebar selections
// ---------------------------------------------------------------------------

/// Sidebar filter selections. Categorical sets are plain membership tests:
/// a multiselect with nothing checked passes no record, exactly like the
/// widget it backs. Both ranges are inclusive on both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualFilters {
    pub genders: BTreeSet<String>,
    pub seasons: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    /// Inclusive [min, max] age bounds.
    pub age_range: (i64, i64),
    /// Inclusive [min, max] purchase-amount bounds.
    pub amount_range: (f64, f64),
}

impl ManualFilters {
    /// Full-domain defaults: every categorical value selected, ranges
    /// spanning the observed data. Excludes nothing.
    pub fn full_domain(dataset: &PurchaseDataset) -> Self {
        ManualFilters {
            genders: dataset.genders.clone(),
            seasons: dataset.seasons.clone(),
            categories: dataset.categories.clone(),
            age_range: dataset.age_span,
            amount_range: dataset.amount_span,
        }
    }
}

// ---------------------------------------------------------------------------
// Interactive layer: selections made inside the charts
// ---------------------------------------------------------------------------

/// Chart-driven selections layered on top of the manual filters.
///
/// The policy differs from the manual layer on purpose: an empty set here
/// means "no restriction", never "exclude everything". The default state of
/// every chart is all-empty and shows the full base view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractiveFilters {
    /// Selected item names (treemap tiles).
    pub items: BTreeSet<String>,
    /// Selected age-group bucket labels (age chart bars).
    pub age_groups: BTreeSet<String>,
    /// Selected categories (checkboxes beside the category chart). Kept
    /// separate from the manual category multiselect: these are scoped to
    /// the base view and survive manual edits.
    pub categories: BTreeSet<String>,
}

impl InteractiveFilters {
    /// Whether any chart selection currently restricts the view.
    pub fn any_active(&self) -> bool {
        !self.items.is_empty() || !self.age_groups.is_empty() || !self.categories.is_empty()
    }
}

/// The complete selection state the composer consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSelections {
    pub manual: ManualFilters,
    pub interactive: InteractiveFilters,
}

impl FilterSelections {
    /// Selection state that excludes nothing; also the `reset_all` target.
    pub fn full_domain(dataset: &PurchaseDataset) -> Self {
        FilterSelections {
            manual: ManualFilters::full_domain(dataset),
            interactive: InteractiveFilters::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Composer: two passes, strict order
// ---------------------------------------------------------------------------

/// Result of one composer run. Index vectors into `dataset.records`, in
/// dataset order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredViews {
    /// Records passing the manual layer only (the base view).
    pub base: Vec<usize>,
    /// Records passing manual and interactive layers (the final view);
    /// every chart aggregation reads exactly this.
    pub visible: Vec<usize>,
}

/// Pass 1: apply the manual layer to the whole dataset.
pub fn base_indices(dataset: &PurchaseDataset, manual: &ManualFilters) -> Vec<usize> {
    let (age_lo, age_hi) = manual.age_range;
    let (amount_lo, amount_hi) = manual.amount_range;

    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            manual.genders.contains(&rec.gender)
                && manual.seasons.contains(&rec.season)
                && manual.categories.contains(&rec.category)
                && (age_lo..=age_hi).contains(&rec.age)
                && (amount_lo..=amount_hi).contains(&rec.purchase_amount)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Pass 2: narrow the base view by the interactive layer. Each predicate is
/// applied only when its set is non-empty, and the three are ANDed. A record
/// with no age-group bucket fails an active age-group predicate.
pub fn final_indices(
    dataset: &PurchaseDataset,
    base: &[usize],
    interactive: &InteractiveFilters,
) -> Vec<usize> {
    base.iter()
        .copied()
        .filter(|&idx| {
            let rec = &dataset.records[idx];
            if !interactive.items.is_empty() && !interactive.items.contains(&rec.item) {
                return false;
            }
            if !interactive.age_groups.is_empty() {
                match rec.age_group() {
                    Some(label) if interactive.age_groups.contains(label) => {}
                    _ => return false,
                }
            }
            if !interactive.categories.is_empty()
                && !interactive.categories.contains(&rec.category)
            {
                return false;
            }
            true
        })
        .collect()
}

/// Run both passes in order. Pure: identical inputs yield identical views
/// and the dataset is never touched.
pub fn apply(dataset: &PurchaseDataset, selections: &FilterSelections) -> FilteredViews {
    let base = base_indices(dataset, &selections.manual);
    let visible = final_indices(dataset, &base, &selections.interactive);
    FilteredViews { base, visible }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::PurchaseRecord;

    fn record(age: i64, category: &str, item: &str, amount: f64) -> PurchaseRecord {
        PurchaseRecord {
            age,
            gender: if age % 20 == 0 { "Female" } else { "Male" }.to_string(),
            category: category.to_string(),
            item: item.to_string(),
            purchase_amount: amount,
            review_rating: 3.5,
            season: "Winter".to_string(),
            previous_purchases: age / 10,
            extras: BTreeMap::new(),
        }
    }

    /// Five purchases spanning three categories and five age buckets.
    fn sample_dataset() -> PurchaseDataset {
        PurchaseDataset::from_records(vec![
            record(20, "Shoes", "Sneakers", 50.0),
            record(30, "Shoes", "Loafers", 70.0),
            record(40, "Bags", "Tote", 30.0),
            record(50, "Bags", "Clutch", 0.0),
            record(60, "Hats", "Beanie", 10.0),
        ])
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn full_domain_selections_keep_every_record() {
        let ds = sample_dataset();
        let views = apply(&ds, &FilterSelections::full_domain(&ds));
        assert_eq!(views.base, vec![0, 1, 2, 3, 4]);
        assert_eq!(views.visible, views.base);
    }

    #[test]
    fn manual_age_range_is_inclusive_at_both_bounds() {
        let ds = sample_dataset();
        let mut selections = FilterSelections::full_domain(&ds);
        selections.manual.age_range = (20, 50);

        let views = apply(&ds, &selections);
        // Records at exactly 20 and exactly 50 are retained.
        assert_eq!(views.base, vec![0, 1, 2, 3]);
    }

    #[test]
    fn manual_amount_range_is_inclusive_at_both_bounds() {
        let ds = sample_dataset();
        let mut selections = FilterSelections::full_domain(&ds);
        selections.manual.amount_range = (10.0, 50.0);

        let views = apply(&ds, &selections);
        assert_eq!(views.base, vec![0, 2, 4]);
    }

    #[test]
    fn emptied_manual_multiselect_passes_nothing() {
        let ds = sample_dataset();
        let mut selections = FilterSelections::full_domain(&ds);
        selections.manual.genders.clear();

        let views = apply(&ds, &selections);
        assert!(views.base.is_empty());
        assert!(views.visible.is_empty());
    }

    #[test]
    fn empty_interactive_sets_impose_no_restriction() {
        let ds = sample_dataset();
        let mut selections = FilterSelections::full_domain(&ds);
        selections.manual.age_range = (20, 50);

        let views = apply(&ds, &selections);
        assert!(!selections.interactive.any_active());
        assert_eq!(views.visible, views.base);
    }

    #[test]
    fn scenario_manual_age_then_interactive_category() {
        let ds = sample_dataset();
        let mut selections = FilterSelections::full_domain(&ds);
        selections.manual.age_range = (20, 50);
        selections.interactive.categories = set(&["Shoes"]);

        let views = apply(&ds, &selections);
        assert_eq!(views.base, vec![0, 1, 2, 3]);
        assert_eq!(views.visible, vec![0, 1]);
    }

    #[test]
    fn interactive_age_groups_match_derived_buckets() {
        let ds = sample_dataset();
        let mut selections = FilterSelections::full_domain(&ds);
        // Ages 20 and 30 fall in "18-25" and "26-35" respectively.
        selections.interactive.age_groups = set(&["18-25", "26-35"]);

        let views = apply(&ds, &selections);
        assert_eq!(views.visible, vec![0, 1]);
    }

    #[test]
    fn interactive_predicates_compose_conjunctively() {
        let ds = sample_dataset();
        let base = FilterSelections::full_domain(&ds);

        let mut only_items = base.clone();
        only_items.interactive.items = set(&["Sneakers", "Tote"]);
        let mut only_groups = base.clone();
        only_groups.interactive.age_groups = set(&["18-25", "36-45"]);
        let mut only_cats = base.clone();
        only_cats.interactive.categories = set(&["Shoes", "Bags"]);

        let mut combined = base.clone();
        combined.interactive.items = only_items.interactive.items.clone();
        combined.interactive.age_groups = only_groups.interactive.age_groups.clone();
        combined.interactive.categories = only_cats.interactive.categories.clone();

        let intersect = |a: &[usize], b: &[usize]| -> Vec<usize> {
            a.iter().copied().filter(|i| b.contains(i)).collect()
        };
        let expected = intersect(
            &intersect(
                &apply(&ds, &only_items).visible,
                &apply(&ds, &only_groups).visible,
            ),
            &apply(&ds, &only_cats).visible,
        );

        assert_eq!(apply(&ds, &combined).visible, expected);
        assert_eq!(apply(&ds, &combined).visible, vec![0, 2]);
    }

    #[test]
    fn interactive_filters_are_scoped_to_the_base_view() {
        let ds = sample_dataset();
        let mut selections = FilterSelections::full_domain(&ds);
        // Manual layer already removed every Shoes record...
        selections.manual.age_range = (40, 60);
        // ...so selecting Shoes interactively cannot resurrect them.
        selections.interactive.categories = set(&["Shoes", "Hats"]);

        let views = apply(&ds, &selections);
        assert_eq!(views.visible, vec![4]);
    }

    #[test]
    fn apply_is_idempotent_for_identical_state() {
        let ds = sample_dataset();
        let mut selections = FilterSelections::full_domain(&ds);
        selections.manual.age_range = (20, 50);
        selections.interactive.items = set(&["Loafers"]);

        let first = apply(&ds, &selections);
        let second = apply(&ds, &selections);
        assert_eq!(first, second);
    }

    #[test]
    fn views_preserve_dataset_order() {
        let ds = sample_dataset();
        let mut selections = FilterSelections::full_domain(&ds);
        selections.interactive.items = set(&["Beanie", "Sneakers", "Tote"]);

        let views = apply(&ds, &selections);
        assert_eq!(views.visible, vec![0, 2, 4]);
    }
}
