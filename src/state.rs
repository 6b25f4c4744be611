use std::collections::BTreeSet;
use std::path::Path;

use crate::data::aggregate::{ChartData, EmptyFilterResult};
use crate::data::filter::{self, FilterSelections, FilteredViews, ManualFilters};
use crate::data::loader;
use crate::data::model::PurchaseDataset;

// ---------------------------------------------------------------------------
// Dashboard session
// ---------------------------------------------------------------------------

/// One dataset plus everything derived from it: the active selections, the
/// filtered views and the chart aggregates. Loading a new dataset replaces
/// the whole session, so stale selections can never leak across files.
pub struct Session {
    /// The cleaned, immutable dataset.
    pub dataset: PurchaseDataset,

    /// Manual and interactive filter layers.
    pub selections: FilterSelections,

    /// Base and final index views, recomputed on every mutation.
    pub views: FilteredViews,

    /// Aggregates for the current final view, or the empty-view notice.
    pub charts: Result<ChartData, EmptyFilterResult>,
}

impl Session {
    /// Fresh session: manual filters at full domain, no interactive
    /// selections, views and charts precomputed before the first read.
    pub fn new(dataset: PurchaseDataset) -> Self {
        let selections = FilterSelections::full_domain(&dataset);
        let mut session = Self {
            dataset,
            selections,
            views: FilteredViews::default(),
            charts: Err(EmptyFilterResult),
        };
        session.recompute();
        session
    }

    /// Replace the manual layer wholesale. Interactive selections are a
    /// separate layer and survive manual changes untouched.
    pub fn set_manual_filters(&mut self, manual: ManualFilters) {
        self.selections.manual = manual;
        self.recompute();
    }

    /// Toggle one item in the interactive item set.
    pub fn toggle_item(&mut self, item: &str) {
        Self::toggle(&mut self.selections.interactive.items, item);
        self.recompute();
    }

    /// Toggle one age-group bucket in the interactive set.
    pub fn toggle_age_group(&mut self, label: &str) {
        Self::toggle(&mut self.selections.interactive.age_groups, label);
        self.recompute();
    }

    /// Toggle one category in the interactive category set.
    pub fn toggle_category(&mut self, category: &str) {
        Self::toggle(&mut self.selections.interactive.categories, category);
        self.recompute();
    }

    /// Empty the interactive item set (no restriction).
    pub fn clear_items(&mut self) {
        self.selections.interactive.items.clear();
        self.recompute();
    }

    /// Empty the interactive age-group set (no restriction).
    pub fn clear_age_groups(&mut self) {
        self.selections.interactive.age_groups.clear();
        self.recompute();
    }

    /// Empty the interactive category set (no restriction).
    pub fn clear_categories(&mut self) {
        self.selections.interactive.categories.clear();
        self.recompute();
    }

    /// Back to the initial state: full-domain manual filters, empty
    /// interactive sets, every record visible again.
    pub fn reset_all(&mut self) {
        self.selections = FilterSelections::full_domain(&self.dataset);
        self.recompute();
    }

    fn toggle(set: &mut BTreeSet<String>, value: &str) {
        if !set.remove(value) {
            set.insert(value.to_string());
        }
    }

    /// Re-run the whole pipeline synchronously. Every read between two
    /// mutations sees this finished snapshot, never a half-applied one.
    fn recompute(&mut self) {
        self.views = filter::apply(&self.dataset, &self.selections);
        self.charts = ChartData::compute(&self.dataset, &self.views.visible);
        log::debug!(
            "recompute: {} base, {} visible of {} records",
            self.views.base.len(),
            self.views.visible.len(),
            self.dataset.len()
        );
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Active session (None until a dataset loads).
    pub session: Option<Session>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Start a fresh session over a newly loaded dataset.
    pub fn set_dataset(&mut self, dataset: PurchaseDataset) {
        self.session = Some(Session::new(dataset));
        self.status_message = None;
    }

    /// Load `path` and replace the session on success. On failure the
    /// previous session (if any) stays live and the error becomes the
    /// status message.
    pub fn load_path(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(dataset) => {
                log::info!("loaded {} records from {}", dataset.len(), path.display());
                self.set_dataset(dataset);
            }
            Err(err) => {
                log::error!("failed to load {}: {err}", path.display());
                self.status_message = Some(format!("Failed to load {}: {err}", path.display()));
            }
        }
    }
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
            review_rating: 4.0,
            season: "Winter".to_string(),
            previous_purchases: 3,
            extras: BTreeMap::new(),
        }
    }

    fn scenario_session() -> Session {
        Session::new(PurchaseDataset::from_records(vec![
            record(20, "Shoes", "Sneakers", 50.0),
            record(30, "Shoes", "Loafers", 70.0),
            record(40, "Bags", "Tote", 30.0),
            record(50, "Bags", "Clutch", 0.0),
            record(60, "Hats", "Beanie", 10.0),
        ]))
    }

    #[test]
    fn fresh_session_shows_everything() {
        let session = scenario_session();
        assert_eq!(session.views.base, vec![0, 1, 2, 3, 4]);
        assert_eq!(session.views.visible, vec![0, 1, 2, 3, 4]);
        assert!(!session.selections.interactive.any_active());
        assert!(session.charts.is_ok());
    }

    #[test]
    fn toggle_is_symmetric() {
        let mut session = scenario_session();
        session.toggle_item("Sneakers");
        assert!(session.selections.interactive.items.contains("Sneakers"));
        assert_eq!(session.views.visible, vec![0]);

        session.toggle_item("Sneakers");
        assert!(session.selections.interactive.items.is_empty());
        assert_eq!(session.views.visible, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn every_mutation_is_read_after_write_consistent() {
        let mut session = scenario_session();

        session.toggle_category("Shoes");
        assert_eq!(session.views.visible, vec![0, 1]);

        session.toggle_age_group("18-25");
        assert_eq!(session.views.visible, vec![0]);

        session.clear_age_groups();
        assert_eq!(session.views.visible, vec![0, 1]);

        session.clear_categories();
        assert_eq!(session.views.visible, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn manual_change_preserves_interactive_selections() {
        let mut session = scenario_session();
        session.toggle_item("Tote");

        let mut manual = session.selections.manual.clone();
        manual.age_range = (35, 60);
        session.set_manual_filters(manual);

        assert!(session.selections.interactive.items.contains("Tote"));
        assert_eq!(session.views.base, vec![2, 3, 4]);
        assert_eq!(session.views.visible, vec![2]);
    }

    #[test]
    fn reset_restores_the_unfiltered_view() {
        let mut session = scenario_session();

        let mut manual = session.selections.manual.clone();
        manual.categories.remove("Hats");
        manual.amount_range = (5.0, 60.0);
        session.set_manual_filters(manual);
        session.toggle_item("Sneakers");
        session.toggle_age_group("18-25");
        assert_ne!(session.views.visible.len(), 5);

        session.reset_all();
        assert!(!session.selections.interactive.any_active());
        assert_eq!(session.views.visible, vec![0, 1, 2, 3, 4]);
        assert!(session.charts.is_ok());
    }

    #[test]
    fn contradictory_selections_surface_the_empty_notice() {
        let mut session = scenario_session();
        session.toggle_category("Hats");
        session.toggle_item("Sneakers");

        assert!(session.views.visible.is_empty());
        assert_eq!(session.charts.as_ref().unwrap_err(), &EmptyFilterResult);

        // Relaxing one layer brings the charts back.
        session.clear_categories();
        assert_eq!(session.views.visible, vec![0]);
        assert!(session.charts.is_ok());
    }

    #[test]
    fn loading_a_new_dataset_discards_the_old_session() {
        let mut state = AppState::default();
        state.set_dataset(PurchaseDataset::from_records(vec![
            record(20, "Shoes", "Sneakers", 50.0),
            record(30, "Shoes", "Loafers", 70.0),
        ]));
        if let Some(session) = state.session.as_mut() {
            session.toggle_item("Sneakers");
        }

        state.set_dataset(PurchaseDataset::from_records(vec![record(
            40, "Bags", "Tote", 30.0,
        )]));
        let session = state.session.as_ref().unwrap();
        assert!(!session.selections.interactive.any_active());
        assert_eq!(session.views.visible, vec![0]);
    }

    #[test]
    fn failed_load_keeps_the_previous_session() {
        let mut state = AppState::default();
        state.set_dataset(PurchaseDataset::from_records(vec![record(
            20, "Shoes", "Sneakers", 50.0,
        )]));

        state.load_path(Path::new("definitely-not-here.csv"));
        assert!(state.session.is_some());
        assert!(state.status_message.as_deref().unwrap_or("").contains("Failed to load"));
        assert_eq!(state.session.as_ref().unwrap().dataset.len(), 1);
    }
}
