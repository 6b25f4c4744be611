use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Schema: fixed column headers of the purchase table
// ---------------------------------------------------------------------------

pub const COL_AGE: &str = "Age";
pub const COL_GENDER: &str = "Gender";
pub const COL_CATEGORY: &str = "Category";
pub const COL_ITEM: &str = "Item Purchased";
pub const COL_SEASON: &str = "Season";
pub const COL_AMOUNT: &str = "Purchase Amount (USD)";
pub const COL_RATING: &str = "Review Rating";
pub const COL_PREVIOUS: &str = "Previous Purchases";

/// Columns every usable row must provide. Anything else in the source is
/// carried through as an extra, untouched.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    COL_AGE,
    COL_GENDER,
    COL_CATEGORY,
    COL_ITEM,
    COL_SEASON,
    COL_AMOUNT,
    COL_RATING,
    COL_PREVIOUS,
];

// ---------------------------------------------------------------------------
// CellValue – one raw cell as read from the source
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell, before (or outside of) schema coercion.
/// CSV cells arrive as guessed scalars, JSON and Parquet as their own types.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Hash so whole raw rows can be deduplicated --

impl Eq for CellValue {}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl CellValue {
    /// Numeric reading used by the loader's coercion pass. Parses numeric
    /// strings the way `to_numeric` would. Non-finite readings count as
    /// missing: `"NaN"` parses as a float but is not a usable number.
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            CellValue::Float(v) => *v,
            CellValue::Integer(i) => *i as f64,
            CellValue::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Integral reading for count-like columns (age, previous purchases).
    /// A float with a fractional part is rejected rather than truncated.
    pub fn to_i64(&self) -> Option<i64> {
        match self.to_f64() {
            Some(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
            _ => None,
        }
    }

    /// Owned string reading for the categorical columns. Non-string scalars
    /// are rendered as text rather than rejected.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::String(s) => Some(s.clone()),
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Float(v) => Some(v.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Null => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Age-group buckets
// ---------------------------------------------------------------------------

/// Right-closed bucket edges: (0,25], (25,35], … (65,100].
const AGE_EDGES: [i64; 7] = [0, 25, 35, 45, 55, 65, 100];

/// Bucket labels, index-aligned with the intervals over [`AGE_EDGES`].
pub const AGE_GROUPS: [&str; 6] = ["18-25", "26-35", "36-45", "46-55", "56-65", "65+"];

/// Derive the age-group label for an age. Ages at or below 0, or above 100,
/// fall outside every bucket.
pub fn age_group(age: i64) -> Option<&'static str> {
    AGE_EDGES
        .windows(2)
        .zip(AGE_GROUPS.iter())
        .find(|(edge, _)| age > edge[0] && age <= edge[1])
        .map(|(_, label)| *label)
}

// ---------------------------------------------------------------------------
// PurchaseRecord – one cleaned row of the source table
// ---------------------------------------------------------------------------

/// A single purchase event (one cleaned row).
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub age: i64,
    pub gender: String,
    pub category: String,
    pub item: String,
    pub purchase_amount: f64,
    pub review_rating: f64,
    pub season: String,
    pub previous_purchases: i64,
    /// Columns outside the fixed schema, carried through unused.
    pub extras: BTreeMap<String, CellValue>,
}

impl PurchaseRecord {
    /// The record's age-group bucket, if its age falls in one.
    pub fn age_group(&self) -> Option<&'static str> {
        age_group(self.age)
    }
}

// ---------------------------------------------------------------------------
// PurchaseDataset – the complete cleaned dataset
// ---------------------------------------------------------------------------

/// The cleaned dataset with pre-computed filter domains. Immutable after
/// load; every downstream view is a fresh index vector into `records`.
#[derive(Debug, Clone)]
pub struct PurchaseDataset {
    /// All records, in source order.
    pub records: Vec<PurchaseRecord>,
    /// Sorted unique values backing the gender multiselect.
    pub genders: BTreeSet<String>,
    /// Sorted unique values backing the season multiselect.
    pub seasons: BTreeSet<String>,
    /// Sorted unique values backing both category filters.
    pub categories: BTreeSet<String>,
    /// Observed (min, max) age, inclusive; slider bounds and range default.
    pub age_span: (i64, i64),
    /// Observed (min, max) purchase amount, inclusive.
    pub amount_span: (f64, f64),
}

impl PurchaseDataset {
    /// Build the domain indices from cleaned records.
    pub fn from_records(records: Vec<PurchaseRecord>) -> Self {
        let mut genders = BTreeSet::new();
        let mut seasons = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut age_span: Option<(i64, i64)> = None;
        let mut amount_span: Option<(f64, f64)> = None;

        for rec in &records {
            genders.insert(rec.gender.clone());
            seasons.insert(rec.season.clone());
            categories.insert(rec.category.clone());
            age_span = Some(match age_span {
                Some((lo, hi)) => (lo.min(rec.age), hi.max(rec.age)),
                None => (rec.age, rec.age),
            });
            amount_span = Some(match amount_span {
                Some((lo, hi)) => (lo.min(rec.purchase_amount), hi.max(rec.purchase_amount)),
                None => (rec.purchase_amount, rec.purchase_amount),
            });
        }

        PurchaseDataset {
            records,
            genders,
            seasons,
            categories,
            age_span: age_span.unwrap_or((0, 0)),
            amount_span: amount_span.unwrap_or((0.0, 0.0)),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
