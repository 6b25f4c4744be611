use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[(self.next_u64() % values.len() as u64) as usize]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// Categories with their items and a typical price point.
const CATALOG: &[(&str, &[&str], f64)] = &[
    (
        "Clothing",
        &["Blouse", "Sweater", "Jeans", "Shirt", "Dress", "Hoodie"],
        55.0,
    ),
    ("Footwear", &["Sneakers", "Boots", "Sandals", "Loafers"], 70.0),
    (
        "Accessories",
        &["Handbag", "Scarf", "Belt", "Sunglasses", "Jewelry"],
        35.0,
    ),
    ("Outerwear", &["Jacket", "Coat", "Parka"], 95.0),
];

const GENDERS: &[&str] = &["Female", "Male"];
const SEASONS: &[&str] = &["Spring", "Summer", "Fall", "Winter"];
const LOCATIONS: &[&str] = &["California", "Montana", "New York", "Texas", "Vermont"];
const PAYMENTS: &[&str] = &["Cash", "Credit Card", "PayPal", "Venmo"];

const HEADERS: [&str; 10] = [
    "Age",
    "Gender",
    "Category",
    "Item Purchased",
    "Purchase Amount (USD)",
    "Review Rating",
    "Season",
    "Previous Purchases",
    "Location",
    "Payment Method",
];

struct Purchase {
    age: i64,
    gender: &'static str,
    category: &'static str,
    item: &'static str,
    amount: f64,
    rating: f64,
    season: &'static str,
    previous: i64,
    location: &'static str,
    payment: &'static str,
}

fn synth_purchases(n: usize, rng: &mut SimpleRng) -> Vec<Purchase> {
    (0..n)
        .map(|_| {
            let age = 18 + (rng.next_u64() % 53) as i64;
            let slot = (rng.next_u64() % CATALOG.len() as u64) as usize;
            let (category, items, base_price) = CATALOG[slot];

            // Older shoppers trend toward slightly larger baskets, so the
            // correlation heatmap has a visible signal.
            let amount = (base_price + age as f64 * 0.35 + rng.gauss(0.0, 12.0)).clamp(5.0, 250.0);
            let rating = (3.7 + rng.gauss(0.0, 0.6)).clamp(1.0, 5.0);

            Purchase {
                age,
                gender: rng.pick(GENDERS),
                category,
                item: rng.pick(items),
                amount: (amount * 100.0).round() / 100.0,
                rating: (rating * 10.0).round() / 10.0,
                season: rng.pick(SEASONS),
                previous: (rng.next_u64() % 50) as i64,
                location: rng.pick(LOCATIONS),
                payment: rng.pick(PAYMENTS),
            }
        })
        .collect()
}

fn csv_record(purchase: &Purchase, drop_rating: bool) -> Vec<String> {
    vec![
        purchase.age.to_string(),
        purchase.gender.to_string(),
        purchase.category.to_string(),
        purchase.item.to_string(),
        format!("{:.2}", purchase.amount),
        if drop_rating {
            String::new()
        } else {
            format!("{:.1}", purchase.rating)
        },
        purchase.season.to_string(),
        purchase.previous.to_string(),
        purchase.location.to_string(),
        purchase.payment.to_string(),
    ]
}

/// CSV output, deliberately a little dirty: every 40th row loses its
/// rating and every 55th row is written twice, so the loader's cleaning
/// passes have something to do.
fn write_csv(purchases: &[Purchase], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(HEADERS)?;

    for (i, purchase) in purchases.iter().enumerate() {
        let record = csv_record(purchase, i % 40 == 39);
        writer.write_record(&record)?;
        if i % 55 == 54 {
            writer.write_record(&record)?;
        }
    }
    writer.flush().context("flushing csv")?;
    Ok(())
}

fn write_parquet(purchases: &[Purchase], path: &str) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Age", DataType::Int64, false),
        Field::new("Gender", DataType::Utf8, false),
        Field::new("Category", DataType::Utf8, false),
        Field::new("Item Purchased", DataType::Utf8, false),
        Field::new("Purchase Amount (USD)", DataType::Float64, false),
        Field::new("Review Rating", DataType::Float64, false),
        Field::new("Season", DataType::Utf8, false),
        Field::new("Previous Purchases", DataType::Int64, false),
        Field::new("Location", DataType::Utf8, false),
        Field::new("Payment Method", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(
                purchases.iter().map(|p| p.age).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                purchases.iter().map(|p| p.gender).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                purchases.iter().map(|p| p.category).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                purchases.iter().map(|p| p.item).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                purchases.iter().map(|p| p.amount).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                purchases.iter().map(|p| p.rating).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                purchases.iter().map(|p| p.season).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                purchases.iter().map(|p| p.previous).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                purchases.iter().map(|p| p.location).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                purchases.iter().map(|p| p.payment).collect::<Vec<_>>(),
            )),
        ],
    )
    .context("assembling record batch")?;

    let file = File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("opening parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let purchases = synth_purchases(600, &mut rng);

    write_csv(&purchases, "shopping_trends.csv")?;
    write_parquet(&purchases, "shopping_trends.parquet")?;

    println!(
        "Wrote {} purchase records to shopping_trends.csv and shopping_trends.parquet",
        purchases.len()
    );
    Ok(())
}
