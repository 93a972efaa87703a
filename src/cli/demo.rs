//! Orders/customers sample data

use crate::error::Result;
use crate::storage::{ColumnDef, MemoryStore};
use crate::value::{ColumnType, Value};
use chrono::NaiveDate;
use rand::prelude::*;

const NAMES: &[&str] = &[
    "Cyd", "Dee", "Eli", "Fay", "Gus", "Hal", "Ivy", "Jo", "Kai", "Lu", "Mo", "Ned",
];

const CITIES: &[&str] = &["Oslo", "Lima", "Pune", "Kyiv", "Nice"];

/// Generator for the demo `customers` and `orders` tables
///
/// The first rows are fixed: orders 5 and 6 belong to customers 7 (Ann) and
/// 8 (Bo). Further customers get random cities, and each gets up to four
/// orders, some with a NULL amount.
pub struct DemoGenerator {
    customers: usize,
    rng: StdRng,
}

impl DemoGenerator {
    /// `customers` extra customers beyond the fixed ones
    pub fn new(customers: usize) -> Self {
        Self::with_seed(customers, 42)
    }

    pub fn with_seed(customers: usize, seed: u64) -> Self {
        Self {
            customers,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create both tables in `store` and fill them
    pub fn generate(&mut self, store: &mut MemoryStore) -> Result<()> {
        store.create_table(
            "customers",
            vec![
                ColumnDef::new("id", ColumnType::Integer).unique(),
                ColumnDef::new("name", ColumnType::Text),
                ColumnDef::new("city", ColumnType::Text),
                ColumnDef::new("active", ColumnType::Boolean),
            ],
        )?;
        store.create_table(
            "orders",
            vec![
                ColumnDef::new("id", ColumnType::Integer).unique(),
                ColumnDef::new("cust_id", ColumnType::Integer),
                ColumnDef::new("amount", ColumnType::Float),
                ColumnDef::new("placed", ColumnType::Date),
            ],
        )?;

        let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        store.insert_values(
            "customers",
            vec![Some(7.into()), Some("Ann".into()), Some("Oslo".into()), Some(true.into())],
        )?;
        store.insert_values(
            "customers",
            vec![Some(8.into()), Some("Bo".into()), None, Some(false.into())],
        )?;
        store.insert_values(
            "orders",
            vec![Some(5.into()), Some(7.into()), Some(12.5.into()), Some(epoch.into())],
        )?;
        store.insert_values(
            "orders",
            vec![Some(6.into()), Some(8.into()), None, Some(epoch.into())],
        )?;

        let mut order_id = 100i64;
        for i in 0..self.customers {
            let id = 1_000 + i as i64;
            let name = format!("{}{}", NAMES[i % NAMES.len()], i);
            let city = CITIES.choose(&mut self.rng).map(|c| Value::from(*c));
            let active = self.rng.gen_bool(0.7);
            store.insert_values(
                "customers",
                vec![Some(id.into()), Some(name.into()), city, Some(active.into())],
            )?;

            for _ in 0..self.rng.gen_range(0..=4) {
                let amount = if self.rng.gen_bool(0.1) {
                    None
                } else {
                    Some(Value::from((self.rng.gen_range(100..100_000) as f64) / 100.0))
                };
                let placed = epoch + chrono::Duration::days(self.rng.gen_range(0..365));
                store.insert_values(
                    "orders",
                    vec![Some(order_id.into()), Some(id.into()), amount, Some(placed.into())],
                )?;
                order_id += 1;
            }
        }
        Ok(())
    }
}
