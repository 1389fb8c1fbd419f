//! # Seed Data Generator
//!
//! Loads a fresh database with a default café: the starter menu, the
//! table registry and some bar stock linked to bar menu items.
//!
//! ## Usage
//! ```bash
//! cargo run -p cafe-db --bin seed
//! cargo run -p cafe-db --bin seed -- --db ./data/cafe.db --tables 20
//! ```

use std::env;

use chrono::Utc;
use uuid::Uuid;

use cafe_core::{InventoryItem, DEFAULT_REORDER_THRESHOLD, DEFAULT_TABLE_COUNT};
use cafe_db::repository::menu::new_menu_item;
use cafe_db::{Database, DbConfig};

/// (name, category, price in paise)
const MENU: &[(&str, &str, i64)] = &[
    ("Coffee", "Beverages", 12_000),
    ("Tea", "Beverages", 8_000),
    ("Sandwich", "Food", 15_000),
    ("Pasta", "Food", 20_000),
    ("Cake", "Desserts", 18_000),
    ("Ice Cream", "Desserts", 10_000),
];

/// (name, starting quantity, menu price in paise)
const BAR_STOCK: &[(&str, i64, i64)] = &[
    ("Beer", 48, 25_000),
    ("Wine", 24, 45_000),
    ("Soda", 60, 6_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./cafe_dev.db");
    let mut tables = DEFAULT_TABLE_COUNT;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tables" | "-t" => {
                if i + 1 < args.len() {
                    tables = args[i + 1].parse().unwrap_or(DEFAULT_TABLE_COUNT);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cafe POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./cafe_dev.db)");
                println!("  -t, --tables <N>     Number of tables (default: {DEFAULT_TABLE_COUNT})");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Cafe POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut tx = db.begin_write().await?;
    let created = db.tables().ensure_tables(&mut tx, tables).await?;
    tx.commit().await?;
    println!("✓ {} tables registered ({} new)", tables, created);

    let existing = db.menu().count().await?;
    if existing > 0 {
        println!("⚠ Menu already has {} items", existing);
        println!("  Skipping menu and stock to avoid duplicates.");
        return Ok(());
    }

    for (name, category, price) in MENU {
        db.menu()
            .insert(&new_menu_item(name, category, *price, None))
            .await?;
    }
    println!("✓ {} menu items", MENU.len());

    let now = Utc::now();
    let mut tx = db.begin_write().await?;
    let mut linked = Vec::new();
    for (name, quantity, _) in BAR_STOCK {
        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            quantity: *quantity,
            reorder_threshold: DEFAULT_REORDER_THRESHOLD,
            created_at: now,
            last_updated: now,
        };
        db.inventory().insert(&mut tx, &item).await?;
        linked.push(item.id);
    }
    tx.commit().await?;

    for ((name, _, price), item_id) in BAR_STOCK.iter().zip(linked) {
        db.menu()
            .insert(&new_menu_item(name, "Bar", *price, Some(item_id)))
            .await?;
    }
    println!("✓ {} bar items with linked stock", BAR_STOCK.len());

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
