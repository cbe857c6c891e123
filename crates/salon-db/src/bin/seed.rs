//! # Seed Data Generator
//!
//! Populates a ledger database with demo promotions for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./salon_dev.db for branch-main
//! cargo run -p salon-db --bin seed
//!
//! # Specify database path and branch
//! cargo run -p salon-db --bin seed -- --db ./data/salon.db --branch branch-north
//! ```
//!
//! ## Generated Promotions
//! - `WELCOME10`: 10% off everything, one use per client
//! - `COLOR500`: 500.00 off colour services
//! - `PRODUCTS15`: 15% off retail products, 50 uses
//! - `SPA20`: 20% off two named spa services
//! - `SUMMER100`: 100.00 off, ended last month (for expiry testing)

use std::env;

use chrono::{DateTime, Duration, Utc};
use salon_core::validation::validate_promotion;
use salon_core::{ApplicableTo, DiscountTerms, Money, Percent, Promotion, UsageType};
use salon_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

struct DemoPromotion {
    code: &'static str,
    title: &'static str,
    terms: fn() -> DiscountTerms,
    usage_type: UsageType,
    max_uses: Option<u32>,
    /// Window relative to now, in days.
    window: (i64, i64),
}

const DEMO_PROMOTIONS: &[DemoPromotion] = &[
    DemoPromotion {
        code: "WELCOME10",
        title: "Welcome 10% off",
        terms: || DiscountTerms::percentage(Percent::from_whole(10), ApplicableTo::All),
        usage_type: UsageType::OneTime,
        max_uses: None,
        window: (-30, 335),
    },
    DemoPromotion {
        code: "COLOR500",
        title: "500 off colour services",
        terms: || DiscountTerms::fixed(Money::from_cents(50_000), ApplicableTo::Services),
        usage_type: UsageType::Repeating,
        max_uses: None,
        window: (-7, 60),
    },
    DemoPromotion {
        code: "PRODUCTS15",
        title: "15% off retail",
        terms: || DiscountTerms::percentage(Percent::from_whole(15), ApplicableTo::Products),
        usage_type: UsageType::Repeating,
        max_uses: Some(50),
        window: (-1, 30),
    },
    DemoPromotion {
        code: "SPA20",
        title: "20% off spa treatments",
        terms: || {
            DiscountTerms::percentage(Percent::from_whole(20), ApplicableTo::All).restricted_to(
                vec!["svc-massage".to_string(), "svc-facial".to_string()],
                vec![],
            )
        },
        usage_type: UsageType::Repeating,
        max_uses: Some(100),
        window: (0, 90),
    },
    DemoPromotion {
        code: "SUMMER100",
        title: "Summer 100 off",
        terms: || DiscountTerms::fixed(Money::from_cents(10_000), ApplicableTo::All),
        usage_type: UsageType::Repeating,
        max_uses: None,
        window: (-120, -30),
    },
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,salon=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./salon_dev.db");
    let mut branch_id = String::from("branch-main");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--branch" | "-b" => {
                if i + 1 < args.len() {
                    branch_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Salon Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./salon_dev.db)");
                println!("  -b, --branch <ID>     Branch to create promotions for (default: branch-main)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path, branch = %branch_id, "Seeding demo promotions");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.promotions().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has promotions; skipping seed (delete the file to regenerate)");
        return Ok(());
    }

    let now = Utc::now();
    let mut generated = 0;
    for demo in DEMO_PROMOTIONS {
        let promotion = build_promotion(demo, &branch_id, now);

        if let Err(e) = validate_promotion(&promotion) {
            warn!(code = demo.code, error = %e, "Skipping invalid demo promotion");
            continue;
        }
        if let Err(e) = db.promotions().insert(&promotion).await {
            warn!(code = demo.code, error = %e, "Failed to insert promotion");
            continue;
        }

        info!(code = demo.code, id = %promotion.id, "Created promotion");
        generated += 1;
    }

    info!(generated, "Seed complete");
    db.close().await;
    Ok(())
}

fn build_promotion(demo: &DemoPromotion, branch_id: &str, now: DateTime<Utc>) -> Promotion {
    let (starts, ends) = demo.window;

    Promotion {
        id: Uuid::new_v4().to_string(),
        branch_id: branch_id.to_string(),
        promotion_code: demo.code.to_string(),
        title: demo.title.to_string(),
        description: None,
        terms: (demo.terms)(),
        usage_type: demo.usage_type,
        used_by: Default::default(),
        max_uses: demo.max_uses,
        usage_count: 0,
        start_date: now + Duration::days(starts),
        end_date: now + Duration::days(ends),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
