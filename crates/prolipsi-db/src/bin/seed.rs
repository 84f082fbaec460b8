//! # Seed Data Generator
//!
//! Populates a development database with a demo transport operator,
//! a handful of monthly invoices and a few customer wallets.
//!
//! ## Usage
//! ```bash
//! cargo run -p prolipsi-db --bin seed
//!
//! # Specify database path
//! cargo run -p prolipsi-db --bin seed -- --db ./data/prolipsi.db
//! ```
//!
//! ## Generated Data
//! - Operator `op-demo` with a percentage fee policy (2% multa, 1% a.m.)
//! - One pending invoice per student, due days spread over the month
//! - Wallets `cli-demo-1..3` with R$ 10, R$ 50 and R$ 150 of credit

use std::env;

use anyhow::Context;
use chrono::Utc;
use prolipsi_core::late_fee::{FeeMode, FeePolicySettings};
use prolipsi_core::{InvoiceStatus, MonthlyInvoice, Money};
use prolipsi_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEMO_OPERATOR: &str = "op-demo";

/// (student, monthly amount in centavos, due day)
const STUDENTS: &[(&str, i64, i64)] = &[
    ("Ana Beatriz Souza", 32_000, 5),
    ("Pedro Henrique Lima", 35_000, 10),
    ("Luiza Fernandes", 28_000, 10),
    ("Gabriel Rocha", 41_000, 15),
    ("Maria Eduarda Alves", 30_000, 20),
    ("João Pedro Martins", 38_500, 31),
];

const WALLETS: &[(&str, i64)] = &[
    ("cli-demo-1", 1_000),
    ("cli-demo-2", 5_000),
    ("cli-demo-3", 15_000),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./prolipsi_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("RS Prólipsi Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./prolipsi_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db_path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("failed to open {db_path}"))?;

    let existing = db.invoices().list_by_owner(DEMO_OPERATOR, None).await?;
    if !existing.is_empty() {
        warn!(
            invoices = existing.len(),
            "Demo operator already seeded; delete the database file to regenerate"
        );
        return Ok(());
    }

    let policy = FeePolicySettings {
        mode: FeeMode::Percentage,
        multa_bps: 200,
        monthly_interest_bps: 100,
        ..FeePolicySettings::default()
    };
    db.fee_policies().upsert(DEMO_OPERATOR, &policy).await?;
    info!(owner_id = DEMO_OPERATOR, "Fee policy saved");

    let now = Utc::now();
    for (name, amount_cents, due_day) in STUDENTS {
        let invoice = MonthlyInvoice {
            id: Uuid::new_v4().to_string(),
            owner_id: DEMO_OPERATOR.to_string(),
            student_name: (*name).to_string(),
            payer_email: None,
            payer_cpf: None,
            amount_cents: *amount_cents,
            due_day: Some(*due_day),
            due_date: None,
            status: InvoiceStatus::Pending,
            pix_payment_id: None,
            pix_qr_code: None,
            pix_qr_code_base64: None,
            charged_amount_cents: None,
            paid_on: None,
            created_at: now,
        };
        db.invoices()
            .insert(&invoice)
            .await
            .with_context(|| format!("failed to insert invoice for {name}"))?;
    }
    info!(count = STUDENTS.len(), "Invoices created");

    for (owner_id, cents) in WALLETS {
        let balance = db.wallets().credit(owner_id, Money::from_cents(*cents)).await?;
        info!(owner_id = %owner_id, balance = %balance, "Wallet credited");
    }

    db.close().await;
    info!("Seed complete");
    Ok(())
}
