//! Utility to list the most recently created leads.
//!
//! Usage: `list_leads [LIMIT]` (defaults to 20).

use dotenvy::dotenv;
use std::env;

use heatos_lead_api::db::Database;
use heatos_lead_api::db_storage::{LeadStore, PgLeadStore, DEFAULT_LIST_LIMIT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let limit: i64 = match env::args().nth(1) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("LIMIT must be a number, got '{}'", raw))?,
        None => 20,
    };
    let limit = limit.clamp(1, DEFAULT_LIST_LIMIT);

    let db = Database::connect(&database_url).await?;
    let store = PgLeadStore::new(db.pool.clone());
    tracing::info!("Connected to database. Listing up to {} leads...", limit);

    let leads = store
        .list_recent(limit)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    println!("Found {} lead(s):", leads.len());
    for entry in &leads {
        let identity = entry.lead.identity();
        println!(
            "- {} [{}] {} / {} (created {}, updated {})",
            entry.id,
            entry.stage(),
            identity.email,
            identity.phone,
            entry.created_at.to_rfc3339(),
            entry.updated_at.to_rfc3339()
        );
    }

    Ok(())
}
