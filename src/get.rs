//! Engagement lookup and listing for the `ead list`, `ead show` and
//! `ead delete` commands.

use anyhow::{bail, Result};

use crate::models::EngagementRecord;
use crate::store::EngagementStore;

/// Fetch one engagement, failing when the id is unknown.
pub async fn get_engagement(store: &dyn EngagementStore, id: &str) -> Result<EngagementRecord> {
    match store.get(id).await? {
        Some(record) => Ok(record),
        None => bail!("engagement not found: {}", id),
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

pub async fn run_list(store: &dyn EngagementStore) -> Result<()> {
    let records = store.list().await?;
    if records.is_empty() {
        println!("No engagements saved yet.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<20}  {:<24}  {:<16}  ARTIFACTS",
        "ID", "CREATED", "COMPANY", "INDUSTRY"
    );
    for r in &records {
        println!(
            "{:<36}  {:<20}  {:<24}  {:<16}  {}",
            r.id,
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
            or_dash(&r.company_name),
            or_dash(&r.industry),
            if r.artifacts.is_some() { "yes" } else { "no" }
        );
    }
    Ok(())
}

pub async fn run_show(store: &dyn EngagementStore, id: &str) -> Result<()> {
    let r = get_engagement(store, id).await?;

    println!("--- Engagement ---");
    println!("id:           {}", r.id);
    println!("created_at:   {}", r.created_at.to_rfc3339());
    println!("company:      {}", or_dash(&r.company_name));
    println!("industry:     {}", or_dash(&r.industry));
    println!("timeline:     {}", or_dash(&r.timeline));
    println!("budget:       {}", or_dash(&r.budget));

    for (label, text) in [
        ("Business context", &r.business_context),
        ("Current challenges", &r.current_challenges),
        ("Strategic goals", &r.strategic_goals),
        ("Technical landscape", &r.technical_landscape),
        ("Constraints", &r.constraints),
    ] {
        if !text.trim().is_empty() {
            println!();
            println!("--- {} ---", label);
            println!("{}", text);
        }
    }

    println!();
    match &r.artifacts {
        Some(artifacts) => {
            let phases = artifacts.strategic_roadmap.as_deref().unwrap_or_default();
            let items = artifacts.prioritization_matrix.as_deref().unwrap_or_default();
            println!(
                "artifacts:    {} initiatives, {} roadmap phases",
                items.len(),
                phases.len()
            );
        }
        None => println!("artifacts:    (not generated)"),
    }
    Ok(())
}

pub async fn run_delete(store: &dyn EngagementStore, id: &str) -> Result<()> {
    if !store.delete(id).await? {
        bail!("engagement not found: {}", id);
    }
    println!("Engagement deleted: {}", id);
    Ok(())
}
