use anyhow::Result;
use brolly::prelude::*;

pub fn execute(engine: &LendingEngine<dyn LendingStore>) -> Result<()> {
    let stats = engine.stats()?;
    println!(
        "Pool: {} items | {} available | {} borrowed ({:.1}% out)",
        stats.total, stats.available, stats.borrowed, stats.utilization
    );
    println!();

    for item in engine.items()? {
        match (&item.borrower, item.borrowed_at) {
            (Some(borrower), Some(at)) => {
                let location = item
                    .borrow_location
                    .map(|l| l.to_string())
                    .unwrap_or_default();
                println!(
                    "  #{:<3} borrowed by {borrower} at {location} since {}",
                    item.item_number,
                    at.format("%Y-%m-%d %H:%M")
                );
            }
            _ => println!("  #{:<3} available", item.item_number),
        }
    }

    Ok(())
}

pub fn activities(engine: &LendingEngine<dyn LendingStore>, limit: usize) -> Result<()> {
    let entries = engine.recent_activities(limit)?;
    if entries.is_empty() {
        println!("No recorded activity.");
        return Ok(());
    }

    for activity in entries {
        let verb = match activity.kind {
            ActivityKind::Borrow => "borrowed",
            ActivityKind::Return => "returned",
        };
        println!(
            "  {} {} item #{} at {} ({})",
            activity.actor_name,
            verb,
            activity.item_number,
            activity.location,
            activity.timestamp.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
