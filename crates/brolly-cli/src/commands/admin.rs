use anyhow::Result;
use brolly::prelude::*;

pub fn init(engine: &LendingEngine<dyn LendingStore>) -> Result<()> {
    engine.initialize()?;
    println!(
        "Initialized pool with {} items, all available.",
        engine.config().pool_size
    );
    Ok(())
}

pub fn reset(engine: &LendingEngine<dyn LendingStore>) -> Result<()> {
    engine.reset()?;
    println!("Pool reset: items recreated, activity log cleared.");
    Ok(())
}
