pub mod admin;
pub mod serve;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use brolly::prelude::*;
use brolly::RelationalConfig;

/// Build an engine over the selected backend.
pub fn open_engine(
    db_path: &Path,
    memory: bool,
    pool_size: u32,
) -> Result<Arc<LendingEngine<dyn LendingStore>>> {
    let config = PoolConfig {
        pool_size,
        ..PoolConfig::default()
    };

    let store: Arc<dyn LendingStore> = if memory {
        Arc::new(RealtimeStore::new(config.clone()))
    } else {
        Arc::new(RelationalStore::open(
            &RelationalConfig::new(db_path),
            config.clone(),
        )?)
    };

    Ok(Arc::new(LendingEngine::new(store, config)))
}
