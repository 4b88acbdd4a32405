use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use brolly::prelude::*;
use brolly_http::HttpServerConfig;

pub fn execute(engine: Arc<LendingEngine<dyn LendingStore>>, bind: SocketAddr) -> Result<()> {
    println!("Serving lending pool on http://{bind}");
    brolly_http::serve(HttpServerConfig { bind }, engine)?;
    Ok(())
}
