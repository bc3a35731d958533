//! Serve command - index the data tree and answer HTTP requests.

use crate::app::App;
use crate::server::BlobServer;
use cddajb_core::Config;
use std::net::SocketAddr;

/// Run the serve command.
pub fn run(config: Config, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let server = BlobServer::new(app)?;
    let bind = bind.unwrap_or_else(|| server.bind_addr());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve(bind))?;

    Ok(())
}
