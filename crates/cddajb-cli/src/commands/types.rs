//! Types command - list every blob type.

use crate::app::App;
use cddajb_core::Config;
use std::time::Duration;

/// Run the types command.
pub fn run(config: Config, timeout: Duration) -> anyhow::Result<()> {
    let app = App::loaded(config, timeout)?;

    for type_name in app.store.types() {
        println!("{}", type_name);
    }

    Ok(())
}
