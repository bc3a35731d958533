//! Status command - rebuild once and print the rebuild report.

use crate::app::App;
use cddajb_core::{Config, VERSION};
use std::time::Duration;

/// Run the status command.
pub fn run(config: Config, timeout: Duration) -> anyhow::Result<()> {
    let app = App::new(config)?;
    let outcome = app.rebuild_blocking(None, timeout);

    println!("cddajb {}", VERSION);
    println!("===========");
    println!();
    println!("Data root: {}", app.store.root().display());
    println!("Sources:   {}", display_list(&app.config.data.sources));
    println!("Id keys:   {}", app.store.id_keys().join(", "));
    println!("Other keys: {}", display_list(app.store.other_keys()));
    println!();

    for report in app.store.logs() {
        println!("{}", report);
    }

    let summary = outcome?;
    println!(
        "Rebuilt in {:.2}s, {} file(s) failed, {} blob(s) without type, {} without id",
        summary.elapsed.as_secs_f64(),
        summary.failed_files,
        summary.skipped_no_type,
        summary.skipped_no_id
    );

    Ok(())
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
