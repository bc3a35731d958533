//! Search command - find ids by regular expression.

use crate::app::App;
use crate::OutputFormat;
use cddajb_core::{Config, SearchQuery};
use std::time::{Duration, Instant};

/// Run the search command.
pub fn run(
    config: Config,
    timeout: Duration,
    pattern: &str,
    literal: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let app = App::loaded(config, timeout)?;

    let query = if literal {
        SearchQuery::literal(pattern)?
    } else {
        SearchQuery::regex(pattern)?
    };

    let start = Instant::now();
    let snapshot = app.store.snapshot()?;
    let hits = query.run(&snapshot);
    let elapsed = start.elapsed();

    match output {
        OutputFormat::Text => {
            for hit in &hits {
                println!("{} [{}]", hit.id, hit.types.join(", "));
            }

            eprintln!();
            eprintln!(
                "{} ids matched in {:.2}ms",
                hits.len(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
    }

    Ok(())
}
