//! Show command - print the blobs stored under a type and id.

use crate::app::App;
use cddajb_core::Config;
use std::time::Duration;

/// Run the show command.
pub fn run(config: Config, timeout: Duration, type_name: &str, id: &str) -> anyhow::Result<()> {
    let app = App::loaded(config, timeout)?;

    let blobs = app.store.get(type_name, id)?;
    for blob in &blobs {
        println!("// {}", blob.source);
        println!("{}", serde_json::to_string_pretty(&blob.data)?);
    }

    if let Ok(Some(types)) = app.store.types_for(id) {
        if types.len() > 1 {
            let others: Vec<_> = types.iter().filter(|t| t.as_str() != type_name).cloned().collect();
            eprintln!("Also defined as: {}", others.join(", "));
        }
    }

    if let Ok(Some(refs)) = app.store.other_for(id) {
        for (key, users) in &refs {
            let ids: Vec<_> = users.keys().cloned().collect();
            eprintln!("Referenced via {}: {}", key, ids.join(", "));
        }
    }

    Ok(())
}
