//! Hyperlink decoration for pretty-printed blobs.
//!
//! Every quoted string that ends a line of the pretty JSON is looked up in
//! the snapshot. Known ids get a `types` span linking to each type the id
//! appears under, and referenced values get an `other` span linking to each
//! cross-reference key. The spans are inserted right after every occurrence
//! of the quoted value.

use cddajb_core::Snapshot;
use regex::{Captures, Regex};
use std::collections::HashMap;
use tracing::warn;

pub struct AutoLinker {
    line_end: Regex,
}

impl AutoLinker {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(AutoLinker {
            line_end: Regex::new(r#"(?m)"(\S+)",?$"#)?,
        })
    }

    /// Decorate `text` with links for every value known to `snapshot`.
    pub fn decorate(&self, text: &str, snapshot: &Snapshot) -> String {
        let mut order: Vec<&str> = Vec::new();
        let mut links: HashMap<&str, String> = HashMap::new();

        for caps in self.line_end.captures_iter(text) {
            let Some(raw) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if links.contains_key(raw) {
                continue;
            }
            if let Some(spans) = link_spans(raw, snapshot) {
                order.push(raw);
                links.insert(raw, spans);
            }
        }

        if order.is_empty() {
            return text.to_string();
        }

        // One pass over the text, so inserted markup is never rescanned.
        let alternation = order
            .iter()
            .map(|raw| regex::escape(raw))
            .collect::<Vec<_>>()
            .join("|");
        let quoted = match Regex::new(&format!("\"({alternation})\"")) {
            Ok(re) => re,
            Err(e) => {
                warn!(error = %e, "Skipping link decoration");
                return text.to_string();
            }
        };

        quoted
            .replace_all(text, |caps: &Captures| {
                let raw = &caps[1];
                match links.get(raw) {
                    Some(spans) => format!("\"{raw}\" {spans}"),
                    None => format!("\"{raw}\""),
                }
            })
            .into_owned()
    }
}

/// Link markup for one quoted value, or `None` if the value is unknown.
fn link_spans(raw: &str, snapshot: &Snapshot) -> Option<String> {
    // The capture is still JSON-escaped.
    let value: String = serde_json::from_str(&format!("\"{raw}\"")).ok()?;
    let mut out = String::new();

    if let Some(types) = snapshot.types_for(&value) {
        let links = types
            .iter()
            .map(|t| format!("<a onclick=\"show('{t}', '{raw}')\">{t}</a>"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("<span class=\"types\">{links}</span>"));
    }

    if let Some(refs) = snapshot.other_for(&value) {
        let links = refs
            .keys()
            .map(|key| format!("<a onclick=\"list('{key}', '{raw}')\">{key}</a>"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("<span class=\"other\">{links}</span>"));
    }

    (!out.is_empty()).then_some(out)
}
