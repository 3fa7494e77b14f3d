use crate::output::print_json;
use anyhow::Context;
use reqflow_core::repair::{self, Strategy};
use reqflow_core::types::{Requirement, TestCase};
use std::path::Path;

/// What the recovered array should hold.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ItemKind {
    Requirements,
    TestCases,
}

/// Run the repair chain over a saved raw response and print the result.
///
/// With `--as`, the items are also checked and normalized the way the
/// pipeline would before filing them.
pub fn run(file: &Path, kind: Option<ItemKind>, json: bool) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let recovered = repair::recover_json(&raw)?;
    let strategy = match recovered.strategy {
        Strategy::Direct => "direct",
        Strategy::Repaired => "repaired",
    };

    let value = match kind {
        None => recovered.value,
        Some(ItemKind::Requirements) => {
            serde_json::to_value(repair::parse_items::<Requirement>(&raw)?)?
        }
        Some(ItemKind::TestCases) => serde_json::to_value(repair::parse_items::<TestCase>(&raw)?)?,
    };

    if json {
        print_json(&serde_json::json!({ "strategy": strategy, "value": value }))?;
    } else {
        eprintln!("parsed ({strategy})");
        print_json(&value)?;
    }
    Ok(())
}
