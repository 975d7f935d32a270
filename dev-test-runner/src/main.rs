//! Fixture runner: every `fixtures/<case>/` holds `schema.json`, a model
//! `response.json` written against the compressed schema, and the
//! `expected.json` it must expand to. An optional `field_map.json` pins the
//! exact field map.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::Value;

use schema_squash::{compress_document, expand_json, SchemaDocument};

fn read_json(path: &Path) -> Result<Value> {
    let src = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&src);
    serde_path_to_error::deserialize(de)
        .map_err(|err| anyhow::anyhow!("{} at JSON path {} → {}", path.display(), err.path(), err.inner()))
}

fn run_case(dir: &Path) -> Result<Vec<String>> {
    let schema = read_json(&dir.join("schema.json"))?;
    let document = SchemaDocument::from_json(&schema)?;
    let compressed = compress_document(&document);

    let mut failures = Vec::new();

    let pinned = dir.join("field_map.json");
    if pinned.exists() {
        let expected = read_json(&pinned)?;
        let actual = compressed.field_map.to_json();
        if actual != expected {
            failures.push(format!(
                "field map differs\n  expected: {expected}\n  actual:   {actual}"
            ));
        }
    }

    let response = read_json(&dir.join("response.json"))?;
    let expected = read_json(&dir.join("expected.json"))?;
    let actual = expand_json(&response, &compressed.field_map)?;
    if actual != expected {
        failures.push(format!(
            "expansion differs\n  expected: {expected}\n  actual:   {actual}"
        ));
    }
    Ok(failures)
}

fn main() -> Result<()> {
    let root = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("fixtures"));
    let mut cases = std::fs::read_dir(&root)
        .with_context(|| format!("failed to list {}", root.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect::<Vec<_>>();
    cases.sort();

    let mut failed = 0usize;
    for case in &cases {
        let name = case.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        match run_case(case) {
            Ok(failures) if failures.is_empty() => eprintln!("{} {name}", "✅ pass".green()),
            Ok(failures) => {
                failed += 1;
                eprintln!("{} {name}", "❌ fail".red());
                for failure in failures {
                    eprintln!("    {failure}");
                }
            }
            Err(error) => {
                failed += 1;
                eprintln!("{} {name}: {error:#}", "❌ error".red());
            }
        }
    }

    eprintln!("{} of {} fixtures passed", cases.len() - failed, cases.len());
    if failed > 0 {
        bail!("{failed} fixture(s) failed");
    }
    Ok(())
}
