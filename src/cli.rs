//! Minimal CLI: compress a schema → (schema + field map), expand responses → original names
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use schema_squash::{compress_document, expand_json, FieldMap, SchemaDocument};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// shorten field names in structured-output schemas and restore them in model responses
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compress a schema document; emits the compressed schema and its field map
    Compress(CompressOut),
    /// expand compressed model responses back to the original field names
    Expand(ExpandOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON); output is NDJSON too
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /choices/0/message/parsed)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CompressOut {
    /// schema document: an object schema with `properties`, `required` and `$defs`
    #[arg(long, short)]
    input: PathBuf,

    /// compressed schema .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// field map .json file; when omitted, schema and field map are written
    /// together as `{"schema": .., "field_map": ..}`
    #[arg(long)]
    field_map: Option<PathBuf>,

    /// print key-length savings to stderr
    #[arg(long)]
    stats: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct ExpandOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// field map produced by `compress`
    #[arg(long)]
    field_map: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Value>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            let documents = if self.ndjson {
                source.lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(i, line)| {
                        serde_json::from_str::<Value>(line)
                            .with_context(|| format!("failed to parse line {} of {source_path_str}", i + 1))
                    })
                    .collect::<Result<Vec<_>>>()?
            } else {
                vec![
                    serde_json::from_str::<Value>(&source)
                        .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?,
                ]
            };
            for document in documents {
                self.select(document, &source_path_str, &mut out)?;
            }
        }
        Ok(out)
    }

    fn select(&self, document: Value, source_path_str: &str, out: &mut Vec<Value>) -> Result<()> {
        let document = match self.json_pointer.as_ref() {
            None => document,
            Some(pointer) => match document.pointer(pointer) {
                Some(x) => x.clone(),
                None => {
                    tracing::warn!(source = %source_path_str, pointer = %pointer, "JSON pointer matched nothing, skipping");
                    return Ok(());
                }
            },
        };
        match self.jq_expr.as_ref() {
            None => out.push(document),
            Some(jq_expr) => {
                let results = schema_squash::jq_exec::run_filter(jq_expr, &document).with_context(|| {
                    format!("failed to apply jq expression to source file ({source_path_str})")
                })?;
                out.extend(results);
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Compress(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                // 1) load
                let source = std::fs::read_to_string(&target.input)
                    .with_context(|| format!("failed to read schema ({})", target.input.display()))?;
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse schema ({})", target.input.display()))?;
                let document = SchemaDocument::from_json(&value)?;

                // 2) compress
                let compressed = compress_document(&document);
                let schema = compressed.to_json_schema();
                let field_map = compressed.field_map.to_json();

                if target.stats {
                    let stats = compressed.stats();
                    eprintln!(
                        "{} {} fields, {} → {} key chars ({} saved, {:.0}% of original)",
                        "stats".green().bold(),
                        stats.fields,
                        stats.original_key_chars,
                        stats.compressed_key_chars,
                        stats.saved().to_string().bold(),
                        stats.ratio() * 100.0,
                    );
                }

                // 3) write
                match target.field_map.as_ref() {
                    Some(field_map_path) => {
                        write_output(Some(field_map_path.as_path()), &serde_json::to_string_pretty(&field_map)?)?;
                        write_output(target.out.as_deref(), &serde_json::to_string_pretty(&schema)?)?;
                    }
                    None => {
                        let bundle = serde_json::json!({ "schema": schema, "field_map": field_map });
                        write_output(target.out.as_deref(), &serde_json::to_string_pretty(&bundle)?)?;
                    }
                }
                Ok(())
            }
            Command::Expand(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                // 1) load
                let field_map_src = std::fs::read_to_string(&target.field_map)
                    .with_context(|| format!("failed to read field map ({})", target.field_map.display()))?;
                let field_map = schema_squash::path_de::from_str_with_path::<FieldMap>(&field_map_src)
                    .with_context(|| format!("invalid field map ({})", target.field_map.display()))?;
                let documents = target.input_settings.load_documents()?;
                tracing::info!(documents = documents.len(), "expanding");

                // 2) expand; every document is independent
                let expanded = documents
                    .par_iter()
                    .map(|doc| expand_json(doc, &field_map))
                    .collect::<Result<Vec<_>, _>>()?;

                // 3) write
                let text = if target.input_settings.ndjson {
                    let mut lines = expanded.iter()
                        .map(serde_json::to_string)
                        .collect::<Result<Vec<_>, _>>()?
                        .join("\n");
                    lines.push('\n');
                    lines
                } else if expanded.len() == 1 {
                    serde_json::to_string_pretty(&expanded[0])?
                } else {
                    serde_json::to_string_pretty(&expanded)?
                };
                write_output(target.out.as_deref(), &text)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
