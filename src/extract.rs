//! Building records from recognized screenshot text
//!
//! The recognizer writes one text dump per screenshot. A dump holds one or
//! more building blocks:
//!
//! ```text
//! Building: Steel Mill
//! Inputs:
//!   - Iron Ore x 4
//!   - 1 x Coal
//! Outputs:
//!   Steel: 1
//! ```
//!
//! Lines that cannot be read are skipped and counted rather than failing the
//! whole dump, since recognition noise is common.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{info, warn};
use regex::Regex;
use rusqlite::Connection;
use walkdir::WalkDir;

use crate::db;
use crate::models::{Building, ResourceAmount};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Inputs,
    Outputs,
}

/// Buildings read from one dump
#[derive(Debug, Default)]
pub struct ParsedDump {
    pub buildings: Vec<Building>,
    pub skipped_lines: usize,
}

struct Patterns {
    header: Regex,
    banner: Regex,
    section: Regex,
    quantity_first: Regex,
    name_first: Regex,
}

impl Patterns {
    fn compile() -> Result<Self> {
        Ok(Self {
            // Building: Steel Mill
            header: Regex::new(r"(?i)^building\s*:\s*(.+)$")?,
            // == Steel Mill ==
            banner: Regex::new(r"^=+\s*(.+?)\s*=+$")?,
            // Inputs: / Consumes: / Outputs: / Produces:
            section: Regex::new(r"(?i)^(inputs?|consumes|outputs?|produces)\s*:?$")?,
            // 4 x Iron Ore
            quantity_first: Regex::new(r"^(?:[-*•]\s*)?(\d[\d.,]*)\s*[x×]\s+(.+)$")?,
            // Iron Ore x 4 / Iron Ore: 4
            name_first: Regex::new(r"^(?:[-*•]\s*)?(.+?)(?:\s+[x×]\s*|\s*:\s*)(\d[\d.,]*)$")?,
        })
    }

    fn item(&self, line: &str) -> Option<(String, String)> {
        if let Some(cap) = self.quantity_first.captures(line) {
            return Some((cap[2].trim().to_string(), cap[1].to_string()));
        }
        self.name_first
            .captures(line)
            .map(|cap| (cap[1].trim().to_string(), cap[2].to_string()))
    }
}

/// Thousands separators are dropped; anything else unparseable is rejected
fn parse_quantity(raw: &str) -> Option<f64> {
    let quantity: f64 = raw.replace(',', "").parse().ok()?;
    (quantity > 0.0 && quantity.is_finite()).then_some(quantity)
}

/// Parse every building block in a text dump
pub fn parse_buildings(text: &str) -> Result<ParsedDump> {
    let patterns = Patterns::compile()?;
    let mut dump = ParsedDump::default();
    let mut current: Option<Building> = None;
    let mut section: Option<Section> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let header = patterns
            .header
            .captures(line)
            .or_else(|| patterns.banner.captures(line));
        if let Some(cap) = header {
            if let Some(done) = current.take() {
                dump.buildings.push(done);
            }
            current = Some(Building::new(cap[1].trim()));
            section = None;
            continue;
        }

        if let Some(cap) = patterns.section.captures(line) {
            let word = cap[1].to_lowercase();
            section = if word.starts_with("input") || word == "consumes" {
                Some(Section::Inputs)
            } else {
                Some(Section::Outputs)
            };
            continue;
        }

        let parsed = patterns
            .item(line)
            .and_then(|(name, raw)| parse_quantity(&raw).map(|q| ResourceAmount::new(name, q)));

        match (current.as_mut(), section, parsed) {
            (Some(building), Some(Section::Inputs), Some(amount)) => building.inputs.push(amount),
            (Some(building), Some(Section::Outputs), Some(amount)) => building.outputs.push(amount),
            _ => dump.skipped_lines += 1,
        }
    }

    if let Some(done) = current {
        dump.buildings.push(done);
    }

    Ok(dump)
}

/// Find all text dumps under a directory, or the file itself
pub fn find_dump_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("No such file or directory: {}", path.display());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut dumps = Vec::new();

    for entry in WalkDir::new(path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            dumps.push(path.to_path_buf());
        }
    }

    Ok(dumps)
}

/// Read all dumps under `path` and store their buildings
pub fn extract_to_database(conn: &Connection, path: &Path) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();

    let dump_files = find_dump_files(path)?;
    info!("Found {} text dump(s) under {}", dump_files.len(), path.display());

    for filepath in &dump_files {
        let parsed = fs::read_to_string(filepath)
            .with_context(|| format!("Failed to read {}", filepath.display()))
            .and_then(|text| parse_buildings(&text));

        match parsed {
            Ok(dump) => {
                for building in &dump.buildings {
                    db::upsert_building(conn, building)
                        .with_context(|| format!("Failed to store {}", building.name))?;
                    stats.inputs += building.inputs.len();
                    stats.outputs += building.outputs.len();
                    info!(
                        "  Parsed: {} (inputs: {}, outputs: {})",
                        building.name,
                        building.inputs.len(),
                        building.outputs.len()
                    );
                }
                stats.files += 1;
                stats.buildings += dump.buildings.len();
                stats.skipped_lines += dump.skipped_lines;
            }
            Err(e) => {
                warn!("Error parsing {}: {:#}", filepath.display(), e);
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ExtractStats {
    pub files: usize,
    pub buildings: usize,
    pub inputs: usize,
    pub outputs: usize,
    pub skipped_lines: usize,
    pub errors: usize,
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Extracted {} buildings from {} file(s) ({} inputs, {} outputs). Skipped lines: {}, Errors: {}",
            self.buildings, self.files, self.inputs, self.outputs, self.skipped_lines, self.errors
        )
    }
}
