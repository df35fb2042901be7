//! Rubric loading and validation from tabular sources

use crate::error::{RankerError, Result};
use crate::rubric::{ExcludedRow, Rubric, RubricEntry, TOTAL_POSSIBLE_POINTS};
use log::{debug, warn};
use regex::Regex;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// One unvalidated rubric row as supplied by a tabular source.
#[derive(Debug, Clone, PartialEq)]
pub struct RubricRow {
    pub criterion: String,
    pub points: String,
    pub notes: String,
    pub weight: String,
}

impl RubricRow {
    pub fn new(criterion: &str, points: &str, notes: &str, weight: &str) -> Self {
        Self {
            criterion: criterion.to_string(),
            points: points.to_string(),
            notes: notes.to_string(),
            weight: weight.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Criterion,
    Points,
    Notes,
    Weight,
}

impl Column {
    const REQUIRED: [Column; 4] = [Column::Criterion, Column::Points, Column::Notes, Column::Weight];

    fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_lowercase().as_str() {
            "criteria" | "criterion" => Some(Column::Criterion),
            "points" | "range" | "points range" => Some(Column::Points),
            "notes" | "guidance" => Some(Column::Notes),
            "weightage" | "weight" => Some(Column::Weight),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Column::Criterion => "Criteria",
            Column::Points => "Points",
            Column::Notes => "Notes",
            Column::Weight => "Weightage",
        }
    }
}

pub struct RubricLoader {
    range_regex: Regex,
    excluded_criterion: String,
    require_weights_sum_to_100: bool,
}

impl Default for RubricLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RubricLoader {
    pub fn new() -> Self {
        let range_regex = Regex::new(r"(?i)^\s*(-?\d+)\s*(?:-|–|—|to)\s*(-?\d+)\s*$")
            .expect("Invalid range regex");

        Self {
            range_regex,
            excluded_criterion: TOTAL_POSSIBLE_POINTS.to_string(),
            require_weights_sum_to_100: false,
        }
    }

    pub fn with_excluded_criterion(mut self, name: impl Into<String>) -> Self {
        self.excluded_criterion = name.into();
        self
    }

    pub fn with_weight_sum_check(mut self, enforce: bool) -> Self {
        self.require_weights_sum_to_100 = enforce;
        self
    }

    pub fn load_path(&self, path: &Path) -> Result<Rubric> {
        let file = std::fs::File::open(path)?;
        self.load_csv(file)
    }

    /// Read a CSV rubric with `Criteria, Points, Notes, Weightage` columns.
    pub fn load_csv<R: Read>(&self, reader: R) -> Result<Rubric> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut positions = [None; 4];
        for (index, header) in headers.iter().enumerate() {
            if let Some(column) = Column::from_header(header) {
                let slot = &mut positions[column as usize];
                if slot.is_none() {
                    *slot = Some(index);
                }
            }
        }

        let missing: Vec<&str> = Column::REQUIRED
            .iter()
            .filter(|column| positions[**column as usize].is_none())
            .map(|column| column.label())
            .collect();
        if !missing.is_empty() {
            return Err(RankerError::MalformedRubric(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let cell = |record: &csv::StringRecord, column: Column| -> String {
            positions[column as usize]
                .and_then(|index| record.get(index))
                .unwrap_or_default()
                .to_string()
        };

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            rows.push(RubricRow {
                criterion: cell(&record, Column::Criterion),
                points: cell(&record, Column::Points),
                notes: cell(&record, Column::Notes),
                weight: cell(&record, Column::Weight),
            });
        }

        self.load_rows(rows)
    }

    /// Validate rows into a rubric, preserving row order.
    pub fn load_rows(&self, rows: Vec<RubricRow>) -> Result<Rubric> {
        let mut entries: Vec<RubricEntry> = Vec::with_capacity(rows.len());
        let mut seen = HashSet::new();
        let mut excluded = None;

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            let name = row.criterion.trim().to_string();

            if name.is_empty() {
                return Err(malformed(row_number, "criterion name is blank"));
            }
            if !seen.insert(name.clone()) {
                return Err(malformed(row_number, &format!("duplicate criterion '{}'", name)));
            }

            if name == self.excluded_criterion {
                debug!("Keeping '{}' as rubric metadata", name);
                excluded = Some(ExcludedRow {
                    name,
                    points: row.points.trim().to_string(),
                    notes: row.notes.trim().to_string(),
                });
                continue;
            }

            let (min_points, max_points) = self.parse_range(&row.points).ok_or_else(|| {
                malformed(
                    row_number,
                    &format!("points range '{}' for '{}' is not of the form min-max", row.points, name),
                )
            })?;
            if min_points > max_points {
                return Err(malformed(
                    row_number,
                    &format!("inverted range {}-{} for '{}'", min_points, max_points, name),
                ));
            }
            if max_points <= 0 {
                return Err(malformed(
                    row_number,
                    &format!("maximum points for '{}' must be positive", name),
                ));
            }

            let weight = parse_weight(&row.weight).ok_or_else(|| {
                malformed(
                    row_number,
                    &format!("weight '{}' for '{}' must be a positive number", row.weight, name),
                )
            })?;

            entries.push(RubricEntry {
                name,
                min_points,
                max_points,
                notes: row.notes.trim().to_string(),
                weight,
            });
        }

        if entries.is_empty() {
            return Err(RankerError::MalformedRubric(
                "rubric has no scored criteria".to_string(),
            ));
        }

        let rubric = Rubric::new(entries, excluded);
        let total_weight = rubric.total_weight();
        if (total_weight - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
            if self.require_weights_sum_to_100 {
                return Err(RankerError::MalformedRubric(format!(
                    "weights sum to {} but must sum to 100",
                    total_weight
                )));
            }
            warn!(
                "Rubric weights sum to {}; totals are out of {} rather than 100",
                total_weight, total_weight
            );
        }

        Ok(rubric)
    }

    fn parse_range(&self, points: &str) -> Option<(i64, i64)> {
        let captures = self.range_regex.captures(points)?;
        let min = captures.get(1)?.as_str().parse().ok()?;
        let max = captures.get(2)?.as_str().parse().ok()?;
        Some((min, max))
    }
}

fn parse_weight(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let weight: f64 = number.parse().ok()?;
    (weight.is_finite() && weight > 0.0).then_some(weight)
}

fn malformed(row_number: usize, reason: &str) -> RankerError {
    RankerError::MalformedRubric(format!("row {}: {}", row_number, reason))
}
