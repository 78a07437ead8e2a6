//! Import of the published exam-results table (one row per program).
//!
//! Row layout: `code, institution, program, criteria, admitted, general[, indigenous]`
//! where criteria looks like `國x1.00 英x1.00 數甲x1.50` and scores are weighted
//! totals. Scores are normalized to weighted averages on the way in.

use crate::error::PipelineError;
use crate::models::{DepartmentDataset, DepartmentRecord, SubjectMultipliers};
use crate::normalizer::ScoreNormalizer;
use crate::subjects::SubjectVocabulary;
use regex::Regex;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const MIN_FIELDS: usize = 6;
const MISSING_SCORE: &str = "------";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub imported: usize,
    pub skipped: usize,
    /// Imported rows whose scores could not be normalized and were kept raw.
    pub unnormalized: usize,
}

pub struct ExamResultsImporter<'a> {
    vocabulary: &'a SubjectVocabulary,
    normalizer: ScoreNormalizer,
}

fn department_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").expect("department code pattern is valid"))
}

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+\.?\d*|\.\d+)$").expect("score pattern is valid"))
}

impl<'a> ExamResultsImporter<'a> {
    pub fn new(vocabulary: &'a SubjectVocabulary, normalizer: ScoreNormalizer) -> Self {
        Self {
            vocabulary,
            normalizer,
        }
    }

    pub fn import_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(DepartmentDataset, ImportSummary), PipelineError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| PipelineError::io(path, source))?;
        self.import_reader(file)
    }

    pub fn import_reader<R: Read>(
        &self,
        reader: R,
    ) -> Result<(DepartmentDataset, ImportSummary), PipelineError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut dataset = DepartmentDataset::new();
        let mut summary = ImportSummary::default();

        for (index, row) in csv_reader.records().enumerate() {
            let line = index + 1;
            let row = match row {
                Ok(row) => row,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    warn!(line, error = %err, "unreadable row, skipping");
                    summary.rows_read += 1;
                    summary.skipped += 1;
                    continue;
                }
            };
            let Some(code) = row.get(0) else {
                continue;
            };
            // Title, header and footnote lines carry no department code.
            if !department_code_regex().is_match(code) {
                continue;
            }
            summary.rows_read += 1;

            if row.len() < MIN_FIELDS {
                warn!(line, fields = row.len(), "skipping row with too few fields");
                summary.skipped += 1;
                continue;
            }

            let institution = &row[1];
            let program = &row[2];

            let Some(general_total) = parse_score(&row[5]) else {
                debug!(line, %institution, %program, "no general admission score, skipping");
                summary.skipped += 1;
                continue;
            };

            let admitted_count = match row[4].parse::<u32>() {
                Ok(count) => count,
                Err(err) => {
                    warn!(line, value = &row[4], error = %err, "invalid admitted count, skipping row");
                    summary.skipped += 1;
                    continue;
                }
            };

            let indigenous_total = row.get(6).and_then(parse_score);
            let multipliers = self.parse_criteria(&row[3], institution, program);

            let general = self.normalizer.normalize_general(general_total, &multipliers);
            if !general.is_resolved() {
                warn!(
                    %institution,
                    %program,
                    "multiplier sum is zero, keeping raw admission scores"
                );
                summary.unnormalized += 1;
            }

            let mut record = DepartmentRecord::new(multipliers, admitted_count);
            record.general_score = Some(general.or_raw(general_total));
            record.indigenous_score = indigenous_total.map(|total| {
                self.normalizer
                    .normalize_indigenous(total, &record.subject_multipliers)
                    .or_raw(total)
            });

            dataset
                .entry(institution.to_string())
                .or_default()
                .insert(program.to_string(), record);
            summary.imported += 1;
        }

        info!(
            rows = summary.rows_read,
            imported = summary.imported,
            skipped = summary.skipped,
            unnormalized = summary.unnormalized,
            "imported exam results"
        );
        Ok((dataset, summary))
    }

    /// Parse whitespace separated `<abbr>x<multiplier>` tokens.
    pub fn parse_criteria(&self, criteria: &str, institution: &str, program: &str) -> SubjectMultipliers {
        let mut multipliers = SubjectMultipliers::new();

        for token in criteria.split_whitespace() {
            let parts: Vec<&str> = token.split('x').collect();
            if parts.len() != 2 {
                continue;
            }
            let subject = self.vocabulary.expand_abbreviation(parts[0].trim());
            let raw_multiplier = parts[1].trim();

            let Ok(multiplier) = raw_multiplier.parse::<f64>() else {
                warn!(
                    %institution,
                    %program,
                    value = raw_multiplier,
                    "multiplier is not a number, dropped"
                );
                continue;
            };
            if !multipliers.insert(subject.clone(), multiplier) {
                warn!(%institution, %program, %subject, multiplier, "non-positive multiplier dropped");
            }
        }

        multipliers
    }
}

fn parse_score(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw == MISSING_SCORE || !score_regex().is_match(raw) {
        return None;
    }
    raw.parse::<f64>().ok()
}
