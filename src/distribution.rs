//! Import of the cumulative score distribution table.
//!
//! Row layout: `group, subjects, range, percentage`, e.g.
//! `013,國文、英文、數學甲,179.01-180,45.5`. The upper bound of the range
//! becomes the integer threshold key.

use crate::error::PipelineError;
use crate::models::{PercentileTables, SubjectGroup};
use crate::subjects::SubjectVocabulary;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

const MIN_FIELDS: usize = 4;
const SUBJECT_SEPARATOR: char = '、';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionSummary {
    pub rows_imported: usize,
    pub rows_skipped: usize,
    pub groups: usize,
}

pub struct DistributionImporter<'a> {
    vocabulary: &'a SubjectVocabulary,
}

impl<'a> DistributionImporter<'a> {
    pub fn new(vocabulary: &'a SubjectVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn import_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(PercentileTables, DistributionSummary), PipelineError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| PipelineError::io(path, source))?;
        self.import_reader(file)
    }

    pub fn import_reader<R: Read>(
        &self,
        reader: R,
    ) -> Result<(PercentileTables, DistributionSummary), PipelineError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut tables = PercentileTables::new();
        let mut summary = DistributionSummary::default();

        for (index, row) in csv_reader.records().enumerate() {
            let line = index + 1;
            let row = match row {
                Ok(row) => row,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    warn!(line, error = %err, "unreadable row, skipping");
                    summary.rows_skipped += 1;
                    continue;
                }
            };
            if row.len() < MIN_FIELDS {
                continue;
            }

            let group_id = &row[0];
            let percentage = match row[3].parse::<f64>() {
                Ok(value) => value,
                Err(err) => {
                    warn!(line, value = &row[3], error = %err, "invalid percentage, skipping row");
                    summary.rows_skipped += 1;
                    continue;
                }
            };

            let Some(upper) = row[2].rsplit_once('-').map(|(_, upper)| upper) else {
                continue;
            };
            let threshold = match upper.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => value.trunc() as u64,
                _ => {
                    warn!(line, range = &row[2], "invalid score range, skipping row");
                    summary.rows_skipped += 1;
                    continue;
                }
            };

            let group = tables.entry(group_id.to_string()).or_insert_with(SubjectGroup::default);
            // The first row of a group defines its subject combination.
            if group.subjects.is_empty() {
                group.subjects = self.parse_subjects(&row[1]);
            }
            group
                .cumulative_percentiles
                .insert(threshold.to_string(), percentage);
            summary.rows_imported += 1;
        }

        summary.groups = tables.len();
        info!(
            rows = summary.rows_imported,
            skipped = summary.rows_skipped,
            groups = summary.groups,
            "imported score distribution"
        );
        Ok((tables, summary))
    }

    pub fn parse_subjects(&self, raw: &str) -> Vec<String> {
        raw.split(SUBJECT_SEPARATOR)
            .map(str::trim)
            .filter(|subject| !subject.is_empty())
            .map(|subject| self.vocabulary.canonical_name(subject))
            .collect()
    }
}
