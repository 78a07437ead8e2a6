use crate::error::PipelineError;
use crate::groups::SubjectGroupIndex;
use crate::models::{round2, DepartmentDataset, PercentileTables};
use crate::percentile::PercentileResolver;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub departments: usize,
    pub matched_groups: usize,
    pub resolved_percentiles: usize,
}

impl MatchSummary {
    pub fn unmatched(&self) -> usize {
        self.departments - self.matched_groups
    }
}

/// Annotates department records with their subject group and percentile rank.
pub struct PercentileAnalyzer<'a> {
    tables: &'a PercentileTables,
    index: SubjectGroupIndex,
    resolver: PercentileResolver,
}

impl<'a> PercentileAnalyzer<'a> {
    pub fn new(tables: &'a PercentileTables) -> Self {
        Self {
            tables,
            index: SubjectGroupIndex::build(tables),
            resolver: PercentileResolver::new(),
        }
    }

    /// Fails instead of silently picking a group when two groups share a
    /// subject combination.
    pub fn new_strict(tables: &'a PercentileTables) -> Result<Self, PipelineError> {
        Ok(Self {
            tables,
            index: SubjectGroupIndex::build_strict(tables)?,
            resolver: PercentileResolver::new(),
        })
    }

    pub fn index(&self) -> &SubjectGroupIndex {
        &self.index
    }

    /// Annotate every record in place. Records are never dropped; the
    /// indigenous score is left as it is.
    pub fn analyze_all_departments(&self, dataset: &mut DepartmentDataset) -> MatchSummary {
        let mut summary = MatchSummary::default();

        for (institution, programs) in dataset.iter_mut() {
            for (program, record) in programs.iter_mut() {
                summary.departments += 1;
                record.group_id = None;
                record.percentile_rank = None;

                let subjects = record.subject_multipliers.subject_set();
                let Some(group_id) = self.index.lookup(&subjects) else {
                    debug!(%institution, %program, ?subjects, "no subject group matches");
                    continue;
                };
                summary.matched_groups += 1;
                record.group_id = Some(group_id.to_string());

                let Some(group) = self.tables.get(group_id) else {
                    continue;
                };
                record.percentile_rank = self
                    .resolver
                    .resolve(
                        record.general_score,
                        &record.subject_multipliers,
                        group_id,
                        group,
                    )
                    .map(round2);
                if record.percentile_rank.is_some() {
                    summary.resolved_percentiles += 1;
                }
            }
        }

        info!(
            departments = summary.departments,
            matched = summary.matched_groups,
            resolved = summary.resolved_percentiles,
            "matched departments to subject groups"
        );
        summary
    }
}
