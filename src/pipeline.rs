//! Stage runners shared by the CLI subcommands.
//!
//! Every stage loads all of its inputs before writing anything, so a missing
//! or corrupt input aborts the stage without touching its outputs.

use crate::analyzer::{MatchSummary, PercentileAnalyzer};
use crate::distribution::{DistributionImporter, DistributionSummary};
use crate::error::PipelineError;
use crate::exam_csv::{ExamResultsImporter, ImportSummary};
use crate::history::{EvictionSummary, HistoryMerger, MergeOutcome};
use crate::models::{Config, DepartmentDataset, PercentileTables};
use crate::normalizer::ScoreNormalizer;
use crate::report;
use crate::scraper::SchoolRegionScraper;
use crate::storage::{load_archive, load_json, save_json};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub exam_import: Option<ImportSummary>,
    pub distribution_import: Option<DistributionSummary>,
    pub matching: MatchSummary,
    pub merge: Option<MergeOutcome>,
    pub eviction: Option<EvictionSummary>,
}

pub struct Pipeline<'a> {
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Exam results CSV -> department dataset JSON.
    pub fn import_exam_results(&self) -> Result<ImportSummary, PipelineError> {
        let source = self
            .config
            .paths
            .exam_csv
            .as_ref()
            .ok_or_else(|| PipelineError::MissingInput("paths.exam_csv".into()))?;
        let importer = ExamResultsImporter::new(
            &self.config.subjects,
            ScoreNormalizer::new(self.config.indigenous_bonus_factor),
        );
        let (dataset, summary) = importer.import_file(source)?;
        save_json(&self.config.paths.department_data, &dataset)?;
        Ok(summary)
    }

    /// Score distribution CSV -> percentile table JSON.
    pub fn import_distribution(&self) -> Result<DistributionSummary, PipelineError> {
        let source = self
            .config
            .paths
            .distribution_csv
            .as_ref()
            .ok_or_else(|| PipelineError::MissingInput("paths.distribution_csv".into()))?;
        let (tables, summary) = DistributionImporter::new(&self.config.subjects).import_file(source)?;
        save_json(&self.config.paths.score_distribution, &tables)?;
        Ok(summary)
    }

    /// Region listing pages -> school/region JSON. Returns the number of schools.
    pub fn extract_school_regions(&self) -> Result<usize, PipelineError> {
        let schools = SchoolRegionScraper::new().scrape_pages(&self.config.region_pages);
        save_json(&self.config.paths.school_regions, &schools)?;
        Ok(schools.len())
    }

    /// Annotate the department dataset with groups and percentiles and save
    /// the matched output (and the optional CSV view).
    pub fn match_departments(&self) -> Result<(DepartmentDataset, MatchSummary), PipelineError> {
        let mut dataset: DepartmentDataset = load_json(&self.config.paths.department_data)?;
        let tables: PercentileTables = load_json(&self.config.paths.score_distribution)?;

        let summary = self.match_dataset(&mut dataset, &tables)?;

        save_json(&self.config.paths.matched_output, &dataset)?;
        if let Some(csv_path) = &self.config.paths.matched_csv {
            report::write_matched_csv_file(&dataset, csv_path)?;
        }
        Ok((dataset, summary))
    }

    pub fn match_dataset(
        &self,
        dataset: &mut DepartmentDataset,
        tables: &PercentileTables,
    ) -> Result<MatchSummary, PipelineError> {
        let analyzer = if self.config.reject_duplicate_groups {
            PercentileAnalyzer::new_strict(tables)?
        } else {
            PercentileAnalyzer::new(tables)
        };
        Ok(analyzer.analyze_all_departments(dataset))
    }

    /// Merge the matched output file into the archive.
    pub fn archive_matched_output(
        &self,
    ) -> Result<(MergeOutcome, Option<EvictionSummary>), PipelineError> {
        let dataset: DepartmentDataset = load_json(&self.config.paths.matched_output)?;
        self.archive_dataset(&dataset)
    }

    /// Merge `dataset` as `current_year`, evict old years and save. The archive
    /// file is not rewritten when the merge is skipped.
    pub fn archive_dataset(
        &self,
        dataset: &DepartmentDataset,
    ) -> Result<(MergeOutcome, Option<EvictionSummary>), PipelineError> {
        let path = &self.config.paths.historical_archive;
        let mut archive = load_archive(path)?;
        let merger = HistoryMerger::new(self.config.years_to_keep);

        let (outcome, eviction) =
            merger.merge_and_evict(&mut archive, self.config.current_year, dataset);
        if outcome != MergeOutcome::Skipped {
            save_json(path, &archive)?;
        }
        Ok((outcome, eviction))
    }

    /// Import whatever CSV sources are configured, then match and archive.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::default();

        if self.config.paths.exam_csv.is_some() {
            report.exam_import = Some(self.import_exam_results()?);
        }
        if self.config.paths.distribution_csv.is_some() {
            report.distribution_import = Some(self.import_distribution()?);
        }

        let (dataset, matching) = self.match_departments()?;
        report.matching = matching;

        let (merge, eviction) = self.archive_dataset(&dataset)?;
        report.merge = Some(merge);
        report.eviction = eviction;

        info!(year = self.config.current_year, "pipeline run complete");
        Ok(report)
    }
}
