//! Rolling multi-year archive of matched department results.

use crate::models::{DepartmentDataset, HistoricalArchive};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { departments: usize },
    /// The year's dataset was empty; the archive was not touched.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionSummary {
    pub min_year_kept: u32,
    pub removed_entries: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryMerger {
    years_to_keep: u32,
}

impl HistoryMerger {
    /// `years_to_keep` must be at least 1 (enforced by `Config::validate`).
    pub fn new(years_to_keep: u32) -> Self {
        Self { years_to_keep }
    }

    pub fn years_to_keep(&self) -> u32 {
        self.years_to_keep
    }

    /// Oldest year that survives eviction: `year - years_to_keep + 1`.
    pub fn min_year_to_keep(&self, current_year: u32) -> u32 {
        current_year.saturating_add(1).saturating_sub(self.years_to_keep)
    }

    /// Write a snapshot of every record under `archive[institution][program][year]`.
    /// Other years of the same program are left alone.
    pub fn merge(
        &self,
        archive: &mut HistoricalArchive,
        year: u32,
        dataset: &DepartmentDataset,
    ) -> MergeOutcome {
        if dataset.values().all(|programs| programs.is_empty()) {
            warn!(year, "no department data for this year, archive left untouched");
            return MergeOutcome::Skipped;
        }

        let year_key = year.to_string();
        let mut departments = 0;
        for (institution, programs) in dataset {
            let archived_programs = archive.entry(institution.clone()).or_default();
            for (program, record) in programs {
                archived_programs
                    .entry(program.clone())
                    .or_default()
                    .insert(year_key.clone(), record.clone());
                departments += 1;
            }
        }

        info!(year, departments, "merged year into historical archive");
        MergeOutcome::Merged { departments }
    }

    /// Drop every year older than the retention window. Institutions and
    /// programs stay in the archive even when no year remains.
    pub fn evict(&self, archive: &mut HistoricalArchive, current_year: u32) -> EvictionSummary {
        let min_year_kept = self.min_year_to_keep(current_year);
        let mut removed_entries = 0;

        for (institution, programs) in archive.iter_mut() {
            for (program, years) in programs.iter_mut() {
                years.retain(|year, _| match year.trim().parse::<u32>() {
                    Ok(value) if value < min_year_kept => {
                        removed_entries += 1;
                        false
                    }
                    Ok(_) => true,
                    Err(_) => {
                        warn!(%institution, %program, %year, "non-numeric year key kept");
                        true
                    }
                });
            }
        }

        info!(min_year_kept, removed_entries, "evicted archived years");
        EvictionSummary {
            min_year_kept,
            removed_entries,
        }
    }

    /// Merge then evict. Eviction is skipped together with an empty merge.
    pub fn merge_and_evict(
        &self,
        archive: &mut HistoricalArchive,
        year: u32,
        dataset: &DepartmentDataset,
    ) -> (MergeOutcome, Option<EvictionSummary>) {
        match self.merge(archive, year, dataset) {
            MergeOutcome::Skipped => (MergeOutcome::Skipped, None),
            merged => (merged, Some(self.evict(archive, year))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DepartmentRecord, SubjectMultipliers};
    use std::collections::BTreeMap;

    fn record(score: f64) -> DepartmentRecord {
        let multipliers: SubjectMultipliers = [("國文", 1.0), ("英文", 1.0)].into_iter().collect();
        let mut record = DepartmentRecord::new(multipliers, 20);
        record.general_score = Some(score);
        record
    }

    fn dataset(score: f64) -> DepartmentDataset {
        let mut dataset = DepartmentDataset::new();
        dataset
            .entry("國立清華大學".to_string())
            .or_default()
            .insert("中國文學系".to_string(), record(score));
        dataset
    }

    fn archive_with_years(years: &[&str]) -> HistoricalArchive {
        let mut archive = HistoricalArchive::new();
        let program_years: BTreeMap<String, DepartmentRecord> = years
            .iter()
            .map(|year| (year.to_string(), record(50.0)))
            .collect();
        archive
            .entry("國立清華大學".to_string())
            .or_default()
            .insert("中國文學系".to_string(), program_years.clone());
        archive
            .entry("國立中興大學".to_string())
            .or_default()
            .insert("歷史學系".to_string(), program_years);
        archive
    }

    #[test]
    fn merge_creates_missing_institutions_and_programs() {
        let merger = HistoryMerger::new(3);
        let mut archive = HistoricalArchive::new();
        let outcome = merger.merge(&mut archive, 114, &dataset(61.5));

        assert_eq!(outcome, MergeOutcome::Merged { departments: 1 });
        assert_eq!(
            archive["國立清華大學"]["中國文學系"]["114"].general_score,
            Some(61.5)
        );
    }

    #[test]
    fn merge_overwrites_only_the_current_year() {
        let merger = HistoryMerger::new(3);
        let mut archive = archive_with_years(&["112", "113", "114"]);
        merger.merge(&mut archive, 114, &dataset(61.5));

        let years = &archive["國立清華大學"]["中國文學系"];
        assert_eq!(years["114"].general_score, Some(61.5));
        assert_eq!(years["113"].general_score, Some(50.0));
        assert_eq!(years["112"].general_score, Some(50.0));
    }

    #[test]
    fn eviction_keeps_the_retention_window() {
        let merger = HistoryMerger::new(3);
        let mut archive = archive_with_years(&["109", "110", "111", "112", "113"]);
        let (outcome, eviction) = merger.merge_and_evict(&mut archive, 114, &dataset(61.5));

        assert_eq!(outcome, MergeOutcome::Merged { departments: 1 });
        assert_eq!(
            eviction,
            Some(EvictionSummary {
                min_year_kept: 112,
                removed_entries: 6,
            })
        );
        let kept: Vec<&str> = archive["國立清華大學"]["中國文學系"]
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(kept, vec!["112", "113", "114"]);
        let untouched: Vec<&str> = archive["國立中興大學"]["歷史學系"]
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(untouched, vec!["112", "113"]);
    }

    #[test]
    fn emptied_programs_keep_their_shell() {
        let merger = HistoryMerger::new(1);
        let mut archive = archive_with_years(&["100", "101"]);
        merger.evict(&mut archive, 114);

        assert!(archive["國立中興大學"]["歷史學系"].is_empty());
        assert!(archive.contains_key("國立中興大學"));
    }

    #[test]
    fn non_numeric_year_keys_survive() {
        let merger = HistoryMerger::new(3);
        let mut archive = archive_with_years(&["latest", "100"]);
        let summary = merger.evict(&mut archive, 114);

        assert_eq!(summary.removed_entries, 2);
        assert!(archive["國立清華大學"]["中國文學系"].contains_key("latest"));
    }

    #[test]
    fn empty_dataset_skips_merge_and_eviction() {
        let merger = HistoryMerger::new(3);
        let mut archive = archive_with_years(&["100", "113"]);
        let before = archive.clone();

        let (outcome, eviction) = merger.merge_and_evict(&mut archive, 114, &DepartmentDataset::new());
        assert_eq!(outcome, MergeOutcome::Skipped);
        assert_eq!(eviction, None);
        assert_eq!(archive, before);
    }

    #[test]
    fn repeating_a_year_is_idempotent() {
        let merger = HistoryMerger::new(3);
        let mut archive = archive_with_years(&["110", "111", "112", "113"]);
        merger.merge_and_evict(&mut archive, 114, &dataset(61.5));
        let once = archive.clone();
        merger.merge_and_evict(&mut archive, 114, &dataset(61.5));
        assert_eq!(archive, once);
    }

    #[test]
    fn window_never_underflows() {
        let merger = HistoryMerger::new(10);
        assert_eq!(merger.min_year_to_keep(5), 0);
        assert_eq!(merger.min_year_to_keep(114), 105);
        assert_eq!(HistoryMerger::new(1).min_year_to_keep(114), 114);
    }
}
