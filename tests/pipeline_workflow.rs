use admission_percentile::storage::{load_json, save_json};
use admission_percentile::{
    Config, DepartmentDataset, DepartmentRecord, HistoricalArchive, MergeOutcome, Pipeline,
    PipelineError, SubjectMultipliers,
};
use std::fs;
use std::path::{Path, PathBuf};

const EXAM_CSV: &str = "\
114學年度分科測驗錄取標準\n\
校系代碼,學校名稱,系組名稱,採計及加權,錄取人數,一般生錄取標準,原住民錄取標準\n\
001012,國立臺灣大學,資訊工程學系,國x1.00 英x1.00 數甲x1.50,12,210,200\n\
001013,國立臺灣大學,歷史學系,國x1.00 歷x1.00,20,------,------\n\
001014,國立臺灣大學,戲劇學系,國x1.00 英x1.00\n\
002001,國立成功大學,電機工程學系,國x1.00 英x1.00 數甲x1.00,40,200.01,\n";

const DISTRIBUTION_CSV: &str = "\
組別,科目組合,分數區間,累積百分比\n\
013,國文、英文、數學甲,178.01-179,47.2\n\
013,國文、英文、數學甲,179.01-180,45.5\n\
013,國文、英文、數學甲,199.01-200,20.25\n\
013,國文、英文、數學甲,200.01-201,19.875\n\
001,公民與社會、英文、數學B,99.01-100,88.12\n";

struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "admission-percentile-it-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).expect("create workspace");
        Self { root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn config(&self, year: u32) -> Config {
        let mut config = Config::default();
        config.current_year = year;
        config.region_pages.clear();
        config.paths.exam_csv = Some(self.path("exam.csv"));
        config.paths.distribution_csv = Some(self.path("distribution.csv"));
        config.paths.department_data = self.path("division_exam_data.json");
        config.paths.score_distribution = self.path("score_distribution.json");
        config.paths.matched_output = self.path("matched.json");
        config.paths.matched_csv = Some(self.path("matched.csv"));
        config.paths.historical_archive = self.path("historical_results.json");
        config.paths.school_regions = self.path("schools_by_region.json");
        config
    }

    fn write_sources(&self) {
        fs::write(self.path("exam.csv"), EXAM_CSV).expect("write exam csv");
        fs::write(self.path("distribution.csv"), DISTRIBUTION_CSV).expect("write distribution csv");
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn archived_snapshot(score: f64) -> DepartmentRecord {
    let multipliers: SubjectMultipliers = [("國文", 1.0), ("英文", 1.0), ("數甲", 1.5)]
        .into_iter()
        .collect();
    let mut record = DepartmentRecord::new(multipliers, 10);
    record.general_score = Some(score);
    record
}

fn years_of(archive: &HistoricalArchive, institution: &str, program: &str) -> Vec<String> {
    archive[institution][program].keys().cloned().collect()
}

#[test]
fn full_run_imports_matches_and_archives() {
    let workspace = Workspace::new("full");
    workspace.write_sources();
    let config = workspace.config(114);

    let mut seeded = HistoricalArchive::new();
    let years = seeded
        .entry("國立臺灣大學".to_string())
        .or_default()
        .entry("資訊工程學系".to_string())
        .or_default();
    for (year, score) in [("111", 58.0), ("112", 59.0), ("113", 59.5)] {
        years.insert(year.to_string(), archived_snapshot(score));
    }
    save_json(workspace.path("historical_results.json"), &seeded).expect("seed archive");

    let report = Pipeline::new(&config).run().expect("pipeline runs");

    let exam = report.exam_import.expect("exam import ran");
    assert_eq!(exam.rows_read, 4);
    assert_eq!(exam.imported, 2);
    assert_eq!(exam.skipped, 2);
    assert_eq!(report.distribution_import.expect("distribution ran").groups, 2);
    assert_eq!(report.matching.departments, 2);
    assert_eq!(report.matching.matched_groups, 2);
    assert_eq!(report.matching.resolved_percentiles, 2);
    assert_eq!(report.merge, Some(MergeOutcome::Merged { departments: 2 }));

    let matched: DepartmentDataset = load_json(workspace.path("matched.json")).expect("matched output");
    let csie = &matched["國立臺灣大學"]["資訊工程學系"];
    assert_eq!(csie.general_score, Some(60.0));
    assert_eq!(csie.indigenous_score, Some(42.33));
    assert_eq!(csie.group_id.as_deref(), Some("013"));
    assert_eq!(csie.percentile_rank, Some(45.5));

    // 200.01 / 3 = 66.67, reconstructed as ceil(200.01) = 201.
    let ee = &matched["國立成功大學"]["電機工程學系"];
    assert_eq!(ee.general_score, Some(66.67));
    assert_eq!(ee.percentile_rank, Some(19.88));

    let archive: HistoricalArchive =
        load_json(workspace.path("historical_results.json")).expect("archive saved");
    assert_eq!(
        years_of(&archive, "國立臺灣大學", "資訊工程學系"),
        vec!["112", "113", "114"]
    );
    assert_eq!(years_of(&archive, "國立成功大學", "電機工程學系"), vec!["114"]);
    assert_eq!(
        archive["國立臺灣大學"]["資訊工程學系"]["113"].general_score,
        Some(59.5)
    );

    let csv = fs::read_to_string(workspace.path("matched.csv")).expect("csv report");
    assert!(csv.contains("國立臺灣大學,資訊工程學系"));
}

#[test]
fn rerunning_the_same_year_is_idempotent() {
    let workspace = Workspace::new("rerun");
    workspace.write_sources();
    let config = workspace.config(114);
    let pipeline = Pipeline::new(&config);

    pipeline.run().expect("first run");
    let first = fs::read_to_string(workspace.path("historical_results.json")).expect("archive");
    pipeline.run().expect("second run");
    let second = fs::read_to_string(workspace.path("historical_results.json")).expect("archive");

    assert_eq!(first, second);
}

#[test]
fn missing_percentile_tables_abort_before_archive_write() {
    let workspace = Workspace::new("missing");
    workspace.write_sources();
    let mut config = workspace.config(114);
    config.paths.distribution_csv = None;

    let err = Pipeline::new(&config).run().expect_err("run must fail");
    match err {
        PipelineError::MissingInput(path) => {
            assert_eq!(path, workspace.path("score_distribution.json"));
        }
        other => panic!("expected missing input, got {other:?}"),
    }
    assert!(!workspace.path("historical_results.json").exists());
    assert!(!workspace.path("matched.json").exists());
}

#[test]
fn empty_year_leaves_existing_archive_untouched() {
    let workspace = Workspace::new("empty");
    let config = workspace.config(115);

    let mut seeded = HistoricalArchive::new();
    seeded
        .entry("國立政治大學".to_string())
        .or_default()
        .entry("法律學系".to_string())
        .or_default()
        .insert("111".to_string(), archived_snapshot(70.0));
    save_json(workspace.path("historical_results.json"), &seeded).expect("seed archive");
    let before = fs::read_to_string(workspace.path("historical_results.json")).expect("read");

    save_json(workspace.path("matched.json"), &DepartmentDataset::new()).expect("empty year");
    let (outcome, eviction) = Pipeline::new(&config)
        .archive_matched_output()
        .expect("archive stage runs");

    assert_eq!(outcome, MergeOutcome::Skipped);
    assert!(eviction.is_none());
    let after = fs::read_to_string(workspace.path("historical_results.json")).expect("read");
    assert_eq!(before, after);
}

#[test]
fn corrupt_archive_is_never_overwritten() {
    let workspace = Workspace::new("corrupt");
    workspace.write_sources();
    let config = workspace.config(114);
    fs::write(workspace.path("historical_results.json"), "{ truncated").expect("corrupt archive");

    let err = Pipeline::new(&config).run().expect_err("corrupt archive is fatal");
    assert!(matches!(err, PipelineError::Json { .. }));
    let content = fs::read_to_string(workspace.path("historical_results.json")).expect("read");
    assert_eq!(content, "{ truncated");
}

#[test]
fn strict_mode_rejects_duplicate_subject_combinations() {
    let workspace = Workspace::new("strict");
    workspace.write_sources();
    fs::write(
        workspace.path("distribution.csv"),
        format!("{DISTRIBUTION_CSV}014,數學甲、英文、國文,179.01-180,45.0\n"),
    )
    .expect("write duplicate group");

    let mut config = workspace.config(114);
    config.reject_duplicate_groups = true;
    let err = Pipeline::new(&config).run().expect_err("duplicates rejected");
    assert!(matches!(err, PipelineError::DuplicateSubjectGroup { .. }));
    assert!(!Path::new(&workspace.path("historical_results.json")).exists());

    config.reject_duplicate_groups = false;
    let report = Pipeline::new(&config).run().expect("lenient run");
    assert_eq!(report.matching.matched_groups, 2);
    let matched: DepartmentDataset = load_json(workspace.path("matched.json")).expect("matched");
    assert_eq!(
        matched["國立臺灣大學"]["資訊工程學系"].group_id.as_deref(),
        Some("014")
    );
}
