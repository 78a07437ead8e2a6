use crate::error::PipelineError;
use crate::models::DepartmentDataset;
use csv::Writer;
use std::io::Write;
use std::path::Path;

const HEADERS: [&str; 8] = [
    "Institution",
    "Program",
    "Subjects",
    "Admitted",
    "General Score",
    "Indigenous Score",
    "Group",
    "Percentile",
];

/// Flat CSV view of a matched dataset, one row per program.
pub fn write_matched_csv<W: Write>(dataset: &DepartmentDataset, output: W) -> Result<(), PipelineError> {
    let mut writer = Writer::from_writer(output);
    writer.write_record(HEADERS)?;

    for (institution, programs) in dataset {
        for (program, record) in programs {
            let subjects = record
                .subject_multipliers
                .iter()
                .map(|(subject, multiplier)| format!("{}x{:.2}", subject, multiplier))
                .collect::<Vec<_>>()
                .join(" ");

            writer.write_record(&[
                institution.clone(),
                program.clone(),
                subjects,
                record.admitted_count.to_string(),
                optional_number(record.general_score),
                optional_number(record.indigenous_score),
                record.group_id.clone().unwrap_or_default(),
                optional_number(record.percentile_rank),
            ])?;
        }
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_matched_csv_file(
    dataset: &DepartmentDataset,
    path: impl AsRef<Path>,
) -> Result<(), PipelineError> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|source| PipelineError::io(path, source))?;
    write_matched_csv(dataset, file)
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}
