use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use crate::analysis::histogram::HistogramConfig;
use crate::pipeline::WordResult;

// ---------------------------------------------------------------------------
// Output options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HistogramFormat {
    #[default]
    Csv,
    Parquet,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub out_dir: PathBuf,
    pub histogram_format: HistogramFormat,
    pub json_summary: bool,
}

/// Write every output file into `options.out_dir`.  Returns the paths written.
pub fn write_all(
    results: &[WordResult],
    config: &HistogramConfig,
    options: &OutputOptions,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&options.out_dir)
        .with_context(|| format!("creating {}", options.out_dir.display()))?;
    let mut written = Vec::new();

    let path = options.out_dir.join("cleaned.csv");
    write_cleaned_csv(create(&path)?, results)?;
    written.push(path);

    let path = match options.histogram_format {
        HistogramFormat::Csv => {
            let path = options.out_dir.join("histograms.csv");
            write_histograms_csv(create(&path)?, results, config)?;
            path
        }
        HistogramFormat::Parquet => {
            let path = options.out_dir.join("histograms.parquet");
            write_histograms_parquet(&path, results, config)?;
            path
        }
    };
    written.push(path);

    let path = options.out_dir.join("statistics.csv");
    write_statistics_csv(create(&path)?, results)?;
    written.push(path);

    if options.json_summary {
        let path = options.out_dir.join("summary.json");
        write_summary_json(create(&path)?, results, config)?;
        written.push(path);
    }

    for path in &written {
        info!("wrote {}", path.display());
    }
    Ok(written)
}

fn create(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("creating {}", path.display()))
}

// ---------------------------------------------------------------------------
// Cleaned intervals
// ---------------------------------------------------------------------------

/// Same shape as the survey input: label + empty cell per word, then one
/// row per surviving answer.  Words with fewer survivors are padded with
/// empty cells.
pub fn write_cleaned_csv<W: Write>(sink: W, results: &[WordResult]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(false).from_writer(sink);

    let header: Vec<&str> = results.iter().flat_map(|r| [r.label.as_str(), ""]).collect();
    wtr.write_record(&header).context("writing cleaned header")?;

    let rows = results.iter().map(|r| r.cleaned.len()).max().unwrap_or(0);
    for row in 0..rows {
        let mut record: Vec<String> = Vec::with_capacity(results.len() * 2);
        for r in results {
            match r.cleaned.get(row) {
                Some(iv) => {
                    record.push(iv.left.to_string());
                    record.push(iv.right.to_string());
                }
                None => record.extend([String::new(), String::new()]),
            }
        }
        wtr.write_record(&record)
            .with_context(|| format!("writing cleaned row {row}"))?;
    }
    wtr.flush().context("flushing cleaned intervals")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Histograms
// ---------------------------------------------------------------------------

/// `x` column of axis values, then one normalized column per word.
pub fn write_histograms_csv<W: Write>(
    sink: W,
    results: &[WordResult],
    config: &HistogramConfig,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(sink);

    let mut header = vec!["x"];
    header.extend(results.iter().map(|r| r.label.as_str()));
    wtr.write_record(&header).context("writing histogram header")?;

    for (bin, x) in config.axis().into_iter().enumerate() {
        let mut record = Vec::with_capacity(results.len() + 1);
        record.push(x.to_string());
        record.extend(results.iter().map(|r| r.histogram.normalized[bin].to_string()));
        wtr.write_record(&record)
            .with_context(|| format!("writing histogram bin {bin}"))?;
    }
    wtr.flush().context("flushing histograms")?;
    Ok(())
}

/// Columnar variant of [`write_histograms_csv`].
pub fn write_histograms_parquet(
    path: &Path,
    results: &[WordResult],
    config: &HistogramConfig,
) -> Result<()> {
    let mut fields = vec![Field::new("x", DataType::Float64, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(Float64Array::from(config.axis()))];
    for r in results {
        fields.push(Field::new(r.label.as_str(), DataType::Float64, false));
        columns.push(Arc::new(Float64Array::from(r.histogram.normalized.clone())));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building histogram batch")?;

    let file = create(path)?;
    let mut writer =
        ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing histogram batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct StatisticsRow<'a> {
    label: &'a str,
    mom: f64,
    std_dev: f64,
    degenerate: bool,
    discarded: usize,
    input: usize,
    after_endpoint_iqr: usize,
    after_length_iqr: usize,
    after_endpoint_tolerance: usize,
    after_length_tolerance: usize,
    after_reasonable: usize,
    issues: String,
}

impl<'a> From<&'a WordResult> for StatisticsRow<'a> {
    fn from(r: &'a WordResult) -> Self {
        let issues: Vec<&str> = r.issues.iter().map(|i| i.code()).collect();
        StatisticsRow {
            label: &r.label,
            mom: r.summary.mom,
            std_dev: r.summary.std_dev,
            degenerate: r.summary.degenerate,
            discarded: r.discarded,
            input: r.report.input,
            after_endpoint_iqr: r.report.after_endpoint_iqr,
            after_length_iqr: r.report.after_length_iqr,
            after_endpoint_tolerance: r.report.after_endpoint_tolerance,
            after_length_tolerance: r.report.after_length_tolerance,
            after_reasonable: r.report.after_reasonable,
            issues: issues.join(";"),
        }
    }
}

/// One row per word: MOM, std dev, degenerate flag, stage counts, issues.
pub fn write_statistics_csv<W: Write>(sink: W, results: &[WordResult]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(sink);
    for r in results {
        wtr.serialize(StatisticsRow::from(r))
            .with_context(|| format!("writing statistics for '{}'", r.label))?;
    }
    wtr.flush().context("flushing statistics")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON summary
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Summary<'a> {
    config: &'a HistogramConfig,
    words: &'a [WordResult],
}

pub fn write_summary_json<W: Write>(
    sink: W,
    results: &[WordResult],
    config: &HistogramConfig,
) -> Result<()> {
    serde_json::to_writer_pretty(
        sink,
        &Summary {
            config,
            words: results,
        },
    )
    .context("writing JSON summary")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Interval, SurveyDataset, WordRecord};
    use crate::pipeline::Pipeline;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn results() -> (Vec<WordResult>, HistogramConfig) {
        let config = HistogramConfig::default();
        let ds = SurveyDataset::from_words(vec![
            WordRecord::with_intervals("Some", vec![Interval::new(2.0, 4.0); 3]),
            WordRecord::with_intervals("None", Vec::new()),
            WordRecord::with_intervals("Lots", vec![Interval::new(7.0, 9.0)]),
        ]);
        (Pipeline::new(config).run(&ds), config)
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn cleaned_rows_are_padded() {
        let (results, _) = results();
        let mut buf = Vec::new();
        write_cleaned_csv(&mut buf, &results).unwrap();
        let out = text(buf);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Some,,None,,Lots,");
        assert_eq!(lines[1], "2,4,,,7,9");
        assert_eq!(lines[2], "2,4,,,,");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn histogram_table_has_axis_and_word_columns() {
        let (results, config) = results();
        let mut buf = Vec::new();
        write_histograms_csv(&mut buf, &results, &config).unwrap();
        let out = text(buf);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 202);
        assert_eq!(lines[0], "x,Some,None,Lots");
        assert_eq!(lines[41], "2,1,0,0");
        assert_eq!(lines[201], "10,0,0,0");
    }

    #[test]
    fn statistics_flag_degenerate_word() {
        let (results, _) = results();
        let mut buf = Vec::new();
        write_statistics_csv(&mut buf, &results).unwrap();
        let out = text(buf);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("label,mom,std_dev,degenerate,discarded,input"));
        assert!(lines[1].starts_with("Some,"));
        assert!(lines[1].contains(",false,0,3,3,3,3,3,3,"));
        assert!(lines[2].starts_with("None,NaN,NaN,true,0,0"));
        assert!(lines[2].ends_with("insufficient_data;degenerate_histogram"));
    }

    #[test]
    fn write_all_creates_expected_files() {
        let (results, config) = results();
        let dir = tempfile::tempdir().unwrap();
        let options = OutputOptions {
            out_dir: dir.path().join("out"),
            histogram_format: HistogramFormat::Parquet,
            json_summary: true,
        };
        let written = write_all(&results, &config, &options).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["cleaned.csv", "histograms.parquet", "statistics.csv", "summary.json"]
        );

        let file = File::open(options.out_dir.join("histograms.parquet")).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 201);
        assert_eq!(batches[0].num_columns(), 4);

        let json: serde_json::Value = serde_json::from_reader(
            File::open(options.out_dir.join("summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["words"][0]["label"], "Some");
        assert_eq!(json["config"]["bin_count"], 201);
    }
}
