use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::helper::error::MapulaError;
use crate::helper::json::write_json_pretty;
use crate::helper::summary::{Summary, SummaryRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Plain,
    Gz,
}

impl DataType {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => DataType::Gz,
            _ => DataType::Plain,
        }
    }
}

/// Opens a file for reading, decompressing it on the fly when it ends in `.gz`.
pub fn open_maybe_gz(path: &Path) -> io::Result<Box<dyn Read + Send>> {
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Input path '{}' does not exist", path.display()),
        ));
    }
    let file = File::open(path)?;
    let stream: Box<dyn Read + Send> = match DataType::from_path(path) {
        DataType::Plain => Box::new(BufReader::new(file)),
        DataType::Gz => Box::new(MultiGzDecoder::new(BufReader::new(file))),
    };
    Ok(stream)
}

/// Tab separated when the name (minus any `.gz`) ends in `.tsv` or `.txt`, comma separated otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".tsv") || name.ends_with(".txt") {
        b'\t'
    } else {
        b','
    }
}

/// A csv reader over an alignment record table.
pub fn record_reader(path: &Path) -> io::Result<csv::Reader<Box<dyn Read + Send>>> {
    let stream = open_maybe_gz(path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .trim(csv::Trim::All)
        .from_reader(stream))
}

/// `out/stats.mapula.json` -> `out/stats.mapula.summary.<extension>`
pub fn summary_path(snapshot_path: &Path, extension: &str) -> PathBuf {
    let stem = snapshot_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "stats".to_string());
    snapshot_path.with_file_name(format!("{}.summary.{}", stem, extension))
}

pub fn write_summary_json(summary: &Summary, path: &Path) -> Result<(), MapulaError> {
    write_json_pretty(summary, path)
}

pub fn write_summary_csv(summary: &Summary, path: &Path) -> Result<(), MapulaError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in SummaryRow::flatten(summary) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::record::AlignmentRecord;

    #[test]
    fn test_delimiter_for() {
        assert_eq!(delimiter_for(Path::new("a/records.tsv.gz")), b'\t');
        assert_eq!(delimiter_for(Path::new("records.TSV")), b'\t');
        assert_eq!(delimiter_for(Path::new("records.csv")), b',');
    }

    #[test]
    fn test_summary_path() {
        assert_eq!(
            summary_path(Path::new("out/stats.mapula.json"), "csv"),
            PathBuf::from("out/stats.mapula.summary.csv")
        );
    }

    #[test]
    fn test_plain_and_gz_tables_agree() {
        let read = |path: &str| -> Vec<AlignmentRecord> {
            record_reader(Path::new(path))
                .unwrap()
                .deserialize()
                .map(|r| r.unwrap())
                .collect()
        };
        let plain = read("tests/data/records.csv");
        let gz = read("tests/data/records.tsv.gz");
        assert_eq!(plain.len(), 10);
        assert_eq!(plain, gz);
    }

    #[test]
    fn test_missing_input() {
        let result = open_maybe_gz(Path::new("tests/data/does_not_exist.csv"));
        assert_eq!(result.err().map(|e| e.kind()), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn test_summary_csv_contents() {
        use crate::helper::catalog::ReferenceCatalog;
        use crate::helper::resolver::{GroupKeyResolver, UnknownReferencePolicy};
        use crate::helper::tree::AlignmentTree;

        let catalog = ReferenceCatalog::from_paths(
            &["tests/data/ERCC.fasta", "tests/data/Host.fasta"],
            Some(Path::new("tests/data/expected_counts.csv")),
        )
        .unwrap();
        let resolver = GroupKeyResolver::new(&catalog, UnknownReferencePolicy::Fallback);
        let mut tree = AlignmentTree::new();
        for record in record_reader(Path::new("tests/data/records.csv")).unwrap().deserialize() {
            let record: AlignmentRecord = record.unwrap();
            tree.add_record(&record, &resolver).unwrap();
        }
        let summary = tree.summarize(&catalog);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.mapula.summary.csv");
        write_summary_csv(&summary, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        // total, then every group followed by its own references
        let expected_rows = 1 + summary.children.len()
            + summary.children.values().map(|g| g.children.len()).sum::<usize>();
        assert_eq!(rows.len(), expected_rows);
        assert_eq!(&rows[0][column("level")], "total");
        assert_eq!(&rows[0][column("group")], "total");
        assert_eq!(&rows[0][column("alignment_count")], "9");

        let mut index = 1;
        for group in summary.children.values() {
            assert_eq!(&rows[index][column("level")], "group");
            assert_eq!(&rows[index][column("group")], group.group.as_str());
            assert_eq!(&rows[index][column("run_id")], group.run_id.as_str());
            assert_eq!(&rows[index][column("barcode")], group.barcode.as_str());
            index += 1;
            for reference in group.children.values() {
                let row = &rows[index];
                assert_eq!(&row[column("level")], "reference");
                assert_eq!(&row[column("group")], group.group.as_str());
                assert_eq!(Some(&row[column("reference")]), reference.reference.as_deref());
                assert_eq!(&row[column("spearmans_rho")], "");
                assert_eq!(&row[column("spearmans_rho_pvalue")], "");
                assert_eq!(&row[column("n50")], "");
                index += 1;
            }
        }

        // one group's numbers against the JSON summary
        let ercc = &summary.children["ERCC-run1-barcode01"];
        let row = rows
            .iter()
            .find(|row| {
                &row[column("level")] == "group" && &row[column("group")] == "ERCC" && &row[column("run_id")] == "run1"
            })
            .unwrap();
        let number = |name: &str| row[column(name)].parse::<f64>().unwrap();
        assert_eq!(number("alignment_count"), ercc.alignment_count as f64);
        assert_eq!(number("read_count"), ercc.read_count as f64);
        assert_eq!(number("base_pairs"), ercc.base_pairs as f64);
        assert_eq!(number("coverage80_percent"), ercc.coverage80_percent);
        assert_eq!(Some(number("median_accuracy")), ercc.median_accuracy);
        assert_eq!(Some(number("n50") as u64), ercc.n50);
        let correlation = ercc.correlation.as_ref().unwrap();
        assert_eq!(number("spearmans_rho"), correlation.spearmans_rho);
        assert_eq!(Some(number("spearmans_rho_pvalue")), correlation.spearmans_rho_pvalue);
    }
}
