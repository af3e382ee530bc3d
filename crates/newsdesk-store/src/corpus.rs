//! CSV corpus I/O over Arrow record batches.
//!
//! Raw sources are CSV files of any shape, headered or with caller-supplied
//! column names; every column is read as nullable `Utf8` (empty cells become
//! nulls) and projected down to the configured text and category columns. The curated corpus is always the
//! two-column `text,category` table from [`corpus::corpus_schema`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, LargeStringArray, StringArray};
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use newsdesk_core::{Category, LabeledDocument, corpus};
use tracing::{debug, warn};

use crate::error::StoreError;

const CSV_BATCH_SIZE: usize = 8192;

/// One row of a raw source before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub text: Option<String>,
    pub category: Option<String>,
}

impl RawRow {
    pub fn new(text: Option<&str>, category: Option<&str>) -> Self {
        Self {
            text: text.map(str::to_string),
            category: category.map(str::to_string),
        }
    }
}

/// Which columns of a raw source hold the text and the label.
#[derive(Debug, Clone, Default)]
pub struct SourceColumns {
    /// Joined with a single space (e.g. `title` + `description`).
    pub text: Vec<String>,
    pub category: String,
    /// Raw code → label, for datasets that store numeric class ids. Codes
    /// missing from a non-empty table become missing labels.
    pub label_codes: BTreeMap<String, String>,
    /// Column names for a headerless file. `None` reads names from the
    /// first row.
    pub names: Option<Vec<String>>,
}

impl SourceColumns {
    pub fn new(text: &str, category: &str) -> Self {
        Self {
            text: vec![text.to_string()],
            category: category.to_string(),
            label_codes: BTreeMap::new(),
            names: None,
        }
    }
}

/// Read a headered CSV file as all-`Utf8` record batches.
pub fn read_csv_batches(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    read_csv(path, None)
}

/// Read a headerless CSV file as all-`Utf8` record batches, naming its
/// columns `names` in order.
pub fn read_headerless_csv_batches(
    path: &Path,
    names: &[String],
) -> Result<Vec<RecordBatch>, StoreError> {
    read_csv(path, Some(names))
}

fn read_csv(path: &Path, names: Option<&[String]>) -> Result<Vec<RecordBatch>, StoreError> {
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.to_path_buf()));
    }

    let mut file = File::open(path)?;
    let (columns, has_header) = match names {
        Some(names) => (names.to_vec(), false),
        None => {
            let (inferred, _) = Format::default()
                .with_header(true)
                .infer_schema(&mut file, Some(1))?;
            file.seek(SeekFrom::Start(0))?;
            let columns = inferred
                .fields()
                .iter()
                .map(|f| f.name().to_string())
                .collect();
            (columns, true)
        }
    };

    let schema = Arc::new(corpus::raw_source_schema(&columns));
    let reader = ReaderBuilder::new(schema)
        .with_header(has_header)
        .with_batch_size(CSV_BATCH_SIZE)
        .build(file)?;

    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), batches = batches.len(), has_header, "read csv");
    Ok(batches)
}

/// Load a raw source, projecting it to `(text, category)` rows.
///
/// Text cells are trimmed and internal whitespace runs collapsed; cells
/// that end up empty are treated as missing.
pub fn read_source(path: &Path, columns: &SourceColumns) -> Result<Vec<RawRow>, StoreError> {
    let batches = match &columns.names {
        Some(names) => read_headerless_csv_batches(path, names)?,
        None => read_csv_batches(path)?,
    };
    let mut rows = Vec::new();

    for batch in &batches {
        let text_cols = columns
            .text
            .iter()
            .map(|name| column(batch, path, name))
            .collect::<Result<Vec<_>, _>>()?;
        let category_col = column(batch, path, &columns.category)?;

        for row in 0..batch.num_rows() {
            let parts: Vec<String> = text_cols
                .iter()
                .filter_map(|col| get_string(col.as_ref(), row))
                .collect();
            let text = clean_text(&parts.join(" "));

            let category = get_string(category_col.as_ref(), row)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
                .and_then(|raw| {
                    if columns.label_codes.is_empty() {
                        Some(raw)
                    } else {
                        columns.label_codes.get(&raw).cloned()
                    }
                });

            rows.push(RawRow { text, category });
        }
    }

    Ok(rows)
}

/// Read the curated `text,category` corpus for training.
///
/// Rows with a missing cell are skipped with a warning; a label that names
/// no [`Category`] is an error because curation never writes one.
pub fn read_corpus(path: &Path) -> Result<Vec<LabeledDocument>, StoreError> {
    let batches = read_csv_batches(path)?;
    let mut docs = Vec::new();
    let mut skipped = 0usize;
    let mut row_offset = 0usize;

    for batch in &batches {
        let text_col = column(batch, path, corpus::TEXT_COLUMN)?;
        let category_col = column(batch, path, corpus::CATEGORY_COLUMN)?;

        for row in 0..batch.num_rows() {
            let (Some(text), Some(label)) = (
                get_string(text_col.as_ref(), row),
                get_string(category_col.as_ref(), row),
            ) else {
                skipped += 1;
                continue;
            };
            let category = label
                .parse::<Category>()
                .map_err(|_| StoreError::UnknownCategory {
                    path: path.to_path_buf(),
                    row: row_offset + row,
                    label: label.clone(),
                })?;
            docs.push(LabeledDocument { text, category });
        }
        row_offset += batch.num_rows();
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "corpus rows with missing cells skipped");
    }
    Ok(docs)
}

/// Build the two-column corpus batch.
pub fn corpus_batch(docs: &[LabeledDocument]) -> Result<RecordBatch, StoreError> {
    let texts = StringArray::from_iter_values(docs.iter().map(|d| d.text.as_str()));
    let categories = StringArray::from_iter_values(docs.iter().map(|d| d.category.as_str()));

    Ok(RecordBatch::try_new(
        Arc::new(corpus::corpus_schema()),
        vec![Arc::new(texts), Arc::new(categories)],
    )?)
}

/// Write the curated corpus as CSV.
///
/// The file is written to a temp file in the target directory and renamed
/// into place, so readers see either the old corpus or the new one.
pub fn write_corpus(path: &Path, docs: &[LabeledDocument]) -> Result<(), StoreError> {
    let batch = corpus_batch(docs)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .build(tmp.as_file_mut());
        writer.write(&batch)?;
    }
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    debug!(path = %path.display(), rows = docs.len(), "wrote corpus");
    Ok(())
}

/// Row count per category, in definition order.
pub fn category_counts(docs: &[LabeledDocument]) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for doc in docs {
        *counts.entry(doc.category).or_insert(0) += 1;
    }
    counts
}

fn column<'a>(batch: &'a RecordBatch, path: &Path, name: &str) -> Result<&'a ArrayRef, StoreError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
}

fn clean_text(raw: &str) -> Option<String> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Extract a string value from an Arrow array (handles Utf8 and LargeUtf8).
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn read_source_projects_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "bbc.csv",
            "category,text,extra\nsport,Team wins the cup,1\ntech,  New   phone  launched ,2\n",
        );

        let rows = read_source(&path, &SourceColumns::new("text", "category")).unwrap();
        assert_eq!(
            rows,
            vec![
                RawRow::new(Some("Team wins the cup"), Some("sport")),
                RawRow::new(Some("New phone launched"), Some("tech")),
            ]
        );
    }

    #[test]
    fn read_source_joins_text_columns_and_maps_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "ag.csv",
            "label,title,description\n2,Late goal,Striker scores\n9,Orphan,No label\n1,Shares up,\n",
        );

        let mut columns = SourceColumns::new("title", "label");
        columns.text.push("description".into());
        columns.label_codes =
            BTreeMap::from([("1".to_string(), "Business".to_string()), ("2".into(), "Sports".into())]);

        let rows = read_source(&path, &columns).unwrap();
        assert_eq!(rows[0], RawRow::new(Some("Late goal Striker scores"), Some("Sports")));
        assert_eq!(rows[1].category, None);
        assert_eq!(rows[2], RawRow::new(Some("Shares up"), Some("Business")));
    }

    #[test]
    fn headerless_source_uses_given_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "train.csv",
            "2,\"Late goal\",\"Striker scores\"\n3,\"Shares up\",\"Markets rally\"\n",
        );

        let mut columns = SourceColumns::new("title", "category_id");
        columns.text.push("description".into());
        columns.names = Some(vec!["category_id".into(), "title".into(), "description".into()]);
        columns.label_codes =
            BTreeMap::from([("2".to_string(), "Sports".to_string()), ("3".into(), "Business".into())]);

        let rows = read_source(&path, &columns).unwrap();
        assert_eq!(
            rows,
            vec![
                RawRow::new(Some("Late goal Striker scores"), Some("Sports")),
                RawRow::new(Some("Shares up Markets rally"), Some("Business")),
            ]
        );
    }

    #[test]
    fn headerless_rows_are_not_mistaken_for_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "train.csv", "2,Late goal,Striker scores\n");

        // Read as headered, the only row is consumed as the header.
        let columns = SourceColumns::new("title", "category_id");
        let headered = read_source(&path, &columns).map(|rows| rows.len()).unwrap_or(0);
        assert_eq!(headered, 0);

        let names = ["category_id", "title", "description"].map(String::from);
        let batches = read_headerless_csv_batches(&path, &names).unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 1);
    }

    #[test]
    fn empty_cells_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "gaps.csv", "text,category\n,Sports\nSome text,\n");

        let rows = read_source(&path, &SourceColumns::new("text", "category")).unwrap();
        assert_eq!(rows[0].text, None);
        assert_eq!(rows[1].category, None);
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.csv", "news,label\nhello,Sports\n");

        let err = read_source(&path, &SourceColumns::new("text", "label")).unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn { ref column, .. } if column == "text"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_csv_batches(Path::new("/nonexistent/newsdesk.csv")).unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
    }

    #[test]
    fn corpus_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("corpus.csv");
        let docs = vec![
            LabeledDocument::new("Quoted, \"text\" with comma", Category::Politics),
            LabeledDocument::new("Plain text", Category::Science),
        ];

        write_corpus(&path, &docs).unwrap();
        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("text,category\n"));

        let back = read_corpus(&path).unwrap();
        assert_eq!(back, docs);
    }

    #[test]
    fn read_corpus_rejects_unknown_category() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "c.csv", "text,category\nhello,Sports\nbye,Weather\n");

        let err = read_corpus(&path).unwrap_err();
        assert!(matches!(err, StoreError::UnknownCategory { row: 1, .. }));
    }

    #[test]
    fn counts_by_category() {
        let docs = vec![
            LabeledDocument::new("a", Category::Health),
            LabeledDocument::new("b", Category::Sports),
            LabeledDocument::new("c", Category::Health),
        ];
        let counts = category_counts(&docs);
        assert_eq!(counts[&Category::Health], 2);
        assert_eq!(counts[&Category::Sports], 1);
        assert_eq!(counts.keys().next(), Some(&Category::Sports));
    }
}
