/// Arrow schema for the curated training corpus.
pub mod corpus {
    use arrow::datatypes::{DataType, Field, Schema};

    pub const TEXT_COLUMN: &str = "text";
    pub const CATEGORY_COLUMN: &str = "category";

    /// Two-column `(text, category)` table written by curation and read by
    /// training.
    pub fn corpus_schema() -> Schema {
        Schema::new(vec![
            Field::new(TEXT_COLUMN, DataType::Utf8, false),
            Field::new(CATEGORY_COLUMN, DataType::Utf8, false),
        ])
    }

    /// All-`Utf8` schema for an arbitrary headered source file, so numeric
    /// label codes and free text are read without type inference.
    pub fn raw_source_schema<S: AsRef<str>>(columns: &[S]) -> Schema {
        Schema::new(
            columns
                .iter()
                .map(|c| Field::new(c.as_ref(), DataType::Utf8, true))
                .collect::<Vec<_>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::corpus;

    #[test]
    fn corpus_schema_has_expected_fields() {
        let schema = corpus::corpus_schema();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field(0).name(), "text");
        assert_eq!(schema.field(1).name(), "category");
    }

    #[test]
    fn raw_source_schema_is_nullable_utf8() {
        let schema = corpus::raw_source_schema(&["label", "title", "description"]);
        assert_eq!(schema.fields().len(), 3);
        assert!(schema.fields().iter().all(|f| f.is_nullable()));
        assert!(schema.field_with_name("title").is_ok());
    }
}
