use log::{debug, warn};

use crate::error::ColumnResolutionError;
use crate::model::HeaderIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub postal_code: String,
    pub house_number: String,
    pub addition: Option<String>,
}

/// Split one raw row on `separator` and trim every field. Quoted fields are honoured.
pub fn split_row(row: &str, separator: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(false)
        .flexible(true)
        .from_reader(row.as_bytes());
    let plain = || row.split(separator as char).map(|field| field.trim().to_string()).collect::<Vec<_>>();
    match reader.records().next() {
        Some(Ok(record)) => {
            let fields: Vec<String> = record.iter().map(|field| field.trim().to_string()).collect();
            let unquoted = plain();
            // an unbalanced quote swallows the rest of the row
            if fields.len() < unquoted.len() && row.matches('"').count() % 2 == 1 {
                debug!("Unbalanced quote in row {:?}; using plain split", row);
                return unquoted;
            }
            fields
        }
        Some(Err(e)) => {
            debug!("Falling back to plain split for row {:?}: {}", row, e);
            plain()
        }
        None => Vec::new(),
    }
}

fn position(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|cell| cell.trim() == name)
}

pub fn resolve(source_name: &str, header: &[String], names: &ColumnNames) -> Result<HeaderIndex, ColumnResolutionError> {
    let missing = |column: &str| ColumnResolutionError { source_name: source_name.to_string(), column: column.to_string() };
    let postal_code = position(header, &names.postal_code).ok_or_else(|| missing(&names.postal_code))?;
    let house_number = position(header, &names.house_number).ok_or_else(|| missing(&names.house_number))?;
    let addition = names.addition.as_deref().and_then(|name| {
        let found = position(header, name);
        if found.is_none() {
            warn!("Source '{}': optional addition column '{}' not found, continuing without it", source_name, name);
        }
        found
    });
    debug!("Source '{}': {} -> {}, {} -> {}", source_name, names.postal_code, postal_code, names.house_number, house_number);
    Ok(HeaderIndex { postal_code, house_number, addition })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(pc: &str, nr: &str) -> ColumnNames {
        ColumnNames { postal_code: pc.into(), house_number: nr.into(), addition: None }
    }

    #[test]
    fn resolves_trimmed_header_cells() {
        let header = split_row(" id , pc ,nr ", b',');
        assert_eq!(header, vec!["id", "pc", "nr"]);
        let index = resolve("s", &header, &names("pc", "nr")).unwrap();
        assert_eq!(index, HeaderIndex { postal_code: 1, house_number: 2, addition: None });
        assert_eq!(index.required_width(), 3);
    }

    #[test]
    fn column_zero_resolves() {
        let header = split_row("pc;nr", b';');
        let index = resolve("s", &header, &names("pc", "nr")).unwrap();
        assert_eq!(index.postal_code, 0);
        assert_eq!(index.house_number, 1);
    }

    #[test]
    fn first_duplicate_wins() {
        let header = split_row("nr,pc,nr,pc", b',');
        let index = resolve("s", &header, &names("pc", "nr")).unwrap();
        assert_eq!(index.postal_code, 1);
        assert_eq!(index.house_number, 0);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let header = split_row("PC,nr", b',');
        let err = resolve("sheet2", &header, &names("pc", "nr")).unwrap_err();
        assert_eq!(err.column, "pc");
        assert_eq!(err.source_name, "sheet2");
    }

    #[test]
    fn missing_optional_addition_is_tolerated() {
        let header = split_row("pc,nr", b',');
        let mut wanted = names("pc", "nr");
        wanted.addition = Some("toevoeging".into());
        let index = resolve("s", &header, &wanted).unwrap();
        assert_eq!(index.addition, None);
    }

    #[test]
    fn quoted_fields_keep_separator() {
        let fields = split_row("\"Main St, 3\",1234AB,3", b',');
        assert_eq!(fields, vec!["Main St, 3", "1234AB", "3"]);
    }

    #[test]
    fn unbalanced_quote_splits_plainly() {
        let fields = split_row("\"Laan 5,1234AB,12", b',');
        assert_eq!(fields, vec!["\"Laan 5", "1234AB", "12"]);
        let escaped = split_row("\"Laan \"\"5\"\", 3\",1234AB,12", b',');
        assert_eq!(escaped, vec!["Laan \"5\", 3", "1234AB", "12"]);
    }
}
