use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use log::{debug, info, warn};

use crate::error::SinkError;
use crate::model::OutputTable;

pub const RECORD_SEPARATOR: &str = "\r\n";

#[derive(Debug, Clone)]
pub struct SinkWriter {
    out_dir: PathBuf,
    extension: String,
    encoding: &'static Encoding,
}

fn file_stem_for(source_name: &str) -> String {
    let cleaned: String = source_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "output".to_string()
    } else {
        cleaned.to_string()
    }
}

impl SinkWriter {
    pub fn new(out_dir: impl Into<PathBuf>, extension: impl Into<String>, encoding: &'static Encoding) -> Self {
        Self { out_dir: out_dir.into(), extension: extension.into(), encoding }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn path_for(&self, source_name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.{}", file_stem_for(source_name), self.extension))
    }

    /// Write `table` for `source_name`. Returns `None` without touching disk when the table is empty.
    pub fn write(&self, source_name: &str, table: &OutputTable) -> Result<Option<PathBuf>, SinkError> {
        if table.is_empty() {
            debug!("{}: nothing matched, no output file", source_name);
            return Ok(None);
        }
        fs::create_dir_all(&self.out_dir).map_err(|source| SinkError::CreateDir { path: self.out_dir.clone(), source })?;
        let path = self.path_for(source_name);
        let text = table.lines.join(RECORD_SEPARATOR);
        let (bytes, used, had_unmappable) = self.encoding.encode(&text);
        if had_unmappable {
            warn!("{}: some characters cannot be represented in {} and were replaced", path.display(), used.name());
        }
        fs::write(&path, &bytes).map_err(|source| SinkError::Write { path: path.clone(), source })?;
        info!("Wrote {} lines to {}", table.lines.len(), path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table(lines: &[&str]) -> OutputTable {
        OutputTable { lines: lines.iter().map(|l| l.to_string()).collect() }
    }

    #[test]
    fn writes_crlf_separated_file_in_new_dir() {
        let dir = tempdir().unwrap();
        let sink = SinkWriter::new(dir.path().join("out"), "csv", encoding_rs::UTF_8);
        let path = sink.write("Blad1", &table(&["invoer;postcode", "1234AB-1;1234AB"])).unwrap().unwrap();
        assert_eq!(path, dir.path().join("out").join("Blad1.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "invoer;postcode\r\n1234AB-1;1234AB");
    }

    #[test]
    fn empty_table_writes_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let sink = SinkWriter::new(&out, "csv", encoding_rs::UTF_8);
        assert_eq!(sink.write("empty", &OutputTable::default()).unwrap(), None);
        assert!(!out.exists());
    }

    #[test]
    fn encodes_latin1() {
        let dir = tempdir().unwrap();
        let latin1 = Encoding::for_label(b"latin1").unwrap();
        let sink = SinkWriter::new(dir.path(), "txt", latin1);
        let path = sink.write("s", &table(&["straat", "Café"])).unwrap().unwrap();
        assert_eq!(fs::read(path).unwrap(), b"straat\r\nCaf\xe9".to_vec());
    }

    #[test]
    fn unsafe_source_names_are_cleaned() {
        let sink = SinkWriter::new("out", "csv", encoding_rs::UTF_8);
        assert_eq!(sink.path_for("a/b:c"), Path::new("out").join("a_b_c.csv"));
        assert_eq!(sink.path_for(".."), Path::new("out").join("output.csv"));
    }
}
