use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use encoding_rs::Encoding;
use log::{debug, info, warn};

use crate::error::InputError;
use crate::model::Source;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Read `path` into Sources: one per sheet for spreadsheets, one for a flat file.
pub fn read_sources(path: &Path, separator: u8, encoding: &'static Encoding) -> Result<Vec<Source>, InputError> {
    let metadata = fs::metadata(path).map_err(|_| InputError::NotAFile(path.to_path_buf()))?;
    if !metadata.is_file() {
        return Err(InputError::NotAFile(path.to_path_buf()));
    }
    if is_spreadsheet(path) {
        read_workbook(path, separator)
    } else {
        let bytes = fs::read(path).map_err(|source| InputError::Io { path: path.to_path_buf(), source })?;
        let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "output".to_string());
        Ok(vec![Source::new(name, decode_rows(&bytes, encoding))])
    }
}

pub fn decode_rows(bytes: &[u8], encoding: &'static Encoding) -> Vec<String> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!("Input contains bytes that are not valid {}; they were replaced", used.name());
    }
    text.lines().filter(|line| !line.trim().is_empty()).map(str::to_string).collect()
}

pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn join_cells(cells: &[Data], separator: u8) -> Result<String, InputError> {
    let mut writer = csv::WriterBuilder::new().delimiter(separator).terminator(csv::Terminator::Any(b'\n')).from_writer(Vec::new());
    writer.write_record(cells.iter().map(cell_to_string))?;
    let bytes = writer.into_inner().map_err(|e| InputError::Row(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).trim_end_matches('\n').to_string())
}

fn sheet_source(sheet_name: String, range: Result<Range<Data>, calamine::Error>, separator: u8) -> Result<Source, InputError> {
    let range = match range {
        Ok(range) => range,
        Err(e) => {
            warn!("Sheet '{}' could not be read: {}", sheet_name, e);
            return Ok(Source::unreadable(sheet_name, e.to_string()));
        }
    };
    let mut rows = Vec::with_capacity(range.height());
    for cells in range.rows() {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        rows.push(join_cells(cells, separator)?);
    }
    debug!("Sheet '{}': {} rows", sheet_name, rows.len());
    Ok(Source::new(sheet_name, rows))
}

fn read_workbook(path: &Path, separator: u8) -> Result<Vec<Source>, InputError> {
    let spreadsheet_err = |source| InputError::Spreadsheet { path: path.to_path_buf(), source };
    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_err)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    info!("{}: {} sheets", path.display(), sheet_names.len());
    sheet_names
        .into_iter()
        .map(|sheet_name| {
            let range = workbook.worksheet_range(&sheet_name);
            sheet_source(sheet_name, range, separator)
        })
        .collect()
}
