use std::fmt;

pub const KEY_COLUMN: &str = "invoer";

pub const OUTPUT_SEPARATOR: &str = ";";

// A spreadsheet tab or a whole flat file. Row 0 is the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub rows: Vec<String>,
    pub unreadable: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>, rows: Vec<String>) -> Self {
        Self { name: name.into(), rows, unreadable: None }
    }

    pub fn unreadable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { name: name.into(), rows: Vec::new(), unreadable: Some(reason.into()) }
    }

    pub fn header(&self) -> Option<&str> {
        self.rows.first().map(String::as_str)
    }

    pub fn data_rows(&self) -> &[String] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderIndex {
    pub postal_code: usize,
    pub house_number: usize,
    pub addition: Option<usize>,
}

impl HeaderIndex {
    pub fn required_width(&self) -> usize {
        self.postal_code.max(self.house_number) + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub postal_code: String,
    pub house_number: Option<i32>,
    pub addition: Option<String>,
}

impl LookupKey {
    pub fn is_queryable(&self) -> bool {
        !self.postal_code.is_empty() && self.house_number.is_some_and(|n| n > 0)
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.house_number {
            Some(n) => write!(f, "{}-{}", self.postal_code, n),
            None => write!(f, "{}-", self.postal_code),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchRecord {
    fields: Vec<(String, String)>,
}

impl MatchRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total_rows: usize,
    pub processed: usize,
    pub invalid: usize,
    pub not_found: usize,
    pub matched: usize,
    // already counted in not_found
    pub lookup_failures: usize,
    pub shape_mismatches: usize,
    pub output_rows: usize,
}

impl RunStats {
    pub fn is_consistent(&self) -> bool {
        self.processed == self.invalid + self.not_found + self.matched
            && self.processed <= self.total_rows
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} processed, {} matched, {} not found ({} lookup failures), {} invalid, {} output rows",
            self.processed, self.total_rows, self.matched, self.not_found, self.lookup_failures, self.invalid, self.output_rows
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTable {
    pub lines: Vec<String>,
}

impl OutputTable {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn header(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    pub fn data_lines(&self) -> &[String] {
        self.lines.get(1..).unwrap_or(&[])
    }
}
