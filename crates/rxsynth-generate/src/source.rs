use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::{GenerationError, Result};

/// Whether `file_name` is `<prefix>.csv` or `<prefix>_<digits>.csv`.
pub fn is_shard_of(file_name: &str, prefix: &str) -> bool {
    let Some(stem) = file_name.strip_suffix(".csv") else {
        return false;
    };
    let Some(rest) = stem.strip_prefix(prefix) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }
    rest.strip_prefix('_')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// List shard files for `prefix` in `dir`, in lexical order.
pub fn list_shards(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(name) = name.to_str()
            && is_shard_of(name, prefix)
        {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Upstream dataset read as one logical row stream across its shard files.
#[derive(Debug, Clone)]
pub struct CsvSource {
    dataset: String,
    files: Vec<PathBuf>,
}

impl CsvSource {
    /// Discover the shards of `prefix` under `dir`.
    pub fn discover(dir: &Path, dataset: &str, prefix: &str) -> Result<Self> {
        let files = list_shards(dir, prefix)?;
        if files.is_empty() {
            return Err(GenerationError::MissingReference {
                dataset: dataset.to_string(),
                prefix: prefix.to_string(),
                dir: dir.display().to_string(),
            });
        }
        Ok(Self {
            dataset: dataset.to_string(),
            files,
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Fail unless at least one shard holds a data row.
    pub fn ensure_not_empty(&self) -> Result<()> {
        match self.rows().next() {
            Some(row) => row.map(|_| ()),
            None => Err(GenerationError::EmptyReference {
                dataset: self.dataset.clone(),
            }),
        }
    }

    /// Rows of every shard in order, keyed by header name.
    pub fn rows(&self) -> SourceRows {
        SourceRows {
            pending: self.files.iter().cloned().collect(),
            current: None,
        }
    }
}

struct OpenFile {
    origin: Arc<str>,
    reader: csv::Reader<File>,
    headers: Arc<Vec<String>>,
    line: u64,
}

/// Iterator over the rows of a [`CsvSource`].
pub struct SourceRows {
    pending: VecDeque<PathBuf>,
    current: Option<OpenFile>,
}

impl SourceRows {
    fn open(path: &Path) -> Result<OpenFile> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        let headers = reader
            .headers()?
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        Ok(OpenFile {
            origin: Arc::from(path.display().to_string()),
            reader,
            headers: Arc::new(headers),
            line: 1,
        })
    }
}

impl Iterator for SourceRows {
    type Item = Result<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let path = self.pending.pop_front()?;
                match Self::open(&path) {
                    Ok(file) => self.current = Some(file),
                    Err(err) => return Some(Err(err)),
                }
            }

            let file = self.current.as_mut()?;
            let mut record = csv::StringRecord::new();
            match file.reader.read_record(&mut record) {
                Ok(true) => {
                    file.line += 1;
                    let values = file
                        .headers
                        .iter()
                        .zip(record.iter())
                        .map(|(name, value)| (name.clone(), value.to_string()))
                        .collect();
                    return Some(Ok(SourceRow {
                        origin: Arc::clone(&file.origin),
                        line: file.line,
                        values,
                    }));
                }
                Ok(false) => self.current = None,
                Err(err) => {
                    self.current = None;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

/// One upstream row as a column-to-string mapping.
#[derive(Debug, Clone)]
pub struct SourceRow {
    origin: Arc<str>,
    line: u64,
    values: HashMap<String, String>,
}

impl SourceRow {
    pub fn from_pairs<'a>(origin: &str, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            origin: Arc::from(origin),
            line: 0,
            values: pairs
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    pub fn get(&self, column: &str) -> Result<&str> {
        self.values
            .get(column)
            .map(|value| value.trim())
            .ok_or_else(|| GenerationError::MissingColumn {
                file: self.origin.to_string(),
                column: column.to_string(),
            })
    }

    pub fn parse<T>(&self, column: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.get(column)?;
        raw.parse::<T>().map_err(|err| self.invalid(column, raw, err))
    }

    /// Boolean column; accepts `true/false`, `1/0` and `yes/no`.
    pub fn flag(&self, column: &str) -> Result<bool> {
        let raw = self.get(column)?;
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "t" | "y" => Ok(true),
            "false" | "0" | "no" | "f" | "n" | "" => Ok(false),
            _ => Err(self.invalid(column, raw, "expected a boolean")),
        }
    }

    pub fn invalid(&self, column: &str, value: &str, reason: impl Display) -> GenerationError {
        GenerationError::InvalidField {
            file: self.origin.to_string(),
            line: self.line,
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_names_match_prefix_exactly() {
        assert!(is_shard_of("us_pharmacy_formularies.csv", "us_pharmacy_formularies"));
        assert!(is_shard_of("us_pharmacy_formularies_01.csv", "us_pharmacy_formularies"));
        assert!(!is_shard_of(
            "us_pharmacy_formularies_drugs_01.csv",
            "us_pharmacy_formularies"
        ));
        assert!(!is_shard_of("us_pharmacy_formularies_report.json", "us_pharmacy_formularies"));
        assert!(!is_shard_of("us_pharmacy_formularies_.csv", "us_pharmacy_formularies"));
    }
}
