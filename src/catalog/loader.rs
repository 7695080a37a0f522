use super::{Catalog, CatalogError, Field, Result};
use crate::Star;
use bzip2::bufread::BzDecoder;
use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
    str::FromStr,
    time::Instant,
};
use strum::IntoEnumIterator;

/// Column number and label of a header line, once the comment marker is stripped
static HEADER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s+(\S+)").unwrap());

/// Detection catalog loader
///
/// The catalog must be saved with a column-label header, one comment line per column:
/// ```text
/// #   2 X_IMAGE                Object position along x                 [pixel]
/// ```
pub struct CatalogLoader {
    path: PathBuf,
    comment_marker: String,
    labels: BTreeMap<Field, String>,
}
impl Default for CatalogLoader {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sextractor.cat"),
            comment_marker: String::from("#"),
            labels: Field::iter()
                .map(|field| (field, field.default_label().to_string()))
                .collect(),
        }
    }
}
impl CatalogLoader {
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..self
        }
    }
    /// Prefix of the header lines
    pub fn comment_marker<S: Into<String>>(self, marker: S) -> Self {
        Self {
            comment_marker: marker.into(),
            ..self
        }
    }
    /// Sets the column label a field is read from
    pub fn column_label<S: Into<String>>(mut self, field: Field, label: S) -> Self {
        self.labels.insert(field, label.into());
        self
    }
    /// Loads the catalog
    pub fn load(self) -> Result<Catalog> {
        log::info!("Loading {:?}...", self.path);
        let now = Instant::now();
        let contents = read_contents(&self.path)?;

        let mut header = BTreeMap::<String, usize>::new();
        let mut rows = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix(self.comment_marker.as_str()) {
                if let Some(capts) = HEADER_REGEX.captures(comment) {
                    let ordinal: usize = capts[1].parse().map_err(|_| CatalogError::Row {
                        path: self.path.clone(),
                        line: i + 1,
                        reason: format!("invalid column number {:?}", &capts[1]),
                    })?;
                    header.insert(capts[2].to_string(), ordinal);
                }
                continue;
            }
            rows.push((i + 1, line));
        }
        if header.is_empty() {
            return Err(CatalogError::NoHeader { path: self.path });
        }

        let mut columns = BTreeMap::<Field, usize>::new();
        for (field, label) in &self.labels {
            match header.get(label) {
                Some(&ordinal) if ordinal > 0 => {
                    log::debug!("{} ({}) in column #{}", field, label, ordinal);
                    columns.insert(*field, ordinal - 1);
                }
                _ => {
                    return Err(CatalogError::MissingColumn {
                        path: self.path,
                        label: label.clone(),
                    })
                }
            }
        }

        let mut stars = Vec::with_capacity(rows.len());
        for (line, row) in rows {
            let star = RowParser {
                path: &self.path,
                line,
                cells: row.split_whitespace().collect(),
                columns: &columns,
            }
            .star()?;
            stars.push(star);
        }
        log::info!(
            "... loaded {} stars in {:}ms",
            stars.len(),
            now.elapsed().as_millis()
        );
        Ok(Catalog {
            path: Some(self.path),
            stars,
        })
    }
}

/// Reads the catalog, decompressing `.gz` and `.bz2` files
///
/// A file that cannot be opened or read is [CatalogError::Missing], contents that are not
/// valid UTF-8 or a broken compressed stream are [CatalogError::Corrupt].
fn read_contents(path: &Path) -> Result<String> {
    let missing = |source| CatalogError::Missing {
        path: path.to_path_buf(),
        source,
    };
    let corrupt = |source| CatalogError::Corrupt {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(missing)?;
    let mut contents = String::new();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("gz") => GzDecoder::new(file)
            .read_to_string(&mut contents)
            .map_err(corrupt)?,
        Some("bz2") => BzDecoder::new(BufReader::new(file))
            .read_to_string(&mut contents)
            .map_err(corrupt)?,
        _ => BufReader::new(file)
            .read_to_string(&mut contents)
            .map_err(|e| match e.kind() {
                io::ErrorKind::InvalidData => corrupt(e),
                _ => missing(e),
            })?,
    };
    Ok(contents)
}

/// One data row of the catalog
struct RowParser<'a> {
    path: &'a Path,
    line: usize,
    cells: Vec<&'a str>,
    columns: &'a BTreeMap<Field, usize>,
}
impl<'a> RowParser<'a> {
    fn error(&self, reason: String) -> CatalogError {
        CatalogError::Row {
            path: self.path.to_path_buf(),
            line: self.line,
            reason,
        }
    }
    fn cell<T: FromStr>(&self, field: Field) -> Result<T> {
        let index = self.columns.get(&field).copied().unwrap_or(usize::MAX);
        let cell = self.cells.get(index).ok_or_else(|| {
            self.error(format!(
                "{} values, the {} is expected in column #{}",
                self.cells.len(),
                field,
                index.saturating_add(1)
            ))
        })?;
        cell.parse()
            .map_err(|_| self.error(format!("{:?} is not a valid {}", cell, field)))
    }
    fn star(&self) -> Result<Star> {
        let area: f64 = self.cell(Field::Area)?;
        if area.fract() != 0. || !(0f64..=u32::MAX as f64).contains(&area) {
            return Err(self.error(format!("{} is not a valid {}", area, Field::Area)));
        }
        let flags: i64 = self.cell(Field::Flags)?;
        let flux: f64 = self.cell(Field::Flux)?;
        let flux_error: f64 = self.cell(Field::FluxError)?;
        let flux_radius: f64 = self.cell(Field::FluxRadius)?;
        Ok(Star::new(
            self.cell(Field::X)?,
            self.cell(Field::Y)?,
            self.cell(Field::Alpha)?,
            self.cell(Field::Delta)?,
            area as u32,
            self.cell(Field::Magnitude)?,
            Catalog::flag_saturated(flags).map_err(|e| self.error(e.to_string()))?,
            flux / flux_error,
            2. * flux_radius,
            self.cell(Field::Elongation)?,
        ))
    }
}
