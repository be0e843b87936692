use std::io::BufRead;
use std::path::Path;

use thiserror::Error;

use crate::input::{InputError, open_maybe_gz};

pub const CATALOG_DELIMITER: char = ';';
pub const CATALOG_COLUMNS: [&str; 6] = ["NUM", "NAME", "RAJD", "DECJD", "P0", "DM"];

const COMMENT_MARKERS: [char; 2] = ['#', '@'];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("{origin}: read failed at line {line}: {source}")]
    Read {
        origin: String,
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin}: no header row found")]
    MissingHeader { origin: String },
    #[error("{origin}:{line}: unexpected header '{found}' (expected NUM;NAME;RAJD;DECJD;P0;DM)")]
    BadHeader {
        origin: String,
        line: usize,
        found: String,
    },
    #[error("{origin}:{line}: expected {expected} fields, found {found}")]
    FieldCount {
        origin: String,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("{origin}:{line}: empty source name")]
    EmptyName { origin: String, line: usize },
    #[error("{origin}:{line}: column {column} is not a finite number: '{value}'")]
    BadNumber {
        origin: String,
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("{origin}:{line}: column {column} must be > 0 (found {value})")]
    NonPositive {
        origin: String,
        line: usize,
        column: &'static str,
        value: f64,
    },
}

/// One known source, borrowed from a [`ReferenceCatalog`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnownSource<'a> {
    pub name: &'a str,
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub period_s: f64,
    pub dm: f64,
}

/// Known sources stored column-wise so raters can sweep a single axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceCatalog {
    pub names: Vec<String>,
    pub ras_deg: Vec<f64>,
    pub decs_deg: Vec<f64>,
    pub periods_s: Vec<f64>,
    pub dms: Vec<f64>,
}

impl ReferenceCatalog {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn push(
        &mut self,
        name: impl Into<String>,
        ra_deg: f64,
        dec_deg: f64,
        period_s: f64,
        dm: f64,
    ) {
        self.names.push(name.into());
        self.ras_deg.push(ra_deg);
        self.decs_deg.push(dec_deg);
        self.periods_s.push(period_s);
        self.dms.push(dm);
    }

    pub fn entry(&self, idx: usize) -> Option<KnownSource<'_>> {
        let name = self.names.get(idx)?;
        Some(KnownSource {
            name,
            ra_deg: self.ras_deg[idx],
            dec_deg: self.decs_deg[idx],
            period_s: self.periods_s[idx],
            dm: self.dms[idx],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = KnownSource<'_>> + '_ {
        (0..self.len()).filter_map(|idx| self.entry(idx))
    }

    #[cfg(test)]
    pub fn find(&self, name: &str) -> Option<KnownSource<'_>> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.entry(idx)
    }
}

pub fn load_catalog(path: &Path) -> Result<ReferenceCatalog, CatalogError> {
    let reader = open_maybe_gz(path)?;
    let catalog = parse_catalog(reader, &path.display().to_string())?;
    tracing::info!(
        path = %path.display(),
        n_sources = catalog.len(),
        "loaded reference catalog"
    );
    Ok(catalog)
}

/// Parses a `;`-delimited catalog export.
///
/// The export only writes sources with `P0 > 0` and `DM > 0`; a row breaking
/// that rule means the file is not a conformant export, so it fails the load.
pub fn parse_catalog<R: BufRead>(
    reader: R,
    origin: &str,
) -> Result<ReferenceCatalog, CatalogError> {
    let mut catalog = ReferenceCatalog::default();
    let mut header_seen = false;
    let mut after_header = false;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|source| CatalogError::Read {
            origin: origin.to_string(),
            line: line_no,
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKERS) {
            continue;
        }
        let fields = split_row(trimmed);

        if !header_seen {
            check_header(&fields, origin, line_no, trimmed)?;
            header_seen = true;
            after_header = true;
            continue;
        }

        // Some catalog exports put a units row such as `;;(deg);(deg);(s);(cm^-3 pc);`
        // right under the header.
        if after_header && is_units_row(&fields) {
            tracing::debug!(origin, line = line_no, "skipping catalog units row");
            after_header = false;
            continue;
        }
        after_header = false;

        parse_row(&fields, origin, line_no, &mut catalog)?;
    }

    if !header_seen {
        return Err(CatalogError::MissingHeader {
            origin: origin.to_string(),
        });
    }
    Ok(catalog)
}

fn split_row(line: &str) -> Vec<&str> {
    let body = line.strip_suffix(CATALOG_DELIMITER).unwrap_or(line);
    body.split(CATALOG_DELIMITER).map(str::trim).collect()
}

fn check_header(fields: &[&str], origin: &str, line: usize, raw: &str) -> Result<(), CatalogError> {
    let matches = fields.len() == CATALOG_COLUMNS.len()
        && fields
            .iter()
            .zip(CATALOG_COLUMNS.iter())
            .all(|(f, c)| f.eq_ignore_ascii_case(c));
    if matches {
        Ok(())
    } else {
        Err(CatalogError::BadHeader {
            origin: origin.to_string(),
            line,
            found: raw.to_string(),
        })
    }
}

fn is_units_row(fields: &[&str]) -> bool {
    fields
        .iter()
        .any(|f| f.starts_with('(') && f.ends_with(')'))
        && fields
            .iter()
            .all(|f| f.is_empty() || (f.starts_with('(') && f.ends_with(')')))
}

fn parse_row(
    fields: &[&str],
    origin: &str,
    line: usize,
    catalog: &mut ReferenceCatalog,
) -> Result<(), CatalogError> {
    if fields.len() != CATALOG_COLUMNS.len() {
        return Err(CatalogError::FieldCount {
            origin: origin.to_string(),
            line,
            expected: CATALOG_COLUMNS.len(),
            found: fields.len(),
        });
    }
    let name = fields[1];
    if name.is_empty() {
        return Err(CatalogError::EmptyName {
            origin: origin.to_string(),
            line,
        });
    }
    let ra = parse_number(fields[2], "RAJD", origin, line)?;
    let dec = parse_number(fields[3], "DECJD", origin, line)?;
    let period = parse_positive(fields[4], "P0", origin, line)?;
    let dm = parse_positive(fields[5], "DM", origin, line)?;
    catalog.push(name, ra, dec, period, dm);
    Ok(())
}

fn parse_number(
    raw: &str,
    column: &'static str,
    origin: &str,
    line: usize,
) -> Result<f64, CatalogError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CatalogError::BadNumber {
            origin: origin.to_string(),
            line,
            column,
            value: raw.to_string(),
        }),
    }
}

fn parse_positive(
    raw: &str,
    column: &'static str,
    origin: &str,
    line: usize,
) -> Result<f64, CatalogError> {
    let value = parse_number(raw, column, origin, line)?;
    if value <= 0.0 {
        return Err(CatalogError::NonPositive {
            origin: origin.to_string(),
            line,
            column,
            value,
        });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/catalog.rs"]
mod tests;
