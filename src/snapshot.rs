//! In-memory table snapshots.
//!
//! A [`Snapshot`] is the full row set of one table, read wholesale and written
//! wholesale. Values are kept as [`Scalar`]s; the cleaning rules convert rows
//! into typed records through [`RowView`] and build new snapshots from them.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CleaningCause;

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
}

impl Scalar {
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Integer(_) => "integer",
            Scalar::Decimal(_) => "decimal",
            Scalar::Text(_) => "string",
            Scalar::Date(_) => "date",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("NULL"),
            Scalar::Integer(v) => write!(f, "{v}"),
            Scalar::Decimal(v) => write!(f, "{v}"),
            Scalar::Text(v) => f.write_str(v),
            Scalar::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

impl From<Option<i64>> for Scalar {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Scalar::Null, Scalar::Integer)
    }
}

impl From<Option<Decimal>> for Scalar {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(Scalar::Null, Scalar::Decimal)
    }
}

impl From<Option<String>> for Scalar {
    fn from(value: Option<String>) -> Self {
        value.map_or(Scalar::Null, Scalar::Text)
    }
}

impl From<Option<NaiveDate>> for Scalar {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map_or(Scalar::Null, Scalar::Date)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// Full contents of one table, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl Snapshot {
    pub fn new(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<Vec<Scalar>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn push_row(&mut self, row: Vec<Scalar>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Resolves every required column up front so rules fail before touching any row.
    pub fn require_columns(&self, required: &[&str]) -> Result<ColumnMap, CleaningCause> {
        let mut indices = Vec::with_capacity(required.len());
        for column in required {
            let idx = self
                .column_index(column)
                .ok_or_else(|| CleaningCause::MissingColumn(column.to_string()))?;
            indices.push((column.to_string(), idx));
        }
        Ok(ColumnMap { indices })
    }

    pub fn row_views<'a>(&'a self, map: &'a ColumnMap) -> impl Iterator<Item = RowView<'a>> + 'a {
        self.rows
            .iter()
            .enumerate()
            .map(move |(position, values)| RowView {
                position,
                values,
                map,
            })
    }
}

/// Column-name to position lookup for a snapshot's required columns.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    indices: Vec<(String, usize)>,
}

impl ColumnMap {
    fn index_of(&self, column: &str) -> Option<usize> {
        self.indices
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, idx)| *idx)
    }
}

/// Borrowed view over one row with typed accessors.
pub struct RowView<'a> {
    pub position: usize,
    values: &'a [Scalar],
    map: &'a ColumnMap,
}

impl<'a> RowView<'a> {
    pub fn get(&self, column: &str) -> Result<&'a Scalar, CleaningCause> {
        self.map
            .index_of(column)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| CleaningCause::MissingColumn(column.to_string()))
    }

    fn coercion(column: &str, value: &Scalar, expected: &'static str) -> CleaningCause {
        CleaningCause::TypeCoercion {
            column: column.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    /// Raw textual form of a cell; numbers and dates are rendered, null stays `None`.
    pub fn text(&self, column: &str) -> Result<Option<String>, CleaningCause> {
        Ok(match self.get(column)? {
            Scalar::Null => None,
            other => Some(other.to_string()),
        })
    }

    /// Strict nullable integer cast. Blank text counts as null.
    pub fn integer(&self, column: &str) -> Result<Option<i64>, CleaningCause> {
        let value = self.get(column)?;
        match value {
            Scalar::Null => Ok(None),
            Scalar::Integer(v) => Ok(Some(*v)),
            Scalar::Decimal(d) if d.fract().is_zero() => i64::try_from(*d)
                .map(Some)
                .map_err(|_| Self::coercion(column, value, "integer")),
            Scalar::Text(s) if s.trim().is_empty() => Ok(None),
            Scalar::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| Self::coercion(column, value, "integer")),
            _ => Err(Self::coercion(column, value, "integer")),
        }
    }

    /// Lenient decimal cast: anything non-numeric becomes null.
    pub fn decimal_or_null(&self, column: &str) -> Result<Option<Decimal>, CleaningCause> {
        Ok(match self.get(column)? {
            Scalar::Integer(v) => Some(Decimal::from(*v)),
            Scalar::Decimal(d) => Some(*d),
            Scalar::Text(s) => crate::silver::rules::coerce::parse_decimal(s),
            Scalar::Null | Scalar::Date(_) => None,
        })
    }

    /// Strict date cast: null and blank are `None`, anything unparseable is an error.
    pub fn date(&self, column: &str) -> Result<Option<NaiveDate>, CleaningCause> {
        let value = self.get(column)?;
        match value {
            Scalar::Null => Ok(None),
            Scalar::Date(d) => Ok(Some(*d)),
            Scalar::Text(s) if s.trim().is_empty() => Ok(None),
            Scalar::Text(s) => crate::silver::rules::coerce::parse_date(s)
                .map(Some)
                .ok_or_else(|| Self::coercion(column, value, "date")),
            _ => Err(Self::coercion(column, value, "date")),
        }
    }

    /// Lenient date cast: anything unparseable becomes null.
    pub fn date_or_null(&self, column: &str) -> Result<Option<NaiveDate>, CleaningCause> {
        Ok(match self.get(column)? {
            Scalar::Date(d) => Some(*d),
            Scalar::Text(s) => crate::silver::rules::coerce::parse_date(s),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot::new("t", &["id", "name", "day"]).with_rows(vec![
            vec![Scalar::Integer(1), Scalar::text(" a "), Scalar::text("2024-02-29")],
            vec![Scalar::text("2"), Scalar::Null, Scalar::text("not a date")],
        ])
    }

    #[test]
    fn test_require_columns_reports_first_missing() {
        let snap = sample();
        let err = snap.require_columns(&["id", "missing"]).unwrap_err();
        assert_eq!(err, CleaningCause::MissingColumn("missing".to_string()));
    }

    #[test]
    fn test_typed_accessors() {
        let snap = sample();
        let map = snap.require_columns(&["id", "name", "day"]).unwrap();
        let rows: Vec<RowView> = snap.row_views(&map).collect();

        assert_eq!(rows[0].integer("id").unwrap(), Some(1));
        assert_eq!(rows[1].integer("id").unwrap(), Some(2));
        assert_eq!(rows[0].text("name").unwrap().as_deref(), Some(" a "));
        assert_eq!(rows[1].text("name").unwrap(), None);
        assert_eq!(
            rows[0].date("day").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(rows[1].date("day").is_err());
        assert_eq!(rows[1].date_or_null("day").unwrap(), None);
    }

    #[test]
    fn test_integer_rejects_fractional_text() {
        let snap = Snapshot::new("t", &["id"]).with_rows(vec![vec![Scalar::text("1.5")]]);
        let map = snap.require_columns(&["id"]).unwrap();
        let row = snap.row_views(&map).next().unwrap();
        assert!(matches!(
            row.integer("id"),
            Err(CleaningCause::TypeCoercion { .. })
        ));
    }
}
