//! NormalizedSeries, the pipeline's output artifact.

use super::row::{CanonicalRow, Field};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Optional vendor fields that were present in the input table.
///
/// Their columns appear in the output only when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalFields {
    pub amount: bool,
    pub adjclose: bool,
}

impl OptionalFields {
    pub fn contains(&self, field: Field) -> bool {
        match field {
            Field::Amount => self.amount,
            Field::AdjClose => self.adjclose,
            _ => true,
        }
    }
}

/// Date-ordered, duplicate-free rows for one symbol.
///
/// Built once per pipeline invocation and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    symbol: String,
    fields: OptionalFields,
    rows: Vec<CanonicalRow>,
    rebased: bool,
}

impl NormalizedSeries {
    pub(crate) fn new(
        symbol: impl Into<String>,
        fields: OptionalFields,
        rows: Vec<CanonicalRow>,
        rebased: bool,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            fields,
            rows,
            rebased,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fields(&self) -> OptionalFields {
        self.fields
    }

    /// False when no reference close could be established; such a series
    /// is not comparable across symbols.
    pub fn is_rebased(&self) -> bool {
        self.rebased
    }

    /// Row for a given date, if any.
    pub fn row(&self, date: NaiveDate) -> Option<&CanonicalRow> {
        self.rows
            .binary_search_by(|r| match r.date {
                Some(d) => d.cmp(&date),
                None => std::cmp::Ordering::Greater,
            })
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Values of one field in row order.
    pub fn column(&self, field: Field) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(field)).collect()
    }

    /// Output fields in column order, skipping absent optional fields.
    pub fn output_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.fields.contains(*f))
            .collect()
    }

    /// Convert to a Polars DataFrame with canonical column names.
    ///
    /// `date` is a polars `Date`; `symbol` is prepended when requested.
    pub fn to_dataframe(&self, include_symbol: bool) -> PolarsResult<DataFrame> {
        let epoch = NaiveDate::default();
        let dates: Vec<Option<i32>> = self
            .rows
            .iter()
            .map(|r| r.date.map(|d| (d - epoch).num_days() as i32))
            .collect();

        let mut columns = Vec::with_capacity(Field::ALL.len() + 2);
        if include_symbol {
            let symbols: Vec<&str> = vec![self.symbol.as_str(); self.rows.len()];
            columns.push(Column::new("symbol".into(), symbols));
        }
        columns.push(Column::new("date".into(), dates).cast(&DataType::Date)?);
        for field in self.output_fields() {
            columns.push(Column::new(field.name().into(), self.column(field)));
        }

        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series(fields: OptionalFields) -> NormalizedSeries {
        let mut first = CanonicalRow::placeholder(d(2));
        first.close = Some(1.0);
        first.volume = Some(1_000.0);
        NormalizedSeries::new(
            "600000.SH",
            fields,
            vec![first, CanonicalRow::placeholder(d(3))],
            true,
        )
    }

    #[test]
    fn row_lookup_by_date() {
        let s = series(OptionalFields::default());
        assert_eq!(s.row(d(2)).and_then(|r| r.close), Some(1.0));
        assert!(s.row(d(3)).is_some_and(|r| r.is_void()));
        assert!(s.row(d(9)).is_none());
    }

    #[test]
    fn dataframe_omits_absent_optional_columns() {
        let df = series(OptionalFields::default()).to_dataframe(false).unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["date", "open", "high", "low", "close", "volume", "change", "factor"]
        );
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn dataframe_includes_symbol_and_optional_columns() {
        let fields = OptionalFields {
            amount: true,
            adjclose: true,
        };
        let df = series(fields).to_dataframe(true).unwrap();
        assert_eq!(df.width(), 11);
        assert!(df.get_column_index("symbol").is_some());
        assert!(df.get_column_index("amount").is_some());
        assert!(df.get_column_index("adjclose").is_some());
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    }
}
