//! Delimited-table model and the comparison used to judge candidates.
//!
//! Tables are kept as raw text cells; column types are inferred from the
//! cells so that two tables produced by different pipelines can be compared
//! both strictly (types must match) and leniently (types ignored).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};

/// Inferred storage class of a column.
///
/// A column is numeric when every non-empty cell parses as a float; an empty
/// cell is the missing-value marker and never disqualifies the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Text,
}

impl ColumnType {
    fn as_str(self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
        }
    }
}

/// A parsed delimited table: header plus row-major cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse comma-delimited text with RFC 4180 quoting.
    ///
    /// Every row must have the same width as the header; blank lines are
    /// skipped.
    pub fn parse(input: &str) -> Result<Table> {
        let mut records = parse_records(input)?;
        if records.is_empty() {
            bail!("table is empty (no header row)");
        }
        let header = records.remove(0);
        for (idx, row) in records.iter().enumerate() {
            if row.len() != header.len() {
                bail!(
                    "row {} has {} cells, expected {} (columns: {})",
                    idx + 1,
                    row.len(),
                    header.len(),
                    header.join(", ")
                );
            }
        }
        Ok(Table {
            header,
            rows: records,
        })
    }

    /// Read and parse a table file.
    pub fn load(path: &Path) -> Result<Table> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read table {}", path.display()))?;
        Table::parse(&contents).with_context(|| format!("parse table {}", path.display()))
    }

    /// Infer the type of each column from its cells.
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.header.len())
            .map(|col| {
                let numeric = self
                    .rows
                    .iter()
                    .all(|row| parse_number(&row[col]).is_some() || is_missing(&row[col]));
                if numeric {
                    ColumnType::Numeric
                } else {
                    ColumnType::Text
                }
            })
            .collect()
    }
}

/// First difference under strict equality: values, column order, and column
/// types must all match. Numeric columns compare as parsed numbers, text
/// columns as exact strings.
pub fn diff_strict(result: &Table, reference: &Table) -> Option<String> {
    if let Some(diff) = diff_shape(result, reference) {
        return Some(diff);
    }
    let result_types = result.column_types();
    let reference_types = reference.column_types();
    for (col, name) in reference.header.iter().enumerate() {
        if result_types[col] != reference_types[col] {
            return Some(format!(
                "column '{name}' is {} in the candidate output but {} in the reference",
                result_types[col].as_str(),
                reference_types[col].as_str()
            ));
        }
    }
    for (row_idx, (result_row, reference_row)) in result.rows.iter().zip(&reference.rows).enumerate()
    {
        for (col, name) in reference.header.iter().enumerate() {
            let equal = match reference_types[col] {
                ColumnType::Numeric => numeric_eq(&result_row[col], &reference_row[col]),
                ColumnType::Text => result_row[col] == reference_row[col],
            };
            if !equal {
                return Some(cell_diff(row_idx, name, &result_row[col], &reference_row[col]));
            }
        }
    }
    None
}

/// First difference ignoring column types: cells that both parse as numbers
/// compare numerically, anything else compares as trimmed text.
pub fn diff_lenient(result: &Table, reference: &Table) -> Option<String> {
    if let Some(diff) = diff_shape(result, reference) {
        return Some(diff);
    }
    for (row_idx, (result_row, reference_row)) in result.rows.iter().zip(&reference.rows).enumerate()
    {
        for (col, name) in reference.header.iter().enumerate() {
            if !lenient_cell_eq(&result_row[col], &reference_row[col]) {
                return Some(cell_diff(row_idx, name, &result_row[col], &reference_row[col]));
            }
        }
    }
    None
}

fn diff_shape(result: &Table, reference: &Table) -> Option<String> {
    if result.header != reference.header {
        return Some(format!(
            "column mismatch: candidate produced [{}], reference has [{}]",
            result.header.join(", "),
            reference.header.join(", ")
        ));
    }
    if result.rows.len() != reference.rows.len() {
        return Some(format!(
            "row count mismatch: candidate produced {} rows, reference has {}",
            result.rows.len(),
            reference.rows.len()
        ));
    }
    None
}

fn cell_diff(row_idx: usize, column: &str, result: &str, reference: &str) -> String {
    format!(
        "row {}, column '{column}': candidate {result:?} != reference {reference:?}",
        row_idx + 1
    )
}

fn is_missing(cell: &str) -> bool {
    cell.trim().is_empty()
}

fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn numeric_eq(result: &str, reference: &str) -> bool {
    match (parse_number(result), parse_number(reference)) {
        (Some(a), Some(b)) => a == b,
        (None, None) => is_missing(result) == is_missing(reference),
        _ => false,
    }
}

fn lenient_cell_eq(result: &str, reference: &str) -> bool {
    if is_missing(result) && is_missing(reference) {
        return true;
    }
    if let (Some(a), Some(b)) = (parse_number(result), parse_number(reference)) {
        return a == b;
    }
    result.trim() == reference.trim()
}

fn parse_records(input: &str) -> Result<Vec<Vec<String>>> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                if record.is_empty() && field.is_empty() {
                    continue; // blank line
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(anyhow!("unterminated quoted field"));
    }
    if !record.is_empty() || !field.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(input: &str) -> Table {
        Table::parse(input).expect("parse table")
    }

    #[test]
    fn parse_handles_quotes_and_missing_cells() {
        let parsed = table("Date,Description,Debit Amt\n01-08-2024,\"IMPS, UPI Payment\",100.5\n02-08-2024,\"Cheque \"\"42\"\"\",\n");
        assert_eq!(parsed.header, vec!["Date", "Description", "Debit Amt"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0][1], "IMPS, UPI Payment");
        assert_eq!(parsed.rows[1][1], "Cheque \"42\"");
        assert_eq!(parsed.rows[1][2], "");
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        let err = Table::parse("a,b\n1,2,3\n").unwrap_err();
        assert!(err.to_string().contains("row 1 has 3 cells, expected 2"));
    }

    #[test]
    fn parse_rejects_empty_input() {
        assert!(Table::parse("").is_err());
    }

    #[test]
    fn column_types_treat_empty_cells_as_missing_values() {
        let parsed = table("Debit Amt,Description\n100.5,salary\n,transfer\n");
        assert_eq!(
            parsed.column_types(),
            vec![ColumnType::Numeric, ColumnType::Text]
        );
    }

    #[test]
    fn strict_accepts_numerically_equal_formatting() {
        let result = table("Balance\n1935.3\n");
        let reference = table("Balance\n1935.30\n");
        assert_eq!(diff_strict(&result, &reference), None);
    }

    #[test]
    fn strict_reports_column_order_differences() {
        let result = table("Description,Date\nsalary,01-08-2024\n");
        let reference = table("Date,Description\n01-08-2024,salary\n");
        let diff = diff_strict(&result, &reference).expect("diff");
        assert!(diff.contains("column mismatch"));
        assert!(diff_lenient(&result, &reference).is_some());
    }

    #[test]
    fn strict_reports_value_differences() {
        let result = table("Date,Balance\n01-08-2024,100.0\n");
        let reference = table("Date,Balance\n01-08-2024,101.0\n");
        let diff = diff_strict(&result, &reference).expect("diff");
        assert!(diff.contains("column 'Balance'"));
        assert!(diff_lenient(&result, &reference).is_some());
    }

    #[test]
    fn strict_reports_row_count_differences() {
        let result = table("Balance\n1.0\n");
        let reference = table("Balance\n1.0\n2.0\n");
        let diff = diff_strict(&result, &reference).expect("diff");
        assert!(diff.contains("row count mismatch"));
    }

    /// Values match but one side fails numeric inference for the column:
    /// strict fails on the raw text, the type-lenient pass accepts it.
    #[test]
    fn lenient_accepts_equal_values_with_different_column_types() {
        let result = table("Debit Amt\n100\nn/a\n");
        let reference = table("Debit Amt\n100.0\nn/a\n");
        assert!(diff_strict(&result, &reference).is_some());
        assert_eq!(diff_lenient(&result, &reference), None);
    }

    #[test]
    fn lenient_still_rejects_value_differences() {
        let result = table("Debit Amt\n100\nn/a\n");
        let reference = table("Debit Amt\n200.0\nn/a\n");
        let diff = diff_lenient(&result, &reference).expect("diff");
        assert!(diff.contains("row 1"));
    }

    #[test]
    fn missing_cells_compare_equal_in_numeric_columns() {
        let result = table("Credit Amt\n\n1935.3\n");
        let reference = table("Credit Amt\n\n1935.3\n");
        assert_eq!(diff_strict(&result, &reference), None);
    }
}
