use groupset_error::{DbError, Result};

use crate::element::ResolutionKeys;

/// A single materialized column of the select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    pub alias: Option<String>,
    pub name: Option<String>,
    pub text: String,
    pub is_column_ref: bool,
    /// Index of the column in the result row layout.
    pub column_index: usize,
}

impl SelectColumn {
    /// Plain column reference, `SELECT a`.
    pub fn column(name: impl Into<String>, column_index: usize) -> Self {
        let name = name.into();
        SelectColumn {
            alias: None,
            name: Some(name.clone()),
            text: name,
            is_column_ref: true,
            column_index,
        }
    }

    /// Computed expression, `SELECT a + b`.
    pub fn expr(text: impl Into<String>, column_index: usize) -> Self {
        SelectColumn {
            alias: None,
            name: None,
            text: text.into(),
            is_column_ref: false,
            column_index,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl ResolutionKeys for SelectColumn {
    fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn is_column_ref(&self) -> bool {
        self.is_column_ref
    }
}

/// Select list columns along with the boundaries between user visible columns
/// and columns appended to support GROUP BY/HAVING.
///
/// Layout:
///
/// ```text
/// [0, visible_count)             visible to the user
/// [visible_count, having_start)  hidden, registered for resolution
/// [having_start, len)            HAVING/ORDER BY, not registered
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectList {
    columns: Vec<SelectColumn>,
    visible_count: usize,
    having_start: usize,
}

impl SelectList {
    pub fn try_new(
        columns: Vec<SelectColumn>,
        visible_count: usize,
        having_start: usize,
    ) -> Result<Self> {
        if visible_count > having_start || having_start > columns.len() {
            return Err(DbError::new("Invalid select list boundaries")
                .with_field("visible_count", visible_count)
                .with_field("having_start", having_start)
                .with_field("num_columns", columns.len()));
        }

        Ok(SelectList {
            columns,
            visible_count,
            having_start,
        })
    }

    /// Create a select list where every column is visible.
    pub fn visible(columns: Vec<SelectColumn>) -> Self {
        let len = columns.len();
        SelectList {
            columns,
            visible_count: len,
            having_start: len,
        }
    }

    pub fn columns(&self) -> &[SelectColumn] {
        &self.columns
    }

    pub fn visible_columns(&self) -> &[SelectColumn] {
        &self.columns[..self.visible_count]
    }

    /// Columns that aren't shown to the user but are registered as resolution
    /// targets.
    pub fn hidden_columns(&self) -> &[SelectColumn] {
        &self.columns[self.visible_count..self.having_start]
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn having_start(&self) -> usize {
        self.having_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(n: usize) -> Vec<SelectColumn> {
        (0..n)
            .map(|idx| SelectColumn::column(format!("c{idx}"), idx))
            .collect()
    }

    #[test]
    fn boundaries() {
        let list = SelectList::try_new(columns(5), 2, 4).unwrap();
        assert_eq!(2, list.visible_columns().len());
        assert_eq!(
            vec!["c2", "c3"],
            list.hidden_columns()
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn boundaries_out_of_order() {
        SelectList::try_new(columns(5), 3, 2).unwrap_err();
    }

    #[test]
    fn boundaries_out_of_range() {
        SelectList::try_new(columns(2), 1, 3).unwrap_err();
    }

    #[test]
    fn all_visible() {
        let list = SelectList::visible(columns(3));
        assert_eq!(3, list.visible_count());
        assert!(list.hidden_columns().is_empty());
    }
}
