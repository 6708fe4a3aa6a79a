use std::collections::HashMap;

use groupset_error::{OptionExt, Result};
use tracing::trace;

use crate::combination::ResolvedColumn;
use crate::element::{ElementId, ElementKind, GroupByTree, GroupingElement, ResolutionKeys};
use crate::select_list::SelectList;

/// Mapping from alias, name, or source text to materialized column index.
///
/// Built once per query from the select list before any grouping set is
/// expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnResolution {
    keys: HashMap<String, usize>,
    /// Resolved column index for each visible select list column.
    ///
    /// A visible column that matches a hidden column points to the hidden
    /// column's index instead of its own. This lets GROUP BY reuse aliases and
    /// collapses repeated computed expressions onto one column.
    select_columns: Vec<usize>,
}

impl ColumnResolution {
    pub fn resolve(select_list: &SelectList) -> Self {
        let mut keys = HashMap::new();

        for col in select_list.hidden_columns() {
            keys.insert(col.text().to_string(), col.column_index);
            if let Some(name) = col.name() {
                keys.insert(name.to_string(), col.column_index);
            }
            if let Some(alias) = col.alias() {
                keys.insert(alias.to_string(), col.column_index);
            }
        }

        let select_columns = select_list
            .visible_columns()
            .iter()
            .map(|col| {
                let found = col
                    .alias()
                    .and_then(|alias| keys.get(alias))
                    .or_else(|| col.name().and_then(|name| keys.get(name)))
                    .or_else(|| {
                        // Plain columns only match on alias or name.
                        if col.is_column_ref() {
                            None
                        } else {
                            keys.get(col.text())
                        }
                    });

                match found {
                    Some(&idx) => {
                        if idx != col.column_index {
                            trace!(
                                text = %col.text,
                                from = col.column_index,
                                to = idx,
                                "collapsed select column"
                            );
                        }
                        idx
                    }
                    None => col.column_index,
                }
            })
            .collect();

        ColumnResolution {
            keys,
            select_columns,
        }
    }

    /// Look up the column for an expression by alias, falling back to its
    /// source text.
    pub fn lookup(&self, expr: &impl ResolutionKeys) -> ResolvedColumn {
        expr.alias()
            .and_then(|alias| self.keys.get(alias))
            .or_else(|| self.keys.get(expr.text()))
            .map(|&idx| ResolvedColumn::Column(idx))
            .unwrap_or(ResolvedColumn::Unresolved)
    }

    /// Get the resolved column index for a visible select list column.
    pub fn select_column_index(&self, idx: usize) -> Result<usize> {
        self.select_columns
            .get(idx)
            .copied()
            .required("visible select column")
    }

    pub fn select_column_indices(&self) -> &[usize] {
        &self.select_columns
    }

    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    /// Resolve every element in the tree.
    pub fn resolve_tree<'a>(&self, tree: &'a GroupByTree) -> ResolvedGroupBy<'a> {
        let columns = tree.iter().map(|(_, elem)| self.lookup(elem)).collect();
        ResolvedGroupBy { tree, columns }
    }
}

/// A GROUP BY tree with every element resolved to a column.
///
/// Can only be created through `ColumnResolution::resolve_tree`, so anything
/// holding one is guaranteed that resolution has completed.
#[derive(Debug)]
pub struct ResolvedGroupBy<'a> {
    tree: &'a GroupByTree,
    /// Resolved column per element, indexed by element id.
    columns: Vec<ResolvedColumn>,
}

impl<'a> ResolvedGroupBy<'a> {
    pub fn tree(&self) -> &'a GroupByTree {
        self.tree
    }

    pub fn element(&self, id: ElementId) -> Result<&'a GroupingElement> {
        self.tree.get(id)
    }

    pub fn column(&self, id: ElementId) -> Result<ResolvedColumn> {
        self.columns
            .get(id.element_idx)
            .copied()
            .required("resolved column for grouping element")
    }

    /// Iterate column elements that failed to resolve.
    ///
    /// Tuples and `()` are never expected to resolve and are skipped.
    pub fn unresolved(&self) -> impl Iterator<Item = (ElementId, &'a GroupingElement)> + '_ {
        self.tree.iter().filter(move |(id, elem)| {
            !elem.is_tuple_list()
                && elem.kind != ElementKind::Empty
                && self.columns[id.element_idx] == ResolvedColumn::Unresolved
        })
    }
}
