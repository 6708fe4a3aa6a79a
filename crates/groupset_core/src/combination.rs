use std::collections::BTreeSet;
use std::fmt;

/// Result of resolving a grouping element to a materialized column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolvedColumn {
    Column(usize),
    /// No column matched any of the element's keys. The binder is expected to
    /// reject these before planning.
    Unresolved,
}

impl ResolvedColumn {
    pub fn column_index(&self) -> Option<usize> {
        match self {
            Self::Column(idx) => Some(*idx),
            Self::Unresolved => None,
        }
    }
}

impl fmt::Display for ResolvedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(idx) => write!(f, "#{idx}"),
            Self::Unresolved => write!(f, "?"),
        }
    }
}

/// An ordered set of columns to group on.
///
/// Order is the order columns were added during expansion, and carries no
/// meaning beyond keeping output deterministic. An empty combination groups
/// all rows into a single grand total row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupingCombination {
    columns: Vec<ResolvedColumn>,
}

impl GroupingCombination {
    pub fn new(columns: Vec<ResolvedColumn>) -> Self {
        GroupingCombination { columns }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(column: ResolvedColumn) -> Self {
        GroupingCombination {
            columns: vec![column],
        }
    }

    /// Create a new combination with columns from `self` followed by columns
    /// from `other`.
    pub fn concat(&self, other: &GroupingCombination) -> Self {
        let mut columns = Vec::with_capacity(self.columns.len() + other.columns.len());
        columns.extend_from_slice(&self.columns);
        columns.extend_from_slice(&other.columns);
        GroupingCombination { columns }
    }

    pub fn contains(&self, column: ResolvedColumn) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ResolvedColumn] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.columns.iter()
    }

    /// Get the resolved column indices as a set, skipping unresolved columns.
    pub fn to_column_set(&self) -> BTreeSet<usize> {
        self.columns.iter().filter_map(|c| c.column_index()).collect()
    }
}

impl FromIterator<ResolvedColumn> for GroupingCombination {
    fn from_iter<T: IntoIterator<Item = ResolvedColumn>>(iter: T) -> Self {
        GroupingCombination {
            columns: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for GroupingCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, col) in self.columns.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{col}")?;
        }
        write!(f, ")")
    }
}
