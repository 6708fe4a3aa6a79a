use groupset_error::{DbError, Result};

use crate::combination::{GroupingCombination, ResolvedColumn};
use crate::element::ResolutionKeys;
use crate::resolver::ColumnResolution;

/// Max number of arguments to GROUPING, output is a u64.
pub const MAX_GROUPING_ARGS: usize = 64;

/// The grouping an output row was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveGrouping<'a> {
    /// Aggregate over the entire input with no GROUP BY.
    TotalAggregate,
    /// Row was produced by grouping on this combination.
    ///
    /// Unresolved arguments compare equal to any unresolved column in the
    /// combination, so they read as grouped even if they name different
    /// expressions.
    Combination(&'a GroupingCombination),
}

/// A bound `GROUPING(...)` call.
///
/// Arguments are resolved once on bind. Evaluating against an active grouping
/// produces a bitmask where a 1 means the argument was aggregated away for
/// that row. The left-most argument is the most significant bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingFunction {
    columns: Vec<ResolvedColumn>,
}

impl GroupingFunction {
    pub fn bind<K>(resolution: &ColumnResolution, args: &[K]) -> Result<Self>
    where
        K: ResolutionKeys,
    {
        if args.len() > MAX_GROUPING_ARGS {
            return Err(DbError::new("Too many arguments to GROUPING")
                .with_field("num_args", args.len())
                .with_field("max_args", MAX_GROUPING_ARGS));
        }

        let columns = args.iter().map(|arg| resolution.lookup(arg)).collect();
        Ok(GroupingFunction { columns })
    }

    pub fn columns(&self) -> &[ResolvedColumn] {
        &self.columns
    }

    pub fn evaluate(&self, active: ActiveGrouping) -> u64 {
        match active {
            ActiveGrouping::TotalAggregate => match self.columns.len() {
                0 => 0,
                n => u64::MAX >> (MAX_GROUPING_ARGS - n),
            },
            ActiveGrouping::Combination(set) => {
                let mut v: u64 = 0;
                for &col in &self.columns {
                    v <<= 1;
                    if !set.contains(col) {
                        v |= 1;
                    }
                }
                v
            }
        }
    }
}
