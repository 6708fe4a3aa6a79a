use std::collections::BTreeSet;

use groupset_error::{DbError, Result};
use tracing::{debug, trace};

use crate::combination::GroupingCombination;
use crate::config::GroupingConfig;
use crate::element::{GroupByTree, ResolutionKeys};
use crate::expander::SetExpander;
use crate::grouping_function::{ActiveGrouping, GroupingFunction};
use crate::resolver::ColumnResolution;
use crate::select_list::SelectList;

/// Grouping sets computed for a query.
///
/// The execution engine runs one aggregation pass per set, and additionally
/// produces `grand_total_count` rows aggregating over the entire input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingSetPlan {
    /// Non-empty combinations, in expansion order.
    sets: Vec<GroupingCombination>,
    /// Number of combinations that expanded to the empty set.
    grand_total_count: usize,
    resolution: ColumnResolution,
}

impl GroupingSetPlan {
    pub fn sets(&self) -> &[GroupingCombination] {
        &self.sets
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupingCombination> {
        self.sets.iter()
    }

    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn grand_total_count(&self) -> usize {
        self.grand_total_count
    }

    pub fn resolution(&self) -> &ColumnResolution {
        &self.resolution
    }

    /// Get each set as a set of column indices, skipping unresolved columns.
    pub fn column_sets(&self) -> Vec<BTreeSet<usize>> {
        self.sets.iter().map(|set| set.to_column_set()).collect()
    }

    /// Bind a GROUPING call against this plan's resolved columns.
    pub fn bind_grouping_function<K>(&self, args: &[K]) -> Result<GroupingFunction>
    where
        K: ResolutionKeys,
    {
        GroupingFunction::bind(&self.resolution, args)
    }

    /// Compute GROUPING for `args` for a row produced by `active`.
    ///
    /// Output bits are 1 for arguments that were aggregated away.
    pub fn is_grouped<K>(&self, active: ActiveGrouping, args: &[K]) -> Result<u64>
    where
        K: ResolutionKeys,
    {
        let func = self.bind_grouping_function(args)?;
        Ok(func.evaluate(active))
    }
}

#[derive(Debug)]
pub struct GroupingSetPlanner {
    config: GroupingConfig,
}

impl GroupingSetPlanner {
    pub fn new(config: GroupingConfig) -> Self {
        GroupingSetPlanner { config }
    }

    /// Resolve the GROUP BY against the select list, then expand it into
    /// grouping sets.
    pub fn plan(
        &self,
        group_by: &GroupByTree,
        select_list: &SelectList,
    ) -> Result<GroupingSetPlan> {
        trace!(
            roots = group_by.roots().len(),
            visible = select_list.visible_count(),
            having_start = select_list.having_start(),
            "planning grouping sets"
        );

        let resolution = ColumnResolution::resolve(select_list);
        let resolved = resolution.resolve_tree(group_by);

        if self.config.verify_group_by_references {
            if let Some((id, elem)) = resolved.unresolved().next() {
                return Err(
                    DbError::new("GROUP BY expression does not reference a select list column")
                        .with_field("element", id)
                        .with_field("expression", &elem.text),
                );
            }
        }

        let expander = SetExpander::new(&resolved);

        // Checked before expanding, CUBE grows exponentially.
        let max = self.config.max_grouping_sets;
        if max != 0 {
            let num_sets = expander.count_roots()?;
            if num_sets > max {
                return Err(DbError::new("GROUP BY expands to too many grouping sets")
                    .with_field("num_sets", num_sets)
                    .with_field("max_grouping_sets", max));
            }
        }

        let family = expander.expand_roots()?;

        let mut sets = Vec::with_capacity(family.len());
        let mut grand_total_count = 0;
        for set in family {
            if set.is_empty() {
                grand_total_count += 1;
            } else {
                sets.push(set);
            }
        }

        debug!(
            num_sets = sets.len(),
            grand_total_count,
            num_keys = resolution.num_keys(),
            "planned grouping sets"
        );

        Ok(GroupingSetPlan {
            sets,
            grand_total_count,
            resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combination::ResolvedColumn;
    use crate::element::{GroupingElement, GroupingModifier};
    use crate::select_list::SelectColumn;

    fn select_list() -> SelectList {
        SelectList::try_new(
            vec![
                SelectColumn::column("a", 0),
                SelectColumn::column("b", 1),
                SelectColumn::column("a", 2),
                SelectColumn::column("b", 3),
            ],
            2,
            4,
        )
        .unwrap()
    }

    fn cube_tree() -> GroupByTree {
        let mut tree = GroupByTree::new();
        let a = tree.push(GroupingElement::column("a")).unwrap();
        let b = tree.push(GroupingElement::column("b")).unwrap();
        let cube = tree.push_list(GroupingModifier::Cube, [a, b]).unwrap();
        tree.add_root(cube).unwrap();
        tree
    }

    #[test]
    fn partitions_grand_totals() {
        let plan = GroupingSetPlanner::new(GroupingConfig::default())
            .plan(&cube_tree(), &select_list())
            .unwrap();

        assert_eq!(3, plan.num_sets());
        assert_eq!(1, plan.grand_total_count());
        assert_eq!(
            vec![
                BTreeSet::from([2, 3]),
                BTreeSet::from([2]),
                BTreeSet::from([3])
            ],
            plan.column_sets()
        );
        // Visible columns collapse onto the hidden group columns.
        assert_eq!(&[2, 3], plan.resolution().select_column_indices());
    }

    #[test]
    fn max_grouping_sets_exceeded() {
        let config = GroupingConfig {
            max_grouping_sets: 3,
            ..Default::default()
        };
        let err = GroupingSetPlanner::new(config)
            .plan(&cube_tree(), &select_list())
            .unwrap_err();
        assert_eq!(Some("4"), err.get_field("num_sets"));
    }

    #[test]
    fn max_grouping_sets_at_limit() {
        let config = GroupingConfig {
            max_grouping_sets: 4,
            ..Default::default()
        };
        GroupingSetPlanner::new(config)
            .plan(&cube_tree(), &select_list())
            .unwrap();
    }

    #[test]
    fn max_grouping_sets_checked_before_expanding() {
        // CUBE over 40 columns would be 2^40 sets if expanded.
        let mut tree = GroupByTree::new();
        let items: Vec<_> = (0..40)
            .map(|i| tree.push(GroupingElement::column(format!("c{i}"))).unwrap())
            .collect();
        let cube = tree.push_list(GroupingModifier::Cube, items).unwrap();
        tree.add_root(cube).unwrap();

        let config = GroupingConfig {
            max_grouping_sets: 16,
            ..Default::default()
        };
        let err = GroupingSetPlanner::new(config)
            .plan(&tree, &select_list())
            .unwrap_err();
        assert_eq!(Some("1099511627776"), err.get_field("num_sets"));
        assert_eq!(Some("16"), err.get_field("max_grouping_sets"));
    }

    #[test]
    fn verify_references() {
        let mut tree = GroupByTree::new();
        tree.push_root(GroupingElement::column("a")).unwrap();
        tree.push_root(GroupingElement::expr("c * 2")).unwrap();

        // Unresolved propagates by default.
        let plan = GroupingSetPlanner::new(GroupingConfig::default())
            .plan(&tree, &select_list())
            .unwrap();
        assert_eq!(
            &[ResolvedColumn::Column(2), ResolvedColumn::Unresolved],
            plan.sets()[0].columns()
        );

        let config = GroupingConfig {
            verify_group_by_references: true,
            ..Default::default()
        };
        let err = GroupingSetPlanner::new(config)
            .plan(&tree, &select_list())
            .unwrap_err();
        assert_eq!(Some("c * 2"), err.get_field("expression"));
    }

    #[test]
    fn is_grouped_per_set() {
        let plan = GroupingSetPlanner::new(GroupingConfig::default())
            .plan(&cube_tree(), &select_list())
            .unwrap();
        let args = [GroupingElement::column("a"), GroupingElement::column("b")];

        let got: Vec<_> = plan
            .iter()
            .map(|set| plan.is_grouped(ActiveGrouping::Combination(set), &args).unwrap())
            .collect();
        assert_eq!(vec![0b00, 0b01, 0b10], got);

        let grand_total = GroupingCombination::empty();
        assert_eq!(
            0b11,
            plan.is_grouped(ActiveGrouping::Combination(&grand_total), &args).unwrap()
        );
        assert_eq!(0b11, plan.is_grouped(ActiveGrouping::TotalAggregate, &args).unwrap());
    }
}
