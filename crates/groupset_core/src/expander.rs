//! Expansion of GROUP BY clauses into grouping sets.
//!
//! Each element expands into a "family" of combinations:
//!
//! - A plain column expands to a single one-column combination.
//! - `()` expands to a single empty combination.
//! - A tuple `(a, b)` expands to the cartesian product of its children.
//! - `CUBE (a, b)` expands to every subset of its items, `(a, b), (a), (b), ()`.
//! - `ROLLUP (a, b)` expands to the prefix chain, `(a, b), (a), ()`.
//! - `GROUPING SETS (a, b)` expands to its items as listed, `(a), (b)`.
//!
//! The top-level GROUP BY list is combined with the cartesian product.
//!
//! Members of CUBE/ROLLUP/GROUPING SETS are single grouping items. A member
//! only expands further if it's a non-empty tuple (which may carry its own
//! modifier), otherwise it contributes its one resolved column. `()` is only
//! accepted as a member of GROUPING SETS. CUBE and ROLLUP reject it.
//!
//! Family sizes can be counted without expanding, see
//! `SetExpander::count_roots`.

use groupset_error::{DbError, Result};

use crate::combination::GroupingCombination;
use crate::element::{ElementId, ElementKind, GroupingModifier};
use crate::resolver::ResolvedGroupBy;

/// Combinations produced by expanding one element or list of elements.
pub type Family = Vec<GroupingCombination>;

/// Size of a family, split on whether combinations are empty.
///
/// Arithmetic saturates, so a saturated count is an upper bound. Every other
/// count is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FamilySize {
    non_empty: u64,
    empty: u64,
}

impl FamilySize {
    const SINGLE_COLUMN: Self = FamilySize {
        non_empty: 1,
        empty: 0,
    };
    const SINGLE_EMPTY: Self = FamilySize {
        non_empty: 0,
        empty: 1,
    };

    fn total(&self) -> u64 {
        self.non_empty.saturating_add(self.empty)
    }

    /// Size of the pairwise concatenation of two families.
    ///
    /// A concatenation is only empty if both sides are empty.
    fn product(&self, other: &Self) -> Self {
        let non_empty = self
            .non_empty
            .saturating_mul(other.total())
            .saturating_add(self.empty.saturating_mul(other.non_empty));
        FamilySize {
            non_empty,
            empty: self.empty.saturating_mul(other.empty),
        }
    }

    fn sum(&self, other: &Self) -> Self {
        FamilySize {
            non_empty: self.non_empty.saturating_add(other.non_empty),
            empty: self.empty.saturating_add(other.empty),
        }
    }
}

#[derive(Debug)]
pub struct SetExpander<'a, 'b> {
    resolved: &'b ResolvedGroupBy<'a>,
}

impl<'a, 'b> SetExpander<'a, 'b> {
    pub fn new(resolved: &'b ResolvedGroupBy<'a>) -> Self {
        SetExpander { resolved }
    }

    /// Expand the top-level GROUP BY list.
    pub fn expand_roots(&self) -> Result<Family> {
        self.cartesian(self.resolved.tree().roots())
    }

    /// Count the combinations `expand_roots` would produce, including empty
    /// ones, without building them.
    ///
    /// Saturates at `u64::MAX`.
    pub fn count_roots(&self) -> Result<u64> {
        let size = self.count_cartesian(self.resolved.tree().roots())?;
        Ok(size.total())
    }

    /// Expand a single element, honoring its modifier.
    pub fn expand_element(&self, id: ElementId) -> Result<Family> {
        let elem = self.resolved.element(id)?;
        if elem.kind == ElementKind::Empty {
            return Ok(vec![GroupingCombination::empty()]);
        }

        // Tuples expand over their children, anything else is treated as a
        // list of itself.
        let single = [id];
        let items: &[ElementId] = if elem.is_tuple_list() {
            &elem.children
        } else {
            &single
        };

        match elem.modifier {
            GroupingModifier::Cube => self.power_set(items),
            GroupingModifier::Rollup => self.rollup(items),
            GroupingModifier::Sets => self.grouping_sets(items),
            GroupingModifier::None => {
                if elem.is_tuple_list() {
                    self.cartesian(items)
                } else {
                    self.item(id)
                }
            }
        }
    }

    /// Expand one member of a CUBE, ROLLUP or GROUPING SETS list.
    fn item(&self, id: ElementId) -> Result<Family> {
        let elem = self.resolved.element(id)?;
        match elem.kind {
            ElementKind::Empty => Ok(vec![GroupingCombination::empty()]),
            ElementKind::Tuple if elem.is_tuple_list() => self.expand_element(id),
            // Anything else collapses onto its resolved column, including
            // column elements that somehow have children.
            _ => Ok(vec![GroupingCombination::single(self.resolved.column(id)?)]),
        }
    }

    /// Expand one member of a CUBE or ROLLUP list.
    fn cube_or_rollup_item(&self, id: ElementId) -> Result<Family> {
        self.check_cube_or_rollup_item(id)?;
        self.item(id)
    }

    fn check_cube_or_rollup_item(&self, id: ElementId) -> Result<()> {
        let elem = self.resolved.element(id)?;
        if elem.kind == ElementKind::Empty {
            return Err(
                DbError::new("Empty grouping set not allowed inside CUBE or ROLLUP")
                    .with_field("element", id),
            );
        }
        Ok(())
    }

    /// Cartesian product of every element's full expansion.
    ///
    /// Combinations from the head come before combinations from the rest
    /// within each output combination. The rest's family drives the outer
    /// loop.
    fn cartesian(&self, elems: &[ElementId]) -> Result<Family> {
        let Some((&head, rest)) = elems.split_first() else {
            return Ok(vec![GroupingCombination::empty()]);
        };

        let first = self.expand_element(head)?;
        let rest = self.cartesian(rest)?;

        let mut sets = Vec::with_capacity(first.len() * rest.len());
        for current in &rest {
            for next in &first {
                sets.push(next.concat(current));
            }
        }

        Ok(sets)
    }

    /// All subsets of `items`, empty set last and exactly once.
    fn power_set(&self, items: &[ElementId]) -> Result<Family> {
        let Some((&head, rest)) = items.split_first() else {
            return Ok(vec![GroupingCombination::empty()]);
        };

        let first = self.cube_or_rollup_item(head)?;
        let without_head = self.power_set(rest)?;

        let mut sets = Vec::with_capacity(first.len() * without_head.len() + without_head.len());
        for current in &first {
            for next in &without_head {
                let set = current.concat(next);
                // The empty set is already produced by the branch excluding
                // the head.
                if !set.is_empty() {
                    sets.push(set);
                }
            }
        }
        sets.extend(without_head);

        Ok(sets)
    }

    /// Prefix chain of `items`, longest first, ending with the empty set.
    fn rollup(&self, items: &[ElementId]) -> Result<Family> {
        let Some((&head, rest)) = items.split_first() else {
            return Ok(vec![GroupingCombination::empty()]);
        };

        let first = self.cube_or_rollup_item(head)?;
        let rest = self.rollup(rest)?;

        let mut sets = Vec::with_capacity(first.len() * rest.len() + 1);
        for current in &rest {
            for next in &first {
                sets.push(next.concat(current));
            }
        }
        sets.push(GroupingCombination::empty());

        Ok(sets)
    }

    /// Items as listed, no deduplication.
    fn grouping_sets(&self, items: &[ElementId]) -> Result<Family> {
        let mut sets = Vec::with_capacity(items.len());
        for &id in items {
            sets.extend(self.item(id)?);
        }
        Ok(sets)
    }

    fn count_element(&self, id: ElementId) -> Result<FamilySize> {
        let elem = self.resolved.element(id)?;
        if elem.kind == ElementKind::Empty {
            return Ok(FamilySize::SINGLE_EMPTY);
        }

        let single = [id];
        let items: &[ElementId] = if elem.is_tuple_list() {
            &elem.children
        } else {
            &single
        };

        match elem.modifier {
            GroupingModifier::Cube => self.count_power_set(items),
            GroupingModifier::Rollup => self.count_rollup(items),
            GroupingModifier::Sets => self.count_grouping_sets(items),
            GroupingModifier::None => {
                if elem.is_tuple_list() {
                    self.count_cartesian(items)
                } else {
                    self.count_item(id)
                }
            }
        }
    }

    fn count_item(&self, id: ElementId) -> Result<FamilySize> {
        let elem = self.resolved.element(id)?;
        match elem.kind {
            ElementKind::Empty => Ok(FamilySize::SINGLE_EMPTY),
            ElementKind::Tuple if elem.is_tuple_list() => self.count_element(id),
            _ => Ok(FamilySize::SINGLE_COLUMN),
        }
    }

    fn count_cartesian(&self, elems: &[ElementId]) -> Result<FamilySize> {
        let Some((&head, rest)) = elems.split_first() else {
            return Ok(FamilySize::SINGLE_EMPTY);
        };
        let first = self.count_element(head)?;
        Ok(first.product(&self.count_cartesian(rest)?))
    }

    fn count_power_set(&self, items: &[ElementId]) -> Result<FamilySize> {
        let Some((&head, rest)) = items.split_first() else {
            return Ok(FamilySize::SINGLE_EMPTY);
        };
        self.check_cube_or_rollup_item(head)?;
        let first = self.count_item(head)?;
        let without_head = self.count_power_set(rest)?;

        // Empty combinations including the head are dropped.
        let with_head = first.product(&without_head);
        Ok(FamilySize {
            non_empty: with_head.non_empty.saturating_add(without_head.non_empty),
            empty: without_head.empty,
        })
    }

    fn count_rollup(&self, items: &[ElementId]) -> Result<FamilySize> {
        let Some((&head, rest)) = items.split_first() else {
            return Ok(FamilySize::SINGLE_EMPTY);
        };
        self.check_cube_or_rollup_item(head)?;
        let first = self.count_item(head)?;
        let prefixed = first.product(&self.count_rollup(rest)?);
        Ok(prefixed.sum(&FamilySize::SINGLE_EMPTY))
    }

    fn count_grouping_sets(&self, items: &[ElementId]) -> Result<FamilySize> {
        let mut size = FamilySize {
            non_empty: 0,
            empty: 0,
        };
        for &id in items {
            size = size.sum(&self.count_item(id)?);
        }
        Ok(size)
    }
}
