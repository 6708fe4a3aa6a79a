use std::fmt;

use groupset_error::{DbError, OptionExt, Result};

/// Reference to an element inside a `GroupByTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId {
    pub element_idx: usize,
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ELEM_{}", self.element_idx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A reference to a single column or computed expression.
    Column,
    /// A parenthesized list of elements, e.g. `(a, b)`.
    Tuple,
    /// The explicit empty grouping `()`.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroupingModifier {
    #[default]
    None,
    /// `CUBE (...)`
    Cube,
    /// `ROLLUP (...)`
    Rollup,
    /// `GROUPING SETS (...)`
    Sets,
}

impl fmt::Display for GroupingModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Cube => write!(f, "CUBE"),
            Self::Rollup => write!(f, "ROLLUP"),
            Self::Sets => write!(f, "GROUPING SETS"),
        }
    }
}

/// Keys an expression can be matched on when looking up its materialized
/// column.
pub trait ResolutionKeys {
    /// User provided alias, `SELECT a + 1 AS x`.
    fn alias(&self) -> Option<&str>;

    /// Declared column name.
    fn name(&self) -> Option<&str>;

    /// Normalized source text of the expression.
    fn text(&self) -> &str;

    /// If this is a plain column reference and not a computed expression.
    fn is_column_ref(&self) -> bool;
}

/// A node in a bound GROUP BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingElement {
    pub kind: ElementKind,
    pub modifier: GroupingModifier,
    /// Child elements. Only meaningful for tuples.
    pub children: Vec<ElementId>,
    pub alias: Option<String>,
    pub name: Option<String>,
    pub text: String,
    pub is_column_ref: bool,
}

impl GroupingElement {
    /// Create an element referencing a plain column.
    ///
    /// The column name doubles as the source text.
    pub fn column(name: impl Into<String>) -> Self {
        let name = name.into();
        GroupingElement {
            kind: ElementKind::Column,
            modifier: GroupingModifier::None,
            children: Vec::new(),
            alias: None,
            name: Some(name.clone()),
            text: name,
            is_column_ref: true,
        }
    }

    /// Create an element for a computed expression identified by its source
    /// text.
    pub fn expr(text: impl Into<String>) -> Self {
        GroupingElement {
            kind: ElementKind::Column,
            modifier: GroupingModifier::None,
            children: Vec::new(),
            alias: None,
            name: None,
            text: text.into(),
            is_column_ref: false,
        }
    }

    pub fn tuple(children: impl IntoIterator<Item = ElementId>) -> Self {
        GroupingElement {
            kind: ElementKind::Tuple,
            modifier: GroupingModifier::None,
            children: children.into_iter().collect(),
            alias: None,
            name: None,
            text: String::new(),
            is_column_ref: false,
        }
    }

    pub fn empty() -> Self {
        GroupingElement {
            kind: ElementKind::Empty,
            modifier: GroupingModifier::None,
            children: Vec::new(),
            alias: None,
            name: None,
            text: "()".to_string(),
            is_column_ref: false,
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

    pub fn with_modifier(mut self, modifier: GroupingModifier) -> Self {
        self.modifier = modifier;
        self
    }

    /// If this element expands as a list of its children.
    ///
    /// Only tuples with at least one child do. Everything else is treated as
    /// a single grouping item.
    pub fn is_tuple_list(&self) -> bool {
        self.kind == ElementKind::Tuple && !self.children.is_empty()
    }
}

impl ResolutionKeys for GroupingElement {
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

/// Arena holding all elements of a GROUP BY clause.
///
/// Elements must be pushed bottom-up: a tuple may only reference children that
/// already exist in the tree. Elements are never modified once pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupByTree {
    elements: Vec<GroupingElement>,
    /// Top-level elements of the GROUP BY, in source order.
    roots: Vec<ElementId>,
}

impl GroupByTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an element into the tree, returning its id.
    pub fn push(&mut self, element: GroupingElement) -> Result<ElementId> {
        let id = ElementId {
            element_idx: self.elements.len(),
        };

        if let Some(child) = element.children.iter().find(|c| c.element_idx >= id.element_idx) {
            return Err(DbError::new("Grouping element references a child that does not exist yet")
                .with_field("element", id)
                .with_field("child", child));
        }

        self.elements.push(element);
        Ok(id)
    }

    /// Push an element and append it to the top-level GROUP BY list.
    pub fn push_root(&mut self, element: GroupingElement) -> Result<ElementId> {
        let id = self.push(element)?;
        self.roots.push(id);
        Ok(id)
    }

    /// Push a tuple over `children` carrying `modifier`.
    pub fn push_list(
        &mut self,
        modifier: GroupingModifier,
        children: impl IntoIterator<Item = ElementId>,
    ) -> Result<ElementId> {
        self.push(GroupingElement::tuple(children).with_modifier(modifier))
    }

    /// Append an existing element to the top-level list.
    pub fn add_root(&mut self, id: ElementId) -> Result<()> {
        self.get(id)?;
        self.roots.push(id);
        Ok(())
    }

    pub fn get(&self, id: ElementId) -> Result<&GroupingElement> {
        self.elements
            .get(id.element_idx)
            .required("grouping element in tree")
    }

    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &GroupingElement)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(idx, elem)| (ElementId { element_idx: idx }, elem))
    }
}
