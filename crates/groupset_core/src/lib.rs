//! Grouping set planning for GROUP BY clauses using CUBE, ROLLUP and GROUPING
//! SETS.
//!
//! Planning happens in two phases. The select list is first turned into a
//! `ColumnResolution`, mapping aliases, names, and expression text to
//! materialized column indices. The GROUP BY tree is then resolved against it
//! and expanded into the grouping sets the aggregate should compute.

pub mod combination;
pub mod config;
pub mod element;
pub mod expander;
pub mod grouping_function;
pub mod planner;
pub mod resolver;
pub mod select_list;
