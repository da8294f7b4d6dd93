//! FILENAME: explorer-engine/src/definition.rs
//! Query Result Definition - The raw shapes delivered by the query transport.
//!
//! These structures mirror the cellset JSON produced by the aggregate query
//! service. They are:
//! - Deserializable straight from the transport's camelCase JSON
//! - Read-only inputs to the ingestor (never mutated by a pass)
//! - Only as rich as the materialization pipeline needs

use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

// ============================================================================
// LEVELS AND HIERARCHIES
// ============================================================================

/// A rank within a dimensional hierarchy (e.g. Region, Country, City).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub unique_name: String,

    /// Declared client sort strategy (`ALPHANUM`, `ALPHANUM-RANGE`, `NATURAL`, `SERVER`).
    /// Absent means the server order is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_strategy: Option<String>,
}

impl Level {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unique_name: impl Into<String>) -> Self {
        Level {
            id: id.into(),
            name: name.into(),
            unique_name: unique_name.into(),
            sort_strategy: None,
        }
    }

    pub fn with_sort_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.sort_strategy = Some(strategy.into());
        self
    }
}

/// A hierarchy within a dimension. Levels are ordered shallow-to-deep and
/// start with the "(All)" level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hierarchy {
    pub unique_name: String,

    #[serde(default)]
    pub levels: Vec<Level>,
}

impl Hierarchy {
    pub fn new(unique_name: impl Into<String>, levels: Vec<Level>) -> Self {
        Hierarchy {
            unique_name: unique_name.into(),
            levels,
        }
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub hierarchies: Vec<Hierarchy>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, hierarchies: Vec<Hierarchy>) -> Self {
        Dimension {
            name: name.into(),
            hierarchies,
        }
    }

    /// Looks up a hierarchy by index, failing when the dimension has none there.
    pub fn hierarchy(&self, index: usize) -> Result<&Hierarchy, ExplorerError> {
        self.hierarchies
            .get(index)
            .ok_or(ExplorerError::MissingHierarchy {
                index,
                available: self.hierarchies.len(),
            })
    }
}

// ============================================================================
// CELLSET
// ============================================================================

/// One entry along a result axis, naming a specific hierarchy member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Fully qualified, ancestry-encoded member name.
    pub unique_name: String,

    /// Raw member name (unlabeled).
    pub name: String,

    pub level: Level,

    #[serde(default = "default_ordinal")]
    pub ordinal: i64,
}

fn default_ordinal() -> i64 {
    -1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    #[serde(default)]
    pub positions: Vec<Vec<Position>>,
}

/// A single measure cell. Null cells are treated as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub value: Option<f64>,
}

impl Cell {
    pub fn count(&self) -> i64 {
        self.value.map(|v| v as i64).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CubeMetadata {
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    #[serde(default)]
    pub cube: CubeMetadata,
}

/// The flat, position-indexed result of one aggregate query.
/// `axes[1].positions[i][0]` is paired with `cells[i][0]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub metadata: ResultMetadata,

    #[serde(default)]
    pub axes: Vec<Axis>,

    #[serde(default)]
    pub cells: Vec<Vec<Cell>>,
}

impl QueryResult {
    pub fn from_json(json: &str) -> Result<Self, ExplorerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Row-axis positions (`axes[1]`), empty when the result has no row axis.
    pub fn row_positions(&self) -> &[Vec<Position>] {
        self.axes
            .get(1)
            .map(|axis| axis.positions.as_slice())
            .unwrap_or(&[])
    }

    /// The member at row `index`, taking the first tuple entry.
    pub fn position(&self, index: usize) -> Option<&Position> {
        self.row_positions().get(index).and_then(|tuple| tuple.first())
    }

    /// The measure at row `index`; missing cells count as zero.
    pub fn count_at(&self, index: usize) -> i64 {
        self.cells
            .get(index)
            .and_then(|row| row.first())
            .map(Cell::count)
            .unwrap_or(0)
    }

    /// Largest measure over every member row, skipping row 0 ("All").
    /// Returns -1 when there are no member rows.
    pub fn max_member_count(&self) -> i64 {
        (1..self.row_positions().len())
            .map(|x| self.count_at(x))
            .fold(-1, i64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_cellset() {
        let json = r#"{
            "metadata": { "cube": { "dimensions": [] } },
            "axes": [
                { "positions": [] },
                { "positions": [
                    [{ "uniqueName": "[Race]", "name": "All", "level": { "id": "0", "name": "(All)" } }],
                    [{ "uniqueName": "[Race].[Asian]", "name": "Asian", "ordinal": 3,
                       "level": { "id": "1", "name": "Race", "uniqueName": "[Race].[Race]" } }]
                ]}
            ],
            "cells": [[{ "value": 12 }], [{ "value": null }]]
        }"#;

        let result = QueryResult::from_json(json).unwrap();
        assert_eq!(result.row_positions().len(), 2);
        assert_eq!(result.position(0).unwrap().ordinal, -1);
        assert_eq!(result.position(1).unwrap().level.unique_name, "[Race].[Race]");
        assert_eq!(result.count_at(0), 12);
        assert_eq!(result.count_at(1), 0);
        assert_eq!(result.count_at(7), 0);
    }

    #[test]
    fn test_max_member_count_skips_all_row() {
        let mut result = QueryResult::default();
        result.axes = vec![Axis::default(), Axis::default()];
        let level = Level::new("1", "Race", "[Race].[Race]");
        for (name, value) in [("All", 100.0), ("A", 7.0), ("B", 42.0)] {
            result.axes[1].positions.push(vec![Position {
                unique_name: format!("[Race].[{}]", name),
                name: name.to_string(),
                level: level.clone(),
                ordinal: 0,
            }]);
            result.cells.push(vec![Cell { value: Some(value) }]);
        }

        assert_eq!(result.max_member_count(), 42);
        assert_eq!(QueryResult::default().max_member_count(), -1);
    }

    #[test]
    fn test_missing_hierarchy_is_reported() {
        let dim = Dimension::new("Subject", vec![]);
        let err = dim.hierarchy(2).unwrap_err();
        assert!(matches!(err, ExplorerError::MissingHierarchy { index: 2, available: 0 }));
    }
}
