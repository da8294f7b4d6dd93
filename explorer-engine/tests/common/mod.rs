//! FILENAME: tests/common/mod.rs
//! Cellset fixtures for explorer integration tests.

#![allow(dead_code)]

use explorer_engine::{Dimension, ExplorerView, Hierarchy, Level, QueryResult};
use serde_json::{json, Value};

/// Builds a cellset the way the query transport serializes it.
pub struct CellsetBuilder {
    hierarchy: String,
    positions: Vec<Value>,
    cells: Vec<Value>,
    dimensions: Vec<Value>,
}

impl CellsetBuilder {
    /// Starts a cellset whose row 0 is the "All" member.
    pub fn new(hierarchy: &str) -> Self {
        CellsetBuilder {
            hierarchy: hierarchy.to_string(),
            positions: vec![json!([{
                "uniqueName": format!("{}.[All]", hierarchy),
                "name": "All",
                "level": { "id": "0", "name": "(All)", "uniqueName": format!("{}.[(All)]", hierarchy) },
                "ordinal": 0
            }])],
            cells: vec![json!([{ "value": 0 }])],
            dimensions: Vec::new(),
        }
    }

    /// Adds a member below the hierarchy; `path` is the chain of member names.
    pub fn member(mut self, path: &[&str], level: &Level, value: f64) -> Self {
        let unique_name = format!("{}.[{}]", self.hierarchy, path.join("].["));
        let name = path.last().copied().unwrap_or_default();
        let ordinal = self.positions.len();
        self.positions.push(json!([{
            "uniqueName": unique_name,
            "name": name,
            "level": { "id": level.id, "name": level.name, "uniqueName": level.unique_name },
            "ordinal": ordinal
        }]));
        self.cells.push(json!([{ "value": value }]));
        self
    }

    pub fn with_dimensions(mut self, dimensions: &[Dimension]) -> Self {
        self.dimensions = dimensions
            .iter()
            .map(|d| serde_json::to_value(d).unwrap())
            .collect();
        self
    }

    pub fn build(self) -> QueryResult {
        serde_json::from_value(json!({
            "metadata": { "cube": { "dimensions": self.dimensions } },
            "axes": [ { "positions": [] }, { "positions": self.positions } ],
            "cells": self.cells
        }))
        .unwrap()
    }
}

/// Race hierarchy: (All) > Group > Race > Participant.
pub struct RaceFixture;

impl RaceFixture {
    pub const HIERARCHY: &'static str = "[Subject.Race]";
    pub const SUBJECT: &'static str = "Participant";

    pub fn levels() -> Vec<Level> {
        vec![
            Level::new("0", "(All)", "[Subject.Race].[(All)]"),
            Level::new("1", "Group", "[Subject.Race].[Group]"),
            Level::new("2", "Race", "[Subject.Race].[Race]"),
            Level::new("3", Self::SUBJECT, "[Subject.Race].[Participant]"),
        ]
    }

    pub fn hierarchy() -> Hierarchy {
        Hierarchy::new(Self::HIERARCHY, Self::levels())
    }

    pub fn dimension() -> Dimension {
        Dimension::new("Subject", vec![Self::hierarchy()])
    }

    pub fn group() -> Level {
        Self::levels()[1].clone()
    }

    pub fn race() -> Level {
        Self::levels()[2].clone()
    }

    pub fn subject() -> Level {
        Self::levels()[3].clone()
    }

    /// Two groups with leaves and subject rows interleaved.
    pub fn base() -> QueryResult {
        let (group, race, subject) = (Self::group(), Self::race(), Self::subject());
        CellsetBuilder::new(Self::HIERARCHY)
            .member(&["Asian"], &group, 12.0)
            .member(&["Asian", "Korean"], &race, 7.0)
            .member(&["Asian", "Korean", "P-001"], &subject, 1.0)
            .member(&["Asian", "Japanese"], &race, 5.0)
            .member(&["White"], &group, 30.0)
            .member(&["White", "European"], &race, 30.0)
            .member(&["White", "#null"], &race, 2.0)
            .build()
    }
}

/// Asserts every node's parent precedes it, one level up, and owns its uniqueName.
pub fn assert_well_formed(view: &ExplorerView, hierarchy: &str) {
    assert!(view.orphans.is_empty(), "unexpected orphans: {:?}", view.orphans);
    for (i, node) in view.nodes.iter().enumerate() {
        if node.lvl_depth == 1 {
            assert!(node.unique_name.starts_with(hierarchy));
            continue;
        }
        let parent = view.nodes[..i]
            .iter()
            .rev()
            .find(|p| p.lvl_depth + 1 == node.lvl_depth)
            .expect("parent precedes child in preorder");
        assert!(node.unique_name.starts_with(&format!("{}.[", parent.unique_name)));
    }
}
