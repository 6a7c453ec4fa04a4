// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Load ordering for multi-decoders.
//!
//! A multi-decoder can only initialize after the decoders it delegates to,
//! so multi-decoders referencing each other are sorted depth-first with
//! their subs first.

use std::collections::HashMap;

use sluice_core::SluiceError;

/// A multi-decoder and the decoders it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Section name of the multi-decoder.
    pub name: String,
    /// Decoder sections it delegates to.
    pub subs: Vec<String>,
}

impl DependencyNode {
    /// A node depending on `subs`.
    pub fn new(name: impl Into<String>, subs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            subs,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

struct Resolver<'a> {
    nodes: &'a [DependencyNode],
    index: HashMap<&'a str, usize>,
    marks: Vec<Mark>,
    path: Vec<usize>,
    order: Vec<usize>,
}

impl Resolver<'_> {
    fn visit(&mut self, node: usize) -> Result<(), SluiceError> {
        match self.marks[node] {
            Mark::Done => return Ok(()),
            Mark::Visiting => return Err(self.cycle_error(node)),
            Mark::Unvisited => {}
        }

        self.marks[node] = Mark::Visiting;
        self.path.push(node);
        let nodes = self.nodes;
        for sub in &nodes[node].subs {
            // Subs outside the set are plain decoders, loaded earlier.
            if let Some(&next) = self.index.get(sub.as_str()) {
                self.visit(next)?;
            }
        }
        self.path.pop();
        self.marks[node] = Mark::Done;
        self.order.push(node);
        Ok(())
    }

    fn cycle_error(&self, node: usize) -> SluiceError {
        let start = self
            .path
            .iter()
            .position(|&n| n == node)
            .unwrap_or_default();
        let cycle = self.path[start..]
            .iter()
            .chain(std::iter::once(&node))
            .map(|&n| self.nodes[n].name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ");
        SluiceError::CyclicDependency { cycle }
    }
}

/// Order `nodes` so every node comes after the nodes named in its subs.
///
/// Nodes are visited in input order and subs in declared order, so the
/// result is stable.
pub fn order_dependencies(nodes: Vec<DependencyNode>) -> Result<Vec<DependencyNode>, SluiceError> {
    let order = {
        let mut resolver = Resolver {
            nodes: &nodes,
            index: nodes
                .iter()
                .enumerate()
                .map(|(i, node)| (node.name.as_str(), i))
                .collect(),
            marks: vec![Mark::Unvisited; nodes.len()],
            path: Vec::new(),
            order: Vec::with_capacity(nodes.len()),
        };
        for node in 0..nodes.len() {
            resolver.visit(node)?;
        }
        resolver.order
    };

    let mut slots: Vec<Option<DependencyNode>> = nodes.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}
