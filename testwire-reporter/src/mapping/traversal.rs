// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::host::{Suite, TitlePath};

/// A suite reached while walking the tree.
#[derive(Clone, Debug)]
pub struct SuiteVisit<'a> {
    /// The suite.
    pub suite: &'a Suite,
    /// The title path of the suite.
    pub path: TitlePath,
    /// The title path of the parent suite. `None` for the root.
    pub parent_path: Option<TitlePath>,
    /// The depth of the suite; the root is at depth 0.
    pub depth: usize,
}

impl<'a> SuiteVisit<'a> {
    fn root(suite: &'a Suite) -> Self {
        Self {
            suite,
            path: TitlePath::new([suite.title.as_str()]),
            parent_path: None,
            depth: 0,
        }
    }

    fn child(&self, suite: &'a Suite) -> Self {
        Self {
            suite,
            path: self.path.child(&suite.title),
            parent_path: Some(self.path.clone()),
            depth: self.depth + 1,
        }
    }
}

/// Walks the tree parents-first, visiting children in declaration order.
pub fn walk_pre_order(root: &Suite) -> Vec<SuiteVisit<'_>> {
    let mut visits = Vec::new();
    let mut stack = vec![SuiteVisit::root(root)];

    while let Some(visit) = stack.pop() {
        // Push in reverse so the first child is popped first.
        stack.extend(visit.suite.suites.iter().rev().map(|child| visit.child(child)));
        visits.push(visit);
    }

    visits
}

/// Walks the tree children-first: every suite is visited after all of its descendants.
pub fn walk_post_order(root: &Suite) -> Vec<SuiteVisit<'_>> {
    let mut visits = Vec::new();
    // The flag is set once a node's children have been pushed.
    let mut stack = vec![(SuiteVisit::root(root), false)];

    while let Some((visit, expanded)) = stack.pop() {
        if expanded || visit.suite.suites.is_empty() {
            visits.push(visit);
            continue;
        }

        let children: Vec<_> = visit
            .suite
            .suites
            .iter()
            .rev()
            .map(|child| (visit.child(child), false))
            .collect();
        stack.push((visit, true));
        stack.extend(children);
    }

    visits
}
