// src/graph/pool.rs

//! Slot storage for graph nodes.
//!
//! The pool is a growable array of [`Node`] slots plus a free list of
//! reusable indices. It never shrinks: [`NodePool::clear`] only returns every
//! slot to the free list, so a graph rebuilt each frame stops allocating
//! once it has reached its working size.

use tracing::debug;

use crate::errors::{Result, TaskGraphError};
use crate::graph::node::{Job, Node, NodeId};

pub(crate) struct NodePool {
    slots: Vec<Node>,
    /// Free slot indices; popped from the back, so kept in descending order
    /// after a rebuild to hand out low indices first.
    free: Vec<usize>,
    in_use: usize,
}

impl NodePool {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self {
            slots: Vec::new(),
            free: Vec::new(),
            in_use: 0,
        };
        pool.grow_to(capacity);
        pool
    }

    /// Number of slots currently bound to a task.
    pub(crate) fn len(&self) -> usize {
        self.in_use
    }

    /// Total number of slots, free or not.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slot(&self, index: usize) -> &Node {
        &self.slots[index]
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Node {
        &mut self.slots[index]
    }

    pub(crate) fn id_of(&self, index: usize) -> NodeId {
        NodeId {
            index,
            generation: self.slots[index].generation,
        }
    }

    /// Map a handle to its slot index, rejecting stale and foreign handles.
    pub(crate) fn resolve(&self, id: NodeId) -> Result<usize> {
        match self.slots.get(id.index) {
            Some(node) if node.in_use && node.generation == id.generation => Ok(id.index),
            _ => Err(TaskGraphError::InvalidNode(id)),
        }
    }

    /// Bind `job` to a free slot, growing the pool if none is left.
    pub(crate) fn allocate(&mut self, job: Box<dyn Job>) -> NodeId {
        if self.free.is_empty() {
            let target = (self.slots.len() * 2).max(1);
            debug!(from = self.slots.len(), to = target, "node pool exhausted; growing");
            self.grow_to(target);
        }

        // `grow_to` always leaves at least one free slot.
        let index = self.free.pop().unwrap_or_default();
        let node = &mut self.slots[index];
        node.in_use = true;
        node.job = Some(job);
        self.in_use += 1;

        self.id_of(index)
    }

    /// Add the edge `parent -> child` to both endpoint lists.
    ///
    /// Duplicate edges are ignored. Callers resolve both indices first.
    pub(crate) fn link(&mut self, parent: usize, child: usize) {
        if !self.slots[parent].children.contains(&child) {
            self.slots[parent].children.push(child);
        }
        if !self.slots[child].parents.contains(&parent) {
            self.slots[child].parents.push(parent);
        }
    }

    /// Indices of every slot currently bound to a task.
    pub(crate) fn in_use_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, node)| node.in_use)
            .map(|(index, _)| index)
    }

    /// In-use nodes without parents, in slot order.
    pub(crate) fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.in_use_indices()
            .filter(move |&index| self.slots[index].parents.is_empty())
    }

    pub(crate) fn reset_pass_state(&self) {
        for index in self.in_use_indices() {
            self.slots[index].reset_pass_state();
        }
    }

    /// Release every slot and rebuild the free list. Edges are wiped too.
    pub(crate) fn clear(&mut self) {
        for node in self.slots.iter_mut().filter(|node| node.in_use) {
            node.release();
        }
        self.in_use = 0;
        self.free = (0..self.slots.len()).rev().collect();
    }

    fn grow_to(&mut self, target: usize) {
        let start = self.slots.len();
        if target <= start {
            return;
        }
        self.slots.reserve_exact(target - start);
        self.slots.extend((start..target).map(|_| Node::empty()));
        // Keep low indices at the back so they are handed out first.
        self.free.splice(0..0, (start..target).rev());
    }
}
