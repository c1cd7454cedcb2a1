//! The drawable layer: a tree of drawables rooted at an invisible group.
//!
//! Edges go from parent → child and carry a z key: a rank in the top byte
//! and an insertion sequence below it. Siblings paint in key order, so a
//! lower rank always stays underneath and equal ranks stack by insertion.

use crate::drawable::{Drawable, DrawableRole, Shape};
use fgc_core::NodeId;
use kurbo::{Affine, Point, Rect, Size};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

const SEQ_BITS: u32 = 56;
/// Id of the root group. Kept out of the id index so client ids never clash
/// with it.
const ROOT_ID: &str = "__layer_root";

#[derive(Debug, Clone)]
pub struct Layer {
    graph: StableDiGraph<Drawable, u64>,
    root: NodeIndex,
    /// Index from drawable id → graph index for fast lookup.
    id_index: HashMap<NodeId, NodeIndex>,
    next_seq: u64,
}

impl Default for Layer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer {
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(Drawable::new(
            NodeId::intern(ROOT_ID),
            DrawableRole::Root,
            Shape::Group { size: Size::ZERO },
        ));
        Self {
            graph,
            root,
            id_index: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Add `drawable` as the topmost rank-0 child of `parent`.
    pub fn add(&mut self, parent: NodeIndex, drawable: Drawable) -> NodeIndex {
        self.add_ranked(parent, drawable, 0)
    }

    /// Add `drawable` above every sibling of rank `<= rank` and below every
    /// sibling of a higher rank.
    ///
    /// A drawable already registered under the same id is destroyed first so
    /// the id index never points at two drawables.
    pub fn add_ranked(&mut self, parent: NodeIndex, drawable: Drawable, rank: u8) -> NodeIndex {
        let id = drawable.id;
        if self.id_index.contains_key(&id) {
            log::warn!("layer: replacing existing drawable {id}");
            self.destroy(id);
        }
        let idx = self.graph.add_node(drawable);
        let z = (u64::from(rank) << SEQ_BITS) | self.next_seq;
        self.graph.add_edge(parent, idx, z);
        self.next_seq += 1;
        self.id_index.insert(id, idx);
        idx
    }

    /// Add `drawable` directly under the root.
    pub fn add_top_level(&mut self, drawable: Drawable) -> NodeIndex {
        self.add(self.root, drawable)
    }

    pub fn get(&self, id: NodeId) -> Option<&Drawable> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Drawable> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn drawable(&self, idx: NodeIndex) -> &Drawable {
        &self.graph[idx]
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).next()
    }

    /// Children of `idx` in z-order (bottom first).
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(u64, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (*e.weight(), e.target()))
            .collect();
        edges.sort_unstable_by_key(|(z, _)| *z);
        edges.into_iter().map(|(_, child)| child).collect()
    }

    /// Children ids of the drawable `id`, in z-order.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.index_of(id)
            .map(|idx| {
                self.children(idx)
                    .into_iter()
                    .map(|c| self.graph[c].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ids of the drawables directly under the root, in z-order.
    pub fn top_level(&self) -> Vec<NodeId> {
        self.children(self.root)
            .into_iter()
            .map(|c| self.graph[c].id)
            .collect()
    }

    /// Every drawable (root excluded) matching `pred`, in paint order.
    pub fn find(&self, mut pred: impl FnMut(&Drawable) -> bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(self.root, &mut |d| {
            if pred(d) {
                out.push(d.id);
            }
        });
        out
    }

    fn walk(&self, idx: NodeIndex, visit: &mut dyn FnMut(&Drawable)) {
        if idx != self.root {
            visit(&self.graph[idx]);
        }
        for child in self.children(idx) {
            self.walk(child, visit);
        }
    }

    /// Top-level drawable containing `id` (itself when directly under root).
    pub fn top_level_of(&self, id: NodeId) -> Option<NodeId> {
        let mut idx = self.index_of(id)?;
        while let Some(parent) = self.parent(idx) {
            if parent == self.root {
                return Some(self.graph[idx].id);
            }
            idx = parent;
        }
        None
    }

    /// Transform from `idx`'s coordinates into stage pixels.
    pub fn absolute_transform(&self, idx: NodeIndex) -> Affine {
        let mut transform = Affine::IDENTITY;
        let mut current = Some(idx);
        while let Some(i) = current {
            if i == self.root {
                break;
            }
            transform = self.graph[i].local_transform() * transform;
            current = self.parent(i);
        }
        transform
    }

    /// Stage-pixel position of the drawable's origin.
    pub fn absolute_position(&self, id: NodeId) -> Option<Point> {
        let idx = self.index_of(id)?;
        Some(self.absolute_transform(idx) * Point::ORIGIN)
    }

    /// Axis-aligned stage-pixel bounds of the drawable's own shape.
    pub fn absolute_bounds(&self, id: NodeId) -> Option<Rect> {
        let idx = self.index_of(id)?;
        let local = self.graph[idx].shape.local_bounds();
        Some(self.absolute_transform(idx).transform_rect_bbox(local))
    }

    /// Remove `id` and its whole subtree. Returns whether it existed.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let mut stack = vec![idx];
        let mut doomed = Vec::new();
        while let Some(i) = stack.pop() {
            stack.extend(self.graph.neighbors_directed(i, Direction::Outgoing));
            doomed.push(i);
        }
        for i in doomed {
            if let Some(removed) = self.graph.remove_node(i) {
                self.id_index.remove(&removed.id);
            }
        }
        log::trace!("layer: destroyed {id}");
        true
    }

    /// Destroy every drawable except the root.
    pub fn clear(&mut self) {
        for child in self.children(self.root) {
            let id = self.graph[child].id;
            self.destroy(id);
        }
    }

    /// Number of drawables, root excluded.
    pub fn len(&self) -> usize {
        self.graph.node_count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
