//! Scene Graph Manager: keeps the drawable layer in step with the store.
//!
//! The manager owns the layer and reads nodes from the shared store. Store
//! mutations are pulled from the store's journal by `apply_store_events`;
//! creation is idempotent (an existing drawable is updated in place).
//!
//! Move images and video thumbnails are created asynchronously: creation
//! only queues a `PendingLoad`, the session awaits the loader and hands the
//! result back to `attach_loaded_image`, which re-checks that the node still
//! exists and still wants the same source before drawing anything.

use crate::assets::LoadedImage;
use crate::error::AssetError;
use crate::store::{NodeDataStore, StoreEvent};
use crate::tools::Interaction;
use fgc_core::anchor::{anchor_point, anchor_points};
use fgc_core::units::{
    move_image_scale, numpad_block_size, numpad_icon_frame, offset_to_pixels, to_pixels,
    to_viewport,
};
use fgc_core::{
    Anchor, AnchorSide, Arrow, CanvasNode, EngineConfig, NodeId, NodePatch, NumpadBlock, Text,
    UserSettings, Video, compile, youtube_thumbnail_url,
};
use fgc_scene::{Drawable, DrawableRole, Hit, Layer, NodeIndex, Shape};
use kurbo::{Point, Rect, Size, Vec2};
use std::collections::HashMap;
use std::rc::Rc;

const BLOCK_FILL: &str = "oklch(0.45 0.02 264.15)";
const TEXT_PADDING: f64 = 8.0;
/// Rank above every node kind: transformer frames and in-progress arrows.
pub const OVERLAY_RANK: u8 = u8::MAX;

/// An image the scene is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    pub id: NodeId,
    pub src: String,
}

/// Result of removing a node's drawable.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub removed: bool,
    /// Arrows drawn against the removed node.
    pub cascade: Vec<NodeId>,
}

/// An editor the host shows over the canvas while a feature is active.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOverlay {
    /// Multi-line editor in place of a text node's label, rotated about
    /// `origin` by `rotation` degrees.
    TextEditor {
        node: NodeId,
        origin: Point,
        size: Size,
        rotation: f64,
        text: String,
        font_size: f64,
    },
    /// Embedded player over a video thumbnail.
    VideoPlayer {
        node: NodeId,
        video_id: String,
        bounds: Rect,
    },
}

impl HostOverlay {
    pub fn node(&self) -> NodeId {
        match self {
            HostOverlay::TextEditor { node, .. } | HostOverlay::VideoPlayer { node, .. } => *node,
        }
    }
}

pub struct SceneManager {
    store: Rc<NodeDataStore>,
    layer: Layer,
    settings: UserSettings,
    config: EngineConfig,
    pending: Vec<PendingLoad>,
    /// Loads handed out and not yet attached, by node id.
    loading: HashMap<NodeId, String>,
    overlay: Option<HostOverlay>,
}

impl SceneManager {
    pub fn new(store: Rc<NodeDataStore>, settings: UserSettings, config: EngineConfig) -> Self {
        Self {
            store,
            layer: Layer::new(),
            settings,
            config,
            pending: Vec::new(),
            loading: HashMap::new(),
            overlay: None,
        }
    }

    pub fn store(&self) -> &NodeDataStore {
        &self.store
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut Layer {
        &mut self.layer
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The overlay the host should currently show, if any.
    pub fn overlay(&self) -> Option<&HostOverlay> {
        self.overlay.as_ref()
    }

    pub fn set_overlay(&mut self, overlay: HostOverlay) {
        log::debug!("scene: overlay for {}", overlay.node());
        self.overlay = Some(overlay);
    }

    /// Drop the overlay if it belongs to `node`.
    pub fn clear_overlay(&mut self, node: NodeId) {
        if self.overlay.as_ref().is_some_and(|o| o.node() == node) {
            self.overlay = None;
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Rebuild every drawable from the store in render order.
    ///
    /// Journal entries recorded up to now are discarded: the rebuild already
    /// reflects them.
    pub fn initialize_from_store(&mut self) {
        self.store.take_events();
        self.layer.clear();
        self.pending.clear();
        self.loading.clear();
        let nodes = self.store.ordered();
        log::debug!("scene: initializing {} nodes", nodes.len());
        for node in &nodes {
            self.create_node(node);
        }
    }

    /// Create the drawable for `node`, or update it when one already exists.
    pub fn upsert(&mut self, node: &CanvasNode) {
        let id = node.id();
        if self.layer.contains(id) {
            self.update_existing(node);
        } else if self.is_loading(id) {
            // A changed source re-queues; anything else waits for the attach
            // to read the latest node.
            if let Some(src) = self.image_src(node)
                && !self.is_loading_src(id, &src)
            {
                self.queue_load(id, src);
            }
        } else {
            self.create_node(node);
        }
    }

    pub fn create_node(&mut self, node: &CanvasNode) {
        match node {
            CanvasNode::NumpadBlock(block) => self.build_block(block),
            CanvasNode::Arrow(arrow) => self.build_arrow(arrow),
            CanvasNode::Text(text) => self.build_text(text),
            CanvasNode::CharacterMoveImage(_) | CanvasNode::Video(_) => {
                match self.image_src(node) {
                    Some(src) => self.queue_load(node.id(), src),
                    None => log::debug!("scene: {} has no loadable source", node.id()),
                }
            }
        }
    }

    pub fn update_existing(&mut self, node: &CanvasNode) {
        let id = node.id();
        match node {
            CanvasNode::NumpadBlock(block) => self.reskin_block(block),
            CanvasNode::Arrow(arrow) => {
                self.update_arrow(arrow);
                return;
            }
            CanvasNode::Text(text) => self.reskin_text(text),
            CanvasNode::CharacterMoveImage(_) | CanvasNode::Video(_) => {
                let wanted = self.image_src(node);
                let current = self.layer.get(id).and_then(|d| match &d.shape {
                    Shape::Image { src, .. } => Some(src.clone()),
                    _ => None,
                });
                if wanted != current {
                    self.layer.destroy(id);
                    match wanted {
                        Some(src) => self.queue_load(id, src),
                        None => log::debug!("scene: {id} lost its source"),
                    }
                    return;
                }
                self.place_image(node);
            }
        }
        self.refresh_arrows_touching(id);
    }

    /// Remove `node`'s drawable and any load still pending for it.
    pub fn delete_node(&mut self, node: &CanvasNode) -> DeleteOutcome {
        let id = node.id();
        self.pending.retain(|p| p.id != id);
        self.loading.remove(&id);
        let cascade = match node {
            CanvasNode::Arrow(_) => Vec::new(),
            _ => self.arrows_touching(id),
        };
        let removed = self.layer.destroy(id);
        log::debug!("scene: removed {id} (drawn: {removed}, arrows: {})", cascade.len());
        DeleteOutcome { removed, cascade }
    }

    /// Drain the store journal into the layer.
    ///
    /// Returns arrows left dangling by removals that are still in the store
    /// and not already being deleted; the caller deletes them through the
    /// store.
    pub fn apply_store_events(&mut self) -> Vec<NodeId> {
        let mut upserts: Vec<NodeId> = Vec::new();
        let mut dangling: Vec<NodeId> = Vec::new();
        for event in self.store.take_events() {
            match event {
                StoreEvent::Added(id) | StoreEvent::Updated(id) => {
                    if !upserts.contains(&id) {
                        upserts.push(id);
                    }
                }
                StoreEvent::Removed(node) => {
                    upserts.retain(|u| *u != node.id());
                    dangling.extend(self.delete_node(&node).cascade);
                }
            }
        }

        let mut nodes: Vec<CanvasNode> = upserts
            .into_iter()
            .filter_map(|id| self.store.get(id))
            .collect();
        nodes.sort_by_key(|n| n.kind().render_rank());
        for node in &nodes {
            self.upsert(node);
        }

        let mut follow_up = Vec::new();
        for arrow in dangling {
            if follow_up.contains(&arrow) {
                continue;
            }
            if !self.store.contains(arrow) {
                self.layer.destroy(arrow);
            } else if !self.store.is_deleting(arrow) {
                follow_up.push(arrow);
            }
        }
        follow_up
    }

    // ─── Images ──────────────────────────────────────────────────────────

    /// Hand out queued loads. Each is expected back in `attach_loaded_image`.
    pub fn take_pending_loads(&mut self) -> Vec<PendingLoad> {
        let loads = std::mem::take(&mut self.pending);
        for load in &loads {
            self.loading.insert(load.id, load.src.clone());
        }
        loads
    }

    pub fn has_pending_loads(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Draw a finished load. Discarded when the node was deleted or now
    /// wants another source in the meantime.
    pub fn attach_loaded_image(
        &mut self,
        load: &PendingLoad,
        result: Result<LoadedImage, AssetError>,
    ) -> bool {
        if self.loading.get(&load.id) == Some(&load.src) {
            self.loading.remove(&load.id);
        }
        let image = match result {
            Ok(image) => image,
            Err(e) => {
                log::warn!("scene: image for {} failed: {e}", load.id);
                return false;
            }
        };
        let Some(node) = self.store.get(load.id) else {
            log::debug!("scene: {} was deleted while its image loaded", load.id);
            return false;
        };
        if self.image_src(&node).as_deref() != Some(load.src.as_str()) {
            log::debug!("scene: stale image {} for {}", load.src, load.id);
            return false;
        }
        if self.layer.contains(load.id) {
            return false;
        }

        let size = Size::new(image.width, image.height);
        let (role, scale) = match &node {
            CanvasNode::CharacterMoveImage(img) => {
                let fit = move_image_scale(image.height, &self.settings);
                (
                    DrawableRole::MoveImage,
                    (img.scale_x.unwrap_or(fit), img.scale_y.unwrap_or(fit)),
                )
            }
            CanvasNode::Video(video) => (DrawableRole::Video, (video.scale_x, video.scale_y)),
            _ => return false,
        };
        let drawable = Drawable::new(
            load.id,
            role,
            Shape::Image {
                src: load.src.clone(),
                size,
            },
        )
        .scaled(scale.0, scale.1)
        .draggable();
        self.add_node_drawable(drawable, &node);
        self.place_image(&node);
        self.refresh_arrows_touching(load.id);
        true
    }

    fn image_src(&self, node: &CanvasNode) -> Option<String> {
        match node {
            CanvasNode::CharacterMoveImage(img) => {
                Some(self.config.asset_url(&img.image_ref.file_path))
            }
            CanvasNode::Video(Video { src, .. }) => youtube_thumbnail_url(src),
            _ => None,
        }
    }

    fn is_loading(&self, id: NodeId) -> bool {
        self.loading.contains_key(&id) || self.pending.iter().any(|p| p.id == id)
    }

    fn is_loading_src(&self, id: NodeId, src: &str) -> bool {
        self.loading.get(&id).is_some_and(|s| s == src)
            || self.pending.iter().any(|p| p.id == id && p.src == src)
    }

    fn queue_load(&mut self, id: NodeId, src: String) {
        log::trace!("scene: queue load {src} for {id}");
        self.pending.retain(|p| p.id != id);
        self.pending.push(PendingLoad { id, src });
    }

    /// Position and rotation of an attached image; scale only when stored.
    fn place_image(&mut self, node: &CanvasNode) {
        let Some(position) = node.position() else {
            return;
        };
        let pixel = to_pixels(position, &self.settings);
        let Some(d) = self.layer.get_mut(node.id()) else {
            return;
        };
        d.set_position(pixel);
        match node {
            CanvasNode::CharacterMoveImage(img) => {
                d.rotation = img.rotation;
                if let (Some(sx), Some(sy)) = (img.scale_x, img.scale_y) {
                    (d.scale_x, d.scale_y) = (sx, sy);
                }
            }
            CanvasNode::Video(video) => {
                d.rotation = video.rotation;
                (d.scale_x, d.scale_y) = (video.scale_x, video.scale_y);
            }
            _ => {}
        }
    }

    fn add_node_drawable(&mut self, drawable: Drawable, node: &CanvasNode) -> NodeIndex {
        let root = self.layer.root();
        self.layer
            .add_ranked(root, drawable, node.kind().render_rank())
    }

    // ─── Numpad blocks ───────────────────────────────────────────────────

    fn build_block(&mut self, block: &NumpadBlock) {
        let (size, children) = self.block_children(block);
        let group = Drawable::new(block.id, DrawableRole::NumpadBlock, Shape::Group { size })
            .at(to_pixels(Point::new(block.x, block.y), &self.settings))
            .draggable();
        let idx = self.add_node_drawable(group, &CanvasNode::NumpadBlock(block.clone()));
        for child in children {
            self.layer.add(idx, child);
        }
    }

    /// Move the block and re-skin it in place when its icons or size changed.
    /// Anchors that were showing stay showing.
    fn reskin_block(&mut self, block: &NumpadBlock) {
        let (size, mut children) = self.block_children(block);
        let pixel = to_pixels(Point::new(block.x, block.y), &self.settings);
        let Some(idx) = self.layer.index_of(block.id) else {
            return;
        };

        let old: Vec<&Drawable> = self
            .layer
            .children(idx)
            .into_iter()
            .map(|c| self.layer.drawable(c))
            .collect();
        let icons = |ds: &[&Drawable]| -> Vec<String> {
            ds.iter()
                .filter(|d| d.role == DrawableRole::CommandIcon)
                .filter_map(|d| match &d.shape {
                    Shape::Image { src, .. } => Some(src.clone()),
                    _ => None,
                })
                .collect()
        };
        let unchanged = self.layer.drawable(idx).shape == Shape::Group { size }
            && icons(&old) == icons(&children.iter().collect::<Vec<_>>());
        let shown: Vec<NodeId> = old
            .iter()
            .filter(|d| d.role.is_anchor() && d.visible)
            .map(|d| d.id)
            .collect();
        let old_ids: Vec<NodeId> = old.iter().map(|d| d.id).collect();

        if let Some(group) = self.layer.get_mut(block.id) {
            group.set_position(pixel);
            group.shape = Shape::Group { size };
        }
        if unchanged {
            return;
        }
        log::debug!("scene: re-skinning block {}", block.id);
        for id in old_ids {
            self.layer.destroy(id);
        }
        for child in &mut children {
            if shown.contains(&child.id) {
                child.visible = true;
            }
        }
        for child in children {
            self.layer.add(idx, child);
        }
    }

    /// Background, icons and hidden anchors of a block, in block coordinates.
    fn block_children(&self, block: &NumpadBlock) -> (Size, Vec<Drawable>) {
        let tokens = compile(&block.input, block.controller_type);
        let size = numpad_block_size(tokens.len(), &self.settings);
        let mut children = vec![Drawable::new(
            block.id.child("background"),
            DrawableRole::BlockBackground,
            Shape::Rect {
                size,
                fill: BLOCK_FILL.to_owned(),
            },
        )];
        for (i, token) in tokens.iter().enumerate() {
            let frame = numpad_icon_frame(i, &self.settings);
            children.push(
                Drawable::new(
                    block.id.child(&format!("icon-{i}")),
                    DrawableRole::CommandIcon,
                    Shape::Image {
                        src: self.config.asset_url(&token.icon_path()),
                        size: frame.size(),
                    },
                )
                .at(frame.origin()),
            );
        }
        for (side, p) in anchor_points(size.to_rect(), self.config.anchor_gap) {
            children.push(self.anchor_drawable(block.id, side, p));
        }
        (size, children)
    }

    fn anchor_drawable(&self, owner: NodeId, side: AnchorSide, at: Point) -> Drawable {
        Drawable::new(
            owner.child(&format!("anchor-{}", side.as_str())),
            DrawableRole::AnchorPoint(side),
            Shape::Circle {
                radius: self.config.anchor_radius,
            },
        )
        .at(at)
        .hidden()
    }

    // ─── Text ────────────────────────────────────────────────────────────

    fn text_children(&self, text: &Text) -> (Size, Vec<Drawable>) {
        let label = Shape::Text {
            content: text.text.clone(),
            font_size: text.font_size,
        };
        let size = label.local_bounds().size() + Size::new(TEXT_PADDING * 2.0, TEXT_PADDING * 2.0);
        let children = vec![
            Drawable::new(
                text.id.child("background"),
                DrawableRole::BlockBackground,
                Shape::Rect {
                    size,
                    fill: text.background_color.clone(),
                },
            ),
            Drawable::new(text.id.child("label"), DrawableRole::TextBlock, label)
                .at(Point::new(TEXT_PADDING, TEXT_PADDING)),
        ];
        (size, children)
    }

    fn build_text(&mut self, text: &Text) {
        let (size, children) = self.text_children(text);
        let mut group = Drawable::new(text.id, DrawableRole::TextBlock, Shape::Group { size })
            .at(to_pixels(Point::new(text.x, text.y), &self.settings))
            .draggable();
        group.rotation = text.rotation;
        let idx = self.add_node_drawable(group, &CanvasNode::Text(text.clone()));
        for child in children {
            self.layer.add(idx, child);
        }
    }

    fn reskin_text(&mut self, text: &Text) {
        let (size, children) = self.text_children(text);
        let pixel = to_pixels(Point::new(text.x, text.y), &self.settings);
        let Some(idx) = self.layer.index_of(text.id) else {
            return;
        };
        if let Some(group) = self.layer.get_mut(text.id) {
            group.set_position(pixel);
            group.rotation = text.rotation;
            group.shape = Shape::Group { size };
        }
        for id in self.layer.children_of(text.id) {
            self.layer.destroy(id);
        }
        for child in children {
            self.layer.add(idx, child);
        }
    }

    // ─── Arrows ──────────────────────────────────────────────────────────

    fn build_arrow(&mut self, arrow: &Arrow) {
        let Some((origin, points)) = self.arrow_geometry(arrow) else {
            log::debug!(
                "scene: arrow {} waits for start node {}",
                arrow.id,
                arrow.start_node_id
            );
            return;
        };
        let drawable = Drawable::new(arrow.id, DrawableRole::Arrow, Shape::Arrow { points })
            .at(origin)
            .linked(std::iter::once(arrow.start_node_id).chain(arrow.end_node_id));
        self.add_node_drawable(drawable, &CanvasNode::Arrow(arrow.clone()));
    }

    fn update_arrow(&mut self, arrow: &Arrow) {
        if !self.layer.contains(arrow.id) {
            self.build_arrow(arrow);
            return;
        }
        let Some((origin, points)) = self.arrow_geometry(arrow) else {
            log::debug!("scene: arrow {} lost its start anchor, left as is", arrow.id);
            return;
        };
        if let Some(d) = self.layer.get_mut(arrow.id) {
            d.set_position(origin);
            d.shape = Shape::Arrow { points };
            d.links = std::iter::once(arrow.start_node_id)
                .chain(arrow.end_node_id)
                .collect();
        }
    }

    /// Origin and a freshly built pixel point list for `arrow`.
    ///
    /// A bound arrow's last point follows the end node's live anchor; when
    /// that anchor is unavailable the stored end is kept.
    fn arrow_geometry(&self, arrow: &Arrow) -> Option<(Point, Vec<f64>)> {
        let origin = self.anchor_position(arrow.start_node_id, arrow.start_anchor)?;
        let mut points: Vec<f64> = arrow
            .points
            .chunks_exact(2)
            .flat_map(|pair| {
                let v = offset_to_pixels(Vec2::new(pair[0], pair[1]), &self.settings);
                [v.x, v.y]
            })
            .collect();
        if points.len() < 4 {
            points = vec![0.0; 4];
        }

        if let Some(end_node) = arrow.end_node_id {
            let n = points.len();
            let stored_end = origin + Vec2::new(points[n - 2], points[n - 1]);
            let side = arrow
                .end_anchor
                .or_else(|| self.nearest_anchor_side(end_node, stored_end));
            match side.and_then(|s| self.anchor_position(end_node, s)) {
                Some(end) => {
                    let d = end - origin;
                    points.truncate(n - 2);
                    points.extend([d.x, d.y]);
                }
                None => log::debug!(
                    "scene: arrow {} keeps its stored end, {end_node} has no anchor",
                    arrow.id
                ),
            }
        }
        Some((origin, points))
    }

    // ─── Anchors ─────────────────────────────────────────────────────────

    /// Live pixel position of `node`'s anchor on `side`.
    pub fn anchor_position(&self, node: NodeId, side: AnchorSide) -> Option<Point> {
        let Some(bounds) = self.layer.absolute_bounds(node) else {
            log::debug!("scene: no drawable for {node}, anchor {} unavailable", side.as_str());
            return None;
        };
        Some(anchor_point(bounds, self.config.anchor_gap, side))
    }

    fn nearest_anchor_side(&self, node: NodeId, to: Point) -> Option<AnchorSide> {
        let bounds = self.layer.absolute_bounds(node)?;
        anchor_points(bounds, self.config.anchor_gap)
            .into_iter()
            .min_by(|a, b| a.1.distance(to).total_cmp(&b.1.distance(to)))
            .map(|(side, _)| side)
    }

    fn anchor_of(&self, id: NodeId) -> Option<Anchor> {
        let d = self.layer.get(id)?;
        let DrawableRole::AnchorPoint(side) = d.role else {
            return None;
        };
        Some(Anchor {
            owner: self.layer.top_level_of(id)?,
            side,
            position: self.layer.absolute_position(id)?,
        })
    }

    /// Anchor markers drawn for `node`, shown or not.
    pub fn anchors_of(&self, node: NodeId) -> Vec<Anchor> {
        self.layer
            .children_of(node)
            .into_iter()
            .filter_map(|id| self.anchor_of(id))
            .collect()
    }

    /// Every anchor marker currently shown, in paint order.
    pub fn visible_anchors(&self) -> Vec<Anchor> {
        self.layer
            .find(|d| d.visible && d.role.is_anchor())
            .into_iter()
            .filter_map(|id| self.anchor_of(id))
            .collect()
    }

    fn set_anchors_visible(&mut self, visible: bool, mut owner_filter: impl FnMut(NodeId) -> bool) {
        for id in self.layer.find(|d| d.role.is_anchor()) {
            let Some(owner) = self.layer.top_level_of(id) else {
                continue;
            };
            if !owner_filter(owner) {
                continue;
            }
            if let Some(d) = self.layer.get_mut(id) {
                d.visible = visible;
            }
        }
    }

    pub fn show_anchors(&mut self, node: NodeId) {
        self.set_anchors_visible(true, |owner| owner == node);
    }

    pub fn show_anchors_except(&mut self, node: NodeId) {
        self.set_anchors_visible(true, |owner| owner != node);
    }

    pub fn hide_all_anchors(&mut self) {
        self.set_anchors_visible(false, |_| true);
    }

    /// Drawn arrows attached to `node` at either end.
    pub fn arrows_touching(&self, node: NodeId) -> Vec<NodeId> {
        self.layer
            .find(|d| d.role == DrawableRole::Arrow && d.links_to(node))
    }

    /// Recompute every stored arrow attached to `node`, drawing the ones
    /// that could not be drawn before.
    pub fn refresh_arrows_touching(&mut self, node: NodeId) {
        for id in self.store.arrows_referencing(node) {
            if let Some(CanvasNode::Arrow(arrow)) = self.store.get(id) {
                self.update_arrow(&arrow);
            }
        }
    }

    // ─── Interaction ─────────────────────────────────────────────────────

    /// Move `id` so its top-left sits at `pixel`, writing the position to
    /// the store and recomputing attached arrows.
    pub fn drag_to(&mut self, id: NodeId, pixel: Point) -> bool {
        if !self.store.contains(id) || self.store.is_deleting(id) {
            return false;
        }
        let vu = to_viewport(pixel, &self.settings);
        self.store.update(id, &NodePatch::position(vu.x, vu.y));
        if let Some(d) = self.layer.get_mut(id) {
            d.set_position(pixel);
        }
        self.refresh_arrows_touching(id);
        true
    }

    /// What a click on `hit` should do.
    pub fn handle_click(&self, hit: Option<Hit>) -> Interaction {
        let Some(hit) = hit else {
            return Interaction::Deactivate;
        };
        if hit.role.is_anchor() {
            return Interaction::Nothing;
        }
        match hit.owner_role {
            DrawableRole::NumpadBlock => Interaction::HighlightAnchors(hit.owner),
            DrawableRole::MoveImage | DrawableRole::Video | DrawableRole::TextBlock => {
                Interaction::Transform(hit.owner)
            }
            DrawableRole::Arrow => Interaction::SelectArrow(hit.owner),
            _ => Interaction::Nothing,
        }
    }

    /// Double-clicking text edits it; double-clicking a video plays it.
    pub fn handle_double_click(&self, hit: Option<Hit>) -> Interaction {
        let Some(hit) = hit else {
            return Interaction::Nothing;
        };
        match hit.owner_role {
            DrawableRole::TextBlock => Interaction::EditText(hit.owner),
            DrawableRole::Video => Interaction::PlayVideo(hit.owner),
            _ => Interaction::Nothing,
        }
    }

    /// Pressing on a shown anchor starts an arrow from it.
    pub fn handle_pointer_down(&self, hit: Option<Hit>) -> Interaction {
        match hit {
            Some(Hit {
                role: DrawableRole::AnchorPoint(side),
                owner,
                ..
            }) => Interaction::DrawArrow { from: owner, side },
            _ => Interaction::Nothing,
        }
    }

    pub fn handle_drag_start(&self, id: NodeId) -> Interaction {
        if self.layer.get(id).is_some_and(|d| d.draggable) {
            Interaction::Drag(id)
        } else {
            Interaction::Nothing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fgc_core::{ControllerType, ImageRef};
    use pretty_assertions::assert_eq;

    fn settings() -> UserSettings {
        UserSettings {
            viewport_width_unit: 1000.0,
            viewport_height_unit: 1000.0,
            ..UserSettings::default()
        }
    }

    fn scene() -> SceneManager {
        SceneManager::new(
            Rc::new(NodeDataStore::new()),
            settings(),
            EngineConfig::default(),
        )
    }

    fn block(id: &str, input: &str, x: f64, y: f64) -> CanvasNode {
        CanvasNode::NumpadBlock(NumpadBlock {
            id: NodeId::intern(id),
            input: input.to_owned(),
            controller_type: ControllerType::Classic,
            x,
            y,
        })
    }

    fn image(id: &str, path: &str) -> CanvasNode {
        CanvasNode::CharacterMoveImage(fgc_core::CharacterMoveImage {
            id: NodeId::intern(id),
            x: 0.5,
            y: 0.1,
            image_ref: ImageRef {
                file_name: None,
                file_path: path.to_owned(),
                width: 400.0,
                height: 400.0,
                character_id: None,
            },
            scale_x: None,
            scale_y: None,
            rotation: 0.0,
        })
    }

    fn free_arrow(id: &str, start: &str, points: Vec<f64>) -> CanvasNode {
        CanvasNode::Arrow(Arrow {
            id: NodeId::intern(id),
            start_node_id: NodeId::intern(start),
            end_node_id: None,
            points,
            start_anchor: AnchorSide::Right,
            end_anchor: None,
        })
    }

    #[test]
    fn block_gets_background_icons_and_hidden_anchors() {
        let mut scene = scene();
        scene.store().add(block("sm-b1", "236p", 0.1, 0.2));
        scene.apply_store_events();

        let id = NodeId::intern("sm-b1");
        let d = scene.layer().get(id).expect("block drawn");
        assert_eq!(d.position(), Point::new(100.0, 200.0));
        let children = scene.layer().children_of(id);
        // background + 4 icons + 4 anchors
        assert_eq!(children.len(), 9);
        assert!(scene.visible_anchors().is_empty());
        assert_eq!(scene.anchors_of(id).len(), 4);
    }

    #[test]
    fn reskin_keeps_group_and_shown_anchors() {
        let mut scene = scene();
        scene.store().add(block("sm-b2", "5p", 0.0, 0.0));
        scene.apply_store_events();
        let id = NodeId::intern("sm-b2");
        let before = scene.layer().index_of(id);
        scene.show_anchors(id);

        scene.store().update(id, &NodePatch::input("236p"));
        scene.apply_store_events();

        assert_eq!(scene.layer().index_of(id), before);
        assert_eq!(scene.visible_anchors().len(), 4);
        let right = scene
            .anchor_position(id, AnchorSide::Right)
            .expect("right anchor");
        // 4 icons: width (4 + 1/3) * 3 * 10 = 130, plus gap 16
        assert!((right.x - 146.0).abs() < 1e-9);
    }

    #[test]
    fn free_arrow_converts_offsets_to_pixels() {
        let mut scene = scene();
        scene.store().add(block("sm-b3", "5p", 0.0, 0.0));
        scene
            .store()
            .add(free_arrow("sm-a3", "sm-b3", vec![0.0, 0.0, 0.1, 0.05]));
        scene.apply_store_events();

        let arrow = scene.layer().get(NodeId::intern("sm-a3")).expect("arrow");
        assert_eq!(arrow.arrow_points(), Some(&[0.0, 0.0, 100.0, 50.0][..]));
        let origin = scene
            .anchor_position(NodeId::intern("sm-b3"), AnchorSide::Right)
            .expect("anchor");
        assert_eq!(arrow.position(), origin);
    }

    #[test]
    fn bound_arrow_follows_dragged_end_node() {
        let mut scene = scene();
        scene.store().add(block("sm-s", "5p", 0.0, 0.0));
        scene.store().add(block("sm-e", "5p", 0.3, 0.0));
        scene.store().add(CanvasNode::Arrow(Arrow {
            id: NodeId::intern("sm-bound"),
            start_node_id: NodeId::intern("sm-s"),
            end_node_id: Some(NodeId::intern("sm-e")),
            points: vec![0.0, 0.0, 0.0, 0.0],
            start_anchor: AnchorSide::Right,
            end_anchor: Some(AnchorSide::Left),
        }));
        scene.apply_store_events();

        let end = NodeId::intern("sm-e");
        assert!(scene.drag_to(end, Point::new(400.0, 100.0)));
        let origin = scene
            .anchor_position(NodeId::intern("sm-s"), AnchorSide::Right)
            .expect("start");
        let target = scene.anchor_position(end, AnchorSide::Left).expect("end");
        let d = scene.layer().get(NodeId::intern("sm-bound")).expect("arrow");
        let points = d.arrow_points().expect("points");
        assert_eq!(points[2], target.x - origin.x);
        assert_eq!(points[3], target.y - origin.y);
        assert_eq!(
            scene.store().get(end).and_then(|n| n.position()),
            Some(Point::new(0.4, 0.1))
        );
    }

    #[test]
    fn arrow_without_start_drawable_is_skipped() {
        let mut scene = scene();
        scene
            .store()
            .add(free_arrow("sm-orphan", "sm-nowhere", vec![0.0, 0.0, 0.1, 0.1]));
        scene.apply_store_events();
        assert!(!scene.layer().contains(NodeId::intern("sm-orphan")));
    }

    #[test]
    fn image_attached_after_load_draws_waiting_arrows() {
        let mut scene = scene();
        scene.store().add(image("sm-img", "/moves/ryu.png"));
        scene
            .store()
            .add(free_arrow("sm-a-img", "sm-img", vec![0.0, 0.0, 0.1, 0.0]));
        scene.apply_store_events();
        assert!(!scene.layer().contains(NodeId::intern("sm-a-img")));

        let loads = scene.take_pending_loads();
        assert_eq!(loads.len(), 1);
        let attached = scene.attach_loaded_image(
            &loads[0],
            Ok(LoadedImage {
                width: 400.0,
                height: 400.0,
            }),
        );
        assert!(attached);
        let d = scene.layer().get(NodeId::intern("sm-img")).expect("image");
        // 1000 * 0.2 / 400
        assert_eq!((d.scale_x, d.scale_y), (0.5, 0.5));
        assert!(scene.layer().contains(NodeId::intern("sm-a-img")));
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut scene = scene();
        scene.store().add(image("sm-stale", "/moves/old.png"));
        scene.apply_store_events();
        let loads = scene.take_pending_loads();
        scene.store().add(image("sm-stale", "/moves/new.png"));
        scene.apply_store_events();

        let ok = Ok(LoadedImage {
            width: 10.0,
            height: 10.0,
        });
        assert!(!scene.attach_loaded_image(&loads[0], ok.clone()));
        let fresh = scene.take_pending_loads();
        assert_eq!(fresh[0].src, "/moves/new.png");
        assert!(scene.attach_loaded_image(&fresh[0], ok));
    }

    #[test]
    fn click_routing() {
        let mut scene = scene();
        scene.store().add(block("sm-click", "5p", 0.0, 0.0));
        scene.apply_store_events();
        let id = NodeId::intern("sm-click");
        let hit = fgc_scene::hit_test(scene.layer(), Point::new(10.0, 10.0), 6.0);
        assert_eq!(scene.handle_click(hit), Interaction::HighlightAnchors(id));
        assert_eq!(scene.handle_click(None), Interaction::Deactivate);
        assert_eq!(scene.handle_drag_start(id), Interaction::Drag(id));
        assert_eq!(scene.handle_double_click(hit), Interaction::Nothing);

        scene
            .store()
            .add(free_arrow("sm-click-a", "sm-click", vec![0.0, 0.0, 0.1, 0.0]));
        scene.apply_store_events();
        let on_path = fgc_scene::hit_test(scene.layer(), Point::new(136.0, 31.0), 6.0);
        assert_eq!(
            scene.handle_click(on_path),
            Interaction::SelectArrow(NodeId::intern("sm-click-a"))
        );
    }
}
