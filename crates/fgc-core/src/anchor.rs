//! Anchor and arrow geometry (pixel space).
//!
//! Anchors are four connection points synthesized around a node's bounding
//! box. They are a UI affordance only: binding an arrow end to an anchor
//! records the anchor's *owning node*, plus which side it sits on.

use crate::id::NodeId;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Which side of a node's bounding box an anchor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorSide {
    #[default]
    Right,
    Left,
    Up,
    Down,
}

impl AnchorSide {
    /// Encounter order used for anchor synthesis and snap tie-breaking.
    pub const ALL: [AnchorSide; 4] = [
        AnchorSide::Right,
        AnchorSide::Left,
        AnchorSide::Up,
        AnchorSide::Down,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnchorSide::Right => "right",
            AnchorSide::Left => "left",
            AnchorSide::Up => "up",
            AnchorSide::Down => "down",
        }
    }
}

/// The four anchor points around `bounds`, `gap` pixels away from its edges.
pub fn anchor_points(bounds: Rect, gap: f64) -> [(AnchorSide, Point); 4] {
    let (x, y) = (bounds.x0, bounds.y0);
    let (w, h) = (bounds.width(), bounds.height());
    [
        (AnchorSide::Right, Point::new(x + w + gap, y + h / 2.0)),
        (AnchorSide::Left, Point::new(x - gap, y + h / 2.0)),
        (AnchorSide::Up, Point::new(x + w / 2.0, y - gap)),
        (AnchorSide::Down, Point::new(x + w / 2.0, y + h + gap)),
    ]
}

/// Position of one anchor of `bounds`.
pub fn anchor_point(bounds: Rect, gap: f64, side: AnchorSide) -> Point {
    let [right, left, up, down] = anchor_points(bounds, gap);
    match side {
        AnchorSide::Right => right.1,
        AnchorSide::Left => left.1,
        AnchorSide::Up => up.1,
        AnchorSide::Down => down.1,
    }
}

/// A live anchor candidate, in absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub owner: NodeId,
    pub side: AnchorSide,
    pub position: Point,
}

/// Nearest anchor to `pointer` within `threshold` pixels (inclusive).
///
/// Ties keep the first candidate found at the minimum distance. `None` means
/// the endpoint stays free.
pub fn snap(pointer: Point, candidates: &[Anchor], threshold: f64) -> Option<&Anchor> {
    let mut best: Option<(&Anchor, f64)> = None;
    for anchor in candidates {
        let d = anchor.position.distance(pointer);
        if d > threshold {
            continue;
        }
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((anchor, d)),
        }
    }
    best.map(|(anchor, _)| anchor)
}

/// A fresh two-point arrow path from `start` to `end`, relative to `start`.
pub fn relative_points(start: Point, end: Point) -> Vec<f64> {
    let d = end - start;
    vec![0.0, 0.0, d.x, d.y]
}

/// Convert a flat relative point list into absolute points.
pub fn absolute_points(origin: Point, points: &[f64]) -> Vec<Point> {
    points
        .chunks_exact(2)
        .map(|pair| origin + Vec2::new(pair[0], pair[1]))
        .collect()
}

/// Closest point to `p` on the segment `a`–`b`, and its distance.
pub fn closest_point_on_segment(p: Point, a: Point, b: Point) -> (Point, f64) {
    let ab = b - a;
    let len2 = ab.hypot2();
    let t = if len2 > 0.0 {
        ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = a + ab * t;
    (closest, closest.distance(p))
}

/// Nearest point on an arrow path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathHit {
    pub point: Point,
    pub distance: f64,
    /// Index of the segment (0 = first pair of points).
    pub segment: usize,
}

/// Closest point to `pointer` along a flat relative point list anchored at
/// `origin`. `None` when the path has fewer than two points.
pub fn closest_point_on_polyline(origin: Point, points: &[f64], pointer: Point) -> Option<PathHit> {
    let abs = absolute_points(origin, points);
    abs.windows(2)
        .enumerate()
        .map(|(segment, pair)| {
            let (point, distance) = closest_point_on_segment(pointer, pair[0], pair[1]);
            PathHit {
                point,
                distance,
                segment,
            }
        })
        .fold(None, |best: Option<PathHit>, hit| match best {
            Some(b) if b.distance <= hit.distance => Some(b),
            _ => Some(hit),
        })
}
