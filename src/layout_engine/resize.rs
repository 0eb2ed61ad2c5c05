//! Propagates a resize of one window across its snap group.
//!
//! Every window whose edge lies on the dragged edge line moves that edge with
//! it, so an inner edge trades space between its neighbours while an outer
//! edge grows or shrinks the whole row or column. Each axis is handled on its
//! own; a diagonal drag runs both passes against the original geometry and
//! combines the results.

use tracing::{trace, warn};

use super::graph::{Edge, Orientation};
use crate::model::WindowIdentity;
use crate::sys::geometry::{IsWithin, Rect, SameAs, Size};

#[derive(Clone, Debug, PartialEq)]
pub struct ResizeMember {
    pub identity: WindowIdentity,
    pub bounds: Rect,
    pub min_size: Size,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Span {
    start: f64,
    end: f64,
}

impl Span {
    fn len(&self) -> f64 { self.end - self.start }
}

/// An edge line that moved and still has to be applied to the windows on it.
#[derive(Clone, Copy, Debug)]
struct Shift {
    line: f64,
    delta: f64,
    /// Window whose edge lay on `line` before the shift.
    origin: usize,
    /// Whether that edge was the origin's end edge.
    ends_here: bool,
}

fn along(rect: &Rect, orientation: Orientation) -> Span {
    match orientation {
        Orientation::Horizontal => Span { start: rect.left, end: rect.right() },
        Orientation::Vertical => Span { start: rect.top, end: rect.bottom() },
    }
}

fn across(rect: &Rect, orientation: Orientation) -> Span {
    match orientation {
        Orientation::Horizontal => along(rect, Orientation::Vertical),
        Orientation::Vertical => along(rect, Orientation::Horizontal),
    }
}

fn min_along(size: Size, orientation: Orientation) -> f64 {
    match orientation {
        Orientation::Horizontal => size.width,
        Orientation::Vertical => size.height,
    }
}

fn edges(orientation: Orientation) -> (Edge, Edge) {
    match orientation {
        Orientation::Horizontal => (Edge::Left, Edge::Right),
        Orientation::Vertical => (Edge::Top, Edge::Bottom),
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ResizeCascade {
    tolerance: f64,
}

impl Default for ResizeCascade {
    fn default() -> Self { Self::new(0.5) }
}

impl ResizeCascade {
    /// `tolerance` is the distance below which two edges count as one line.
    pub fn new(tolerance: f64) -> Self { Self { tolerance } }

    /// Computes new bounds for the group after `dragged` was asked to take
    /// `requested`. Only members whose bounds change are returned.
    ///
    /// A request that keeps the size but changes the position translates the
    /// whole group.
    pub fn apply(
        &self,
        members: &[ResizeMember],
        dragged: &WindowIdentity,
        requested: Rect,
    ) -> Vec<(WindowIdentity, Rect)> {
        let Some(index) = members.iter().position(|m| &m.identity == dragged) else {
            warn!(%dragged, "resized window is not part of its group");
            return Vec::new();
        };
        let current = members[index].bounds;

        if requested.size().same_as(current.size()) {
            if requested.origin().same_as(current.origin()) {
                return Vec::new();
            }
            let (dx, dy) = (requested.left - current.left, requested.top - current.top);
            trace!(%dragged, dx, dy, "translating group");
            return members
                .iter()
                .map(|m| (m.identity.clone(), m.bounds.translate(dx, dy)))
                .collect();
        }

        let horizontal = self.cascade_axis(members, index, &requested, Orientation::Horizontal);
        let vertical = self.cascade_axis(members, index, &requested, Orientation::Vertical);

        members
            .iter()
            .zip(horizontal)
            .zip(vertical)
            .filter_map(|((member, h), v)| {
                let rect = Rect::new(h.start, v.start, h.len(), v.len());
                (!rect.same_as(member.bounds)).then(|| (member.identity.clone(), rect))
            })
            .collect()
    }

    fn cascade_axis(
        &self,
        members: &[ResizeMember],
        index: usize,
        requested: &Rect,
        orientation: Orientation,
    ) -> Vec<Span> {
        let mut spans: Vec<Span> = members.iter().map(|m| along(&m.bounds, orientation)).collect();
        let cross: Vec<Span> = members.iter().map(|m| across(&m.bounds, orientation)).collect();
        let mins: Vec<f64> = members.iter().map(|m| min_along(m.min_size, orientation)).collect();

        let target = along(requested, orientation);
        let (start_edge, end_edge) = edges(orientation);
        let start_delta = target.start - spans[index].start;
        let end_delta = target.end - spans[index].end;

        if !start_delta.same_as(0.0) {
            self.move_edge(&mut spans, &cross, &mins, index, start_edge, start_delta);
        }
        if !end_delta.same_as(0.0) {
            self.move_edge(&mut spans, &cross, &mins, index, end_edge, end_delta);
        }
        spans
    }

    fn move_edge(
        &self,
        spans: &mut [Span],
        cross: &[Span],
        mins: &[f64],
        index: usize,
        edge: Edge,
        delta: f64,
    ) {
        let own = spans[index];
        let delta = if edge.is_end() {
            delta.max(mins[index] - own.len())
        } else {
            delta.min(own.len() - mins[index])
        };
        if delta.same_as(0.0) {
            trace!(?edge, "drag fully absorbed by minimum size");
            return;
        }

        let line = if edge.is_end() { own.end } else { own.start };
        let mut pending = vec![Shift {
            line,
            delta,
            origin: index,
            ends_here: edge.is_end(),
        }];
        // Every window can be pushed at most once per pass.
        let mut budget = spans.len() + 1;

        while let Some(shift) = pending.pop() {
            if budget == 0 {
                warn!(?edge, "resize cascade did not settle");
                break;
            }
            budget -= 1;

            let (before, after) =
                self.edge_line(spans, cross, shift.line, shift.origin, shift.ends_here);
            let new_line = shift.line + shift.delta;
            trace!(line = shift.line, new_line, ?before, ?after, "moving edge line");

            for i in before {
                spans[i].end = new_line;
                if mins[i] - spans[i].len() > f64::EPSILON {
                    let old_start = spans[i].start;
                    spans[i].start = new_line - mins[i];
                    pending.push(Shift {
                        line: old_start,
                        delta: spans[i].start - old_start,
                        origin: i,
                        ends_here: false,
                    });
                }
            }
            for i in after {
                spans[i].start = new_line;
                if mins[i] - spans[i].len() > f64::EPSILON {
                    let old_end = spans[i].end;
                    spans[i].end = new_line + mins[i];
                    pending.push(Shift {
                        line: old_end,
                        delta: spans[i].end - old_end,
                        origin: i,
                        ends_here: true,
                    });
                }
            }
        }
    }

    /// Windows sharing the edge line through `line` with `origin`, as (ending
    /// on the line, starting on the line).
    ///
    /// Windows on opposite sides share the line where their cross spans
    /// overlap. Windows on the same side join when their spans meet and both
    /// either have a neighbour across the line or both lack one, so an inner
    /// edge never drags along an outer edge that only meets it at a corner.
    fn edge_line(
        &self,
        spans: &[Span],
        cross: &[Span],
        line: f64,
        origin: usize,
        origin_ends_here: bool,
    ) -> (Vec<usize>, Vec<usize>) {
        let mut nodes = vec![(origin, origin_ends_here)];
        for (i, span) in spans.iter().enumerate() {
            if i == origin {
                continue;
            }
            if span.end.is_within(self.tolerance, line) {
                nodes.push((i, true));
            } else if span.start.is_within(self.tolerance, line) {
                nodes.push((i, false));
            }
        }

        let paired: Vec<bool> = nodes
            .iter()
            .map(|&(i, side)| {
                nodes.iter().any(|&(j, other)| side != other && self.overlaps(cross[i], cross[j]))
            })
            .collect();
        let linked = |a: usize, b: usize| {
            let ((i, side_a), (j, side_b)) = (nodes[a], nodes[b]);
            if side_a != side_b {
                self.overlaps(cross[i], cross[j])
            } else {
                paired[a] == paired[b] && self.touches(cross[i], cross[j])
            }
        };

        let mut included = vec![false; nodes.len()];
        included[0] = true;
        let mut stack = vec![0];
        while let Some(a) = stack.pop() {
            for b in 0..nodes.len() {
                if !included[b] && linked(a, b) {
                    included[b] = true;
                    stack.push(b);
                }
            }
        }

        let (mut before, mut after) = (Vec::new(), Vec::new());
        for (&(i, ends_here), _) in nodes.iter().zip(&included).filter(|(_, inc)| **inc) {
            if ends_here {
                before.push(i);
            } else {
                after.push(i);
            }
        }
        (before, after)
    }

    fn touches(&self, a: Span, b: Span) -> bool {
        a.start <= b.end + self.tolerance && a.end >= b.start - self.tolerance
    }

    fn overlaps(&self, a: Span, b: Span) -> bool {
        a.start < b.end - self.tolerance && a.end > b.start + self.tolerance
    }
}
