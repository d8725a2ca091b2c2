//! Rules and operations for connecting links to ports.

use log::debug;
use uuid::Uuid;

use crate::error::CanvasError;
use crate::geometry::{self, Point};
use crate::model::{DiagramModel, LinkModel, PointModel, PortDirection, PortModel, PortRef};

/// Extra connection rules on top of the structural ones enforced by
/// [`can_link_to_port`]. Evaluated in both directions.
pub trait LinkPolicy {
    fn allows(&self, model: &DiagramModel, from: &PortModel, to: &PortModel) -> bool {
        let _ = (model, from, to);
        true
    }
}

/// Only the structural rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultLinkPolicy;

impl LinkPolicy for DefaultLinkPolicy {}

/// Outputs connect to inputs; `Any` ports connect to everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectionalLinkPolicy;

impl LinkPolicy for DirectionalLinkPolicy {
    fn allows(&self, _model: &DiagramModel, from: &PortModel, to: &PortModel) -> bool {
        use PortDirection::*;
        matches!(
            (from.direction, to.direction),
            (Output, Input) | (Input, Output) | (Any, _) | (_, Any)
        )
    }
}

/// Whether `a` and `b` may be joined by `candidate` (or by a new link when
/// `candidate` is `None`).
///
/// Rejects a port linked to itself, two ports of the same node, a pair
/// already joined by another link, ports at their link capacity, and
/// anything `policy` refuses. Symmetric in `a` and `b`.
pub fn can_link_to_port(
    model: &DiagramModel,
    policy: &dyn LinkPolicy,
    a: &PortRef,
    b: &PortRef,
    candidate: Option<Uuid>,
) -> bool {
    if a == b || a.node_id == b.node_id {
        return false;
    }
    let (Ok(port_a), Ok(port_b)) = (model.port(a), model.port(b)) else {
        return false;
    };
    if model
        .links_between(a, b)
        .iter()
        .any(|id| Some(*id) != candidate)
    {
        return false;
    }
    if !has_capacity(port_a, candidate) || !has_capacity(port_b, candidate) {
        return false;
    }
    policy.allows(model, port_a, port_b) && policy.allows(model, port_b, port_a)
}

fn has_capacity(port: &PortModel, candidate: Option<Uuid>) -> bool {
    match port.max_links {
        None => true,
        Some(max) => {
            port.links()
                .iter()
                .filter(|id| Some(**id) != candidate)
                .count()
                < max
        }
    }
}

/// Another link already joins the same unordered port pair.
pub fn is_duplicate_link(model: &DiagramModel, link_id: Uuid) -> Result<bool, CanvasError> {
    let link = model.link(link_id)?;
    let (Some(source), Some(target)) = (link.source(), link.target()) else {
        return Ok(false);
    };
    Ok(model
        .links_between(source, target)
        .iter()
        .any(|id| *id != link_id))
}

/// Create a dangling link anchored at `source`: two points at the port's
/// coordinates, target unset.
pub fn create_link(model: &mut DiagramModel, source: &PortRef) -> Result<Uuid, CanvasError> {
    let position = model.port(source)?.position();
    let link = LinkModel::new()
        .with_points(&[position, position])
        .with_ports(Some(source.clone()), None);
    model.add_link(link)
}

/// Split a completed link at one of its points, inserting `port` between
/// the two halves.
///
/// The original link keeps the points up to the insertion point and now
/// ends at `port`. A new link starts at `port` from a copy of the insertion
/// point, takes over the remaining points and ends at the original target.
/// Returns the new link's id.
pub fn split_link_at_point(
    model: &mut DiagramModel,
    link_id: Uuid,
    point_id: Uuid,
    port: &PortRef,
) -> Result<Uuid, CanvasError> {
    model.port(port)?;
    let link = model.link(link_id)?;
    let index = link
        .point_index(point_id)
        .ok_or(CanvasError::PointNotFound(point_id))?;
    let insertion = link.points()[index].position;
    let old_target = link.target().cloned();
    let mut clone = link.detached_clone();
    clone.clear_points();

    let tail = model.link_mut(link_id)?.split_points_after(index);
    clone.adopt_points(vec![PointModel::new(clone.id(), insertion)]);
    if tail.is_empty() {
        // Split at the last point: the new half spans port -> old target.
        let end = match &old_target {
            Some(target) => model.port(target)?.position(),
            None => insertion,
        };
        clone.adopt_points(vec![PointModel::new(clone.id(), end)]);
    } else {
        clone.adopt_points(tail);
    }
    let clone = clone.with_ports(Some(port.clone()), old_target);

    let new_id = model.add_link(clone)?;
    model.set_link_target(link_id, Some(port.clone()))?;
    snap_end_to_port(model, link_id, port)?;
    snap_end_to_port(model, new_id, port)?;
    debug!("Split link {} at point {} into {}", link_id, point_id, new_id);
    Ok(new_id)
}

/// What happened when a dragged point was released over a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// The link was split in two; carries the new link's id.
    Split(Uuid),
    /// Dropped on the link's own target: later points removed.
    TrimmedAfter,
    /// Dropped on the link's own source: earlier points removed.
    TrimmedBefore,
    /// The link had no target; the port became its target.
    TargetResolved,
}

/// Resolve a point of `link_id` dropped on `port`.
pub fn connect_dropped_point(
    model: &mut DiagramModel,
    link_id: Uuid,
    point_id: Uuid,
    port: &PortRef,
) -> Result<DropOutcome, CanvasError> {
    let link = model.link(link_id)?;
    let outcome = match link.target().cloned() {
        Some(target) => {
            let on_source = link.source() == Some(port);
            if &target != port && !on_source {
                DropOutcome::Split(split_link_at_point(model, link_id, point_id, port)?)
            } else if &target == port {
                model.link_mut(link_id)?.remove_points_after(point_id);
                snap_end_to_port(model, link_id, port)?;
                DropOutcome::TrimmedAfter
            } else {
                model.link_mut(link_id)?.remove_points_before(point_id);
                snap_end_to_port(model, link_id, port)?;
                DropOutcome::TrimmedBefore
            }
        }
        None => {
            model.set_link_target(link_id, Some(port.clone()))?;
            snap_end_to_port(model, link_id, port)?;
            DropOutcome::TargetResolved
        }
    };
    Ok(outcome)
}

/// Place the link's end attached to `port` exactly on the port.
fn snap_end_to_port(
    model: &mut DiagramModel,
    link_id: Uuid,
    port: &PortRef,
) -> Result<(), CanvasError> {
    let position = model.port(port)?.position();
    let Some(point_id) = model.link(link_id)?.point_for_port(port).map(|p| p.id) else {
        return Ok(());
    };
    model.point_mut(point_id)?.position = position;
    Ok(())
}

/// Insert a waypoint at `world` on the segment of the link closest to it.
/// Returns `None` when the link already carries `max_points` points.
pub fn insert_link_point(
    model: &mut DiagramModel,
    link_id: Uuid,
    world: Point,
    max_points: Option<usize>,
) -> Result<Option<Uuid>, CanvasError> {
    let link = model.link(link_id)?;
    if max_points.is_some_and(|max| link.points().len() >= max) {
        return Ok(None);
    }
    let positions: Vec<Point> = link.positions().collect();
    let index = positions
        .windows(2)
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            geometry::distance_to_segment(world, a[0], a[1])
                .total_cmp(&geometry::distance_to_segment(world, b[0], b[1]))
        })
        .map_or(positions.len(), |(i, _)| i + 1);
    let id = model.link_mut(link_id)?.add_point(world, index);
    Ok(Some(id))
}
