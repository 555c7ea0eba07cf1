use std::f32::consts::FRAC_1_SQRT_2;

use crate::config::BindingConfig;
use crate::element::{ConnectorElement, ConnectorEndpoint, FixedPoint, ShapeElement, ShapeKind};
use crate::geometry::{ray_shape_intersections, rotate_point};

/// Exclusion half-width around 0.5 for fixed-point components.
const CENTER_EXCLUSION: f32 = 1e-4;
/// Replacement for a component landing on the center line. A ratio of
/// exactly 0.5 makes the anchor direction ambiguous on a symmetric
/// shape.
const CENTER_NUDGE: f32 = 0.5001;

pub fn normalize_fixed_point(x: f32, y: f32) -> FixedPoint {
    FixedPoint {
        x: nudge_off_center(x),
        y: nudge_off_center(y),
    }
}

fn nudge_off_center(value: f32) -> f32 {
    if (value - 0.5).abs() < CENTER_EXCLUSION {
        CENTER_NUDGE
    } else {
        value
    }
}

/// Ratio-space to absolute coordinates, honoring the host's rotation.
pub fn fixed_point_to_global(fixed_point: FixedPoint, shape: &ShapeElement) -> (f32, f32) {
    let point = (
        shape.x + fixed_point.x * shape.width,
        shape.y + fixed_point.y * shape.height,
    );
    rotate_point(point, shape.center(), shape.angle)
}

/// Inverse of [`fixed_point_to_global`]; the result is normalized so
/// neither component sits on the 0.5 center line.
pub fn global_to_fixed_point(point: (f32, f32), shape: &ShapeElement) -> FixedPoint {
    let local = rotate_point(point, shape.center(), -shape.angle);
    let x = if shape.width.abs() < f32::EPSILON {
        0.5
    } else {
        (local.0 - shape.x) / shape.width
    };
    let y = if shape.height.abs() < f32::EPSILON {
        0.5
    } else {
        (local.1 - shape.y) / shape.height
    };
    normalize_fixed_point(x, y)
}

/// Radius of the bindable zone around a shape. Grows with shape size up
/// to a cap, never shrinks when zooming out, and diamonds use a reduced
/// ratio so their effective zone matches a rectangle of the same
/// bounding box.
pub fn max_binding_distance(shape: &ShapeElement, zoom: f32, config: &BindingConfig) -> f32 {
    let shape_ratio = if shape.kind == ShapeKind::Diamond {
        FRAC_1_SQRT_2
    } else {
        1.0
    };
    let smaller = shape.width.min(shape.height);
    let zoom_factor = zoom.clamp(1e-3, 1.0);
    config
        .min_binding_gap
        .max((config.bindable_size_ratio * smaller * shape_ratio).min(config.max_binding_gap))
        .max(config.highlight_thickness / zoom_factor + config.fixed_binding_distance)
}

/// Snaps a point to the midpoint of the nearest shape side when it falls
/// inside the side's snap band, placed just outside the outline. Diamond
/// shapes without a clear side classification snap to the nearest edge
/// midpoint within the band radius instead.
pub fn snap_to_mid(
    shape: &ShapeElement,
    point: (f32, f32),
    tolerance: f32,
    config: &BindingConfig,
) -> (f32, f32) {
    let (x, y, w, h) = shape.bounds();
    let center = shape.center();
    let (cx, cy) = center;
    let p = rotate_point(point, center, -shape.angle);
    let vertical_band = (tolerance * h).clamp(config.mid_band_min, config.mid_band_max);
    let horizontal_band = (tolerance * w).clamp(config.mid_band_min, config.mid_band_max);
    let clearance = config.fixed_binding_distance;

    let snapped = if p.0 <= cx && (p.1 - cy).abs() < vertical_band {
        Some((x - clearance, cy))
    } else if p.1 <= cy && (p.0 - cx).abs() < horizontal_band {
        Some((cx, y - clearance))
    } else if p.0 >= cx && (p.1 - cy).abs() < vertical_band {
        Some((x + w + clearance, cy))
    } else if p.1 >= cy && (p.0 - cx).abs() < horizontal_band {
        Some((cx, y + h + clearance))
    } else if shape.kind == ShapeKind::Diamond {
        snap_to_diamond_edge_mid(shape, p, horizontal_band.max(vertical_band), clearance)
    } else {
        None
    };

    match snapped {
        Some(result) => rotate_point(result, center, shape.angle),
        None => point,
    }
}

/// Nearest of the four diamond edge midpoints within `radius`, pushed
/// outward along the edge normal by `clearance`.
fn snap_to_diamond_edge_mid(
    shape: &ShapeElement,
    p: (f32, f32),
    radius: f32,
    clearance: f32,
) -> Option<(f32, f32)> {
    let (x, y, w, h) = shape.bounds();
    let (cx, cy) = shape.center();
    let half_w = w / 2.0;
    let half_h = h / 2.0;
    let norm = (half_w * half_w + half_h * half_h).sqrt();
    if norm < f32::EPSILON {
        return None;
    }
    // Outward unit normals of the four edges, top-right first, clockwise.
    let candidates = [
        ((cx + half_w / 2.0, y + half_h / 2.0), (half_h / norm, -half_w / norm)),
        ((cx + half_w / 2.0, cy + half_h / 2.0), (half_h / norm, half_w / norm)),
        ((x + half_w / 2.0, cy + half_h / 2.0), (-half_h / norm, half_w / norm)),
        ((x + half_w / 2.0, y + half_h / 2.0), (-half_h / norm, -half_w / norm)),
    ];
    let mut best: Option<((f32, f32), f32)> = None;
    for (mid, normal) in candidates {
        let dist = ((p.0 - mid.0).powi(2) + (p.1 - mid.1).powi(2)).sqrt();
        if dist <= radius
            && best.map_or(true, |(_, best_dist)| dist < best_dist)
        {
            best = Some((
                (mid.0 + normal.0 * clearance, mid.1 + normal.1 * clearance),
                dist,
            ));
        }
    }
    best.map(|(point, _)| point)
}

/// Moves a point out of a rectangle's corner quadrant so orbit anchors
/// never sit diagonally off a corner. The result is the corner offset by
/// the clearance along exactly one axis. Non-rectanguloid shapes pass
/// through unchanged.
pub fn avoid_rectangular_corner(
    shape: &ShapeElement,
    point: (f32, f32),
    config: &BindingConfig,
) -> (f32, f32) {
    if !shape.kind.is_rectanguloid() {
        return point;
    }
    let (x, y, w, h) = shape.bounds();
    let center = shape.center();
    let p = rotate_point(point, center, -shape.angle);
    let clearance = config.fixed_binding_distance;

    let snapped = if p.0 < x && p.1 < y {
        // Top left: offset along x when hugging the top edge, else along y.
        if y - p.1 <= clearance {
            (x - clearance, y)
        } else {
            (x, y - clearance)
        }
    } else if p.0 > x + w && p.1 < y {
        if y - p.1 <= clearance {
            (x + w + clearance, y)
        } else {
            (x + w, y - clearance)
        }
    } else if p.0 > x + w && p.1 > y + h {
        if p.1 - (y + h) <= clearance {
            (x + w + clearance, y + h)
        } else {
            (x + w, y + h + clearance)
        }
    } else if p.0 < x && p.1 > y + h {
        if p.1 - (y + h) <= clearance {
            (x - clearance, y + h)
        } else {
            (x, y + h + clearance)
        }
    } else {
        return point;
    };
    rotate_point(snapped, center, shape.angle)
}

/// Snaps a connector endpoint onto the host outline. Straight connectors
/// cast a ray from the point adjacent to the endpoint through the edge
/// point; elbow connectors cast from the shape centerline after mid-side
/// snapping. When no usable intersection exists the raw edge point comes
/// back unchanged.
pub fn snap_to_outline(
    connector: &ConnectorElement,
    shape: &ShapeElement,
    endpoint: ConnectorEndpoint,
    config: &BindingConfig,
) -> (f32, f32) {
    let Some(edge) = connector.endpoint_global(endpoint) else {
        return (connector.x, connector.y);
    };
    if connector.points.len() < 2 {
        return edge;
    }
    if connector.elbow {
        let adjacent = connector.adjacent_global(endpoint).unwrap_or(edge);
        return snap_elbow_anchor(shape, edge, adjacent, config);
    }
    let adjacent = connector.adjacent_global(endpoint).unwrap_or(edge);
    snap_ray_to_outline(shape, edge, adjacent, config)
}

/// Ray-cast variant used both by [`snap_to_outline`] and by the
/// consistency maintainer, which supplies a recomputed edge point that
/// is not yet written back to the connector.
pub(crate) fn snap_ray_to_outline(
    shape: &ShapeElement,
    edge: (f32, f32),
    adjacent: (f32, f32),
    config: &BindingConfig,
) -> (f32, f32) {
    let mut dir = (edge.0 - adjacent.0, edge.1 - adjacent.1);
    if dir.0.abs() < f32::EPSILON && dir.1.abs() < f32::EPSILON {
        let center = shape.center();
        dir = (edge.0 - center.0, edge.1 - center.1);
    }
    let len = (dir.0 * dir.0 + dir.1 * dir.1).sqrt();
    if len < f32::EPSILON {
        return edge;
    }
    let unit = (dir.0 / len, dir.1 / len);
    for (point, t) in ray_shape_intersections(adjacent, dir, shape) {
        if t * len > config.fixed_binding_distance {
            // Back off along the approach so the anchor rests just
            // outside the outline.
            return (
                point.0 - unit.0 * config.fixed_binding_distance,
                point.1 - unit.1 * config.fixed_binding_distance,
            );
        }
    }
    edge
}

/// Elbow endpoints anchor on a side midline: the ray starts on the
/// shape's horizontal or vertical centerline, chosen by whichever axis
/// the approach heading is orthogonal to, and travels out through the
/// mid-snapped point.
pub(crate) fn snap_elbow_anchor(
    shape: &ShapeElement,
    edge: (f32, f32),
    adjacent: (f32, f32),
    config: &BindingConfig,
) -> (f32, f32) {
    let mid = snap_to_mid(shape, edge, config.mid_snap_tolerance, config);
    let center = shape.center();
    let heading = (edge.0 - adjacent.0, edge.1 - adjacent.1);
    let origin = if heading.0.abs() >= heading.1.abs() {
        (center.0, mid.1)
    } else {
        (mid.0, center.1)
    };
    let dir = (mid.0 - origin.0, mid.1 - origin.1);
    let len = (dir.0 * dir.0 + dir.1 * dir.1).sqrt();
    if len < f32::EPSILON {
        return mid;
    }
    let unit = (dir.0 / len, dir.1 / len);
    for (point, t) in ray_shape_intersections(origin, dir, shape) {
        if t * len > config.fixed_binding_distance {
            // The ray starts inside the shape; push the crossing outward.
            return (
                point.0 + unit.0 * config.fixed_binding_distance,
                point.1 + unit.1 * config.fixed_binding_distance,
            );
        }
    }
    mid
}
