use crate::element::{ShapeElement, ShapeKind};

/// Degenerate-denominator cutoff for intersection math.
const EPS: f32 = 1e-6;
/// A segment crossing within this distance of the probe endpoint counts
/// as "on the outline", not as a crossing.
const ON_OUTLINE_T: f32 = 1e-4;

pub fn rotate_point(point: (f32, f32), center: (f32, f32), angle: f32) -> (f32, f32) {
    if angle == 0.0 {
        return point;
    }
    let (sin, cos) = angle.sin_cos();
    let dx = point.0 - center.0;
    let dy = point.1 - center.1;
    (
        center.0 + dx * cos - dy * sin,
        center.1 + dx * sin + dy * cos,
    )
}

pub fn rotate_vector(vector: (f32, f32), angle: f32) -> (f32, f32) {
    if angle == 0.0 {
        return vector;
    }
    let (sin, cos) = angle.sin_cos();
    (
        vector.0 * cos - vector.1 * sin,
        vector.0 * sin + vector.1 * cos,
    )
}

/// Outline polygon of a shape in global (rotated) coordinates. Ellipses
/// have no polygon; their intersections are analytic.
pub fn shape_outline_points(shape: &ShapeElement) -> Option<Vec<(f32, f32)>> {
    let x = shape.x;
    let y = shape.y;
    let w = shape.width;
    let h = shape.height;
    let local: Vec<(f32, f32)> = match shape.kind {
        ShapeKind::Rectangle | ShapeKind::RoundRect | ShapeKind::Frame => {
            vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
        }
        ShapeKind::Diamond => {
            let cx = x + w / 2.0;
            let cy = y + h / 2.0;
            vec![(cx, y), (x + w, cy), (cx, y + h), (x, cy)]
        }
        ShapeKind::FreeForm => {
            if shape.outline.len() >= 3 {
                shape.outline.iter().map(|&(px, py)| (x + px, y + py)).collect()
            } else {
                vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
            }
        }
        ShapeKind::Ellipse => return None,
    };
    if shape.angle == 0.0 {
        return Some(local);
    }
    let center = shape.center();
    Some(
        local
            .into_iter()
            .map(|p| rotate_point(p, center, shape.angle))
            .collect(),
    )
}

fn segment_segment_intersection(
    p: (f32, f32),
    r: (f32, f32),
    a: (f32, f32),
    b: (f32, f32),
) -> Option<(f32, f32)> {
    let sx = b.0 - a.0;
    let sy = b.1 - a.1;
    let qx = a.0 - p.0;
    let qy = a.1 - p.1;
    let denom = r.0 * sy - r.1 * sx;
    if denom.abs() < EPS {
        return None;
    }
    let t = (qx * sy - qy * sx) / denom;
    let u = (qx * r.1 - qy * r.0) / denom;
    Some((t, u))
}

/// All forward hits of the ray `origin + t * dir` against a closed
/// polygon, sorted by `t`.
pub fn ray_polygon_intersections(
    origin: (f32, f32),
    dir: (f32, f32),
    poly: &[(f32, f32)],
) -> Vec<((f32, f32), f32)> {
    let mut hits: Vec<((f32, f32), f32)> = Vec::new();
    if poly.len() < 2 {
        return hits;
    }
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        if let Some((t, u)) = segment_segment_intersection(origin, dir, a, b)
            && t >= 0.0
            && (0.0..=1.0).contains(&u)
        {
            hits.push(((origin.0 + dir.0 * t, origin.1 + dir.1 * t), t));
        }
    }
    hits.sort_by(|lhs, rhs| lhs.1.total_cmp(&rhs.1));
    hits
}

/// Forward hits of a ray against an axis-aligned ellipse, sorted by `t`.
pub fn ray_ellipse_intersections(
    origin: (f32, f32),
    dir: (f32, f32),
    center: (f32, f32),
    rx: f32,
    ry: f32,
) -> Vec<((f32, f32), f32)> {
    let mut hits = Vec::new();
    if rx < EPS || ry < EPS {
        return hits;
    }
    let ox = origin.0 - center.0;
    let oy = origin.1 - center.1;
    let a = (dir.0 * dir.0) / (rx * rx) + (dir.1 * dir.1) / (ry * ry);
    let b = 2.0 * ((ox * dir.0) / (rx * rx) + (oy * dir.1) / (ry * ry));
    let c = (ox * ox) / (rx * rx) + (oy * oy) / (ry * ry) - 1.0;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 || a.abs() < EPS {
        return hits;
    }
    let sqrt_disc = disc.sqrt();
    for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
        if t >= 0.0 {
            hits.push(((origin.0 + dir.0 * t, origin.1 + dir.1 * t), t));
        }
    }
    hits.sort_by(|lhs, rhs| lhs.1.total_cmp(&rhs.1));
    hits
}

/// Forward hits of a ray against a shape's outline, dispatched by
/// silhouette, sorted by `t`.
pub fn ray_shape_intersections(
    origin: (f32, f32),
    dir: (f32, f32),
    shape: &ShapeElement,
) -> Vec<((f32, f32), f32)> {
    match shape_outline_points(shape) {
        Some(poly) => ray_polygon_intersections(origin, dir, &poly),
        None => {
            let center = shape.center();
            let local_origin = rotate_point(origin, center, -shape.angle);
            let local_dir = rotate_vector(dir, -shape.angle);
            ray_ellipse_intersections(
                local_origin,
                local_dir,
                center,
                shape.width / 2.0,
                shape.height / 2.0,
            )
            .into_iter()
            .map(|(point, t)| (rotate_point(point, center, shape.angle), t))
            .collect()
        }
    }
}

/// True when the point lies within (or on) the shape's silhouette: the
/// segment from the shape center out to the point crosses the outline
/// zero times.
pub fn point_in_shape(point: (f32, f32), shape: &ShapeElement) -> bool {
    let center = shape.center();
    match shape_outline_points(shape) {
        Some(poly) => {
            let dir = (point.0 - center.0, point.1 - center.1);
            if dir.0.abs() < EPS && dir.1.abs() < EPS {
                return true;
            }
            let mut crossings = 0usize;
            for i in 0..poly.len() {
                let a = poly[i];
                let b = poly[(i + 1) % poly.len()];
                if let Some((t, u)) = segment_segment_intersection(center, dir, a, b)
                    && (0.0..1.0 - ON_OUTLINE_T).contains(&t)
                    && (0.0..=1.0).contains(&u)
                {
                    crossings += 1;
                }
            }
            crossings == 0
        }
        None => {
            let local = rotate_point(point, center, -shape.angle);
            let rx = shape.width / 2.0;
            let ry = shape.height / 2.0;
            if rx < EPS || ry < EPS {
                return false;
            }
            let dx = (local.0 - center.0) / rx;
            let dy = (local.1 - center.1) / ry;
            dx * dx + dy * dy <= 1.0 + ON_OUTLINE_T
        }
    }
}

pub fn point_to_segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let abx = b.0 - a.0;
    let aby = b.1 - a.1;
    let len_sq = abx * abx + aby * aby;
    if len_sq < EPS {
        return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
    }
    let t = (((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len_sq).clamp(0.0, 1.0);
    let cx = a.0 + abx * t;
    let cy = a.1 + aby * t;
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

/// Distance from a point to the nearest point on the shape's outline.
/// For ellipses this projects along the center ray, which is exact on
/// the axes and a close approximation elsewhere.
pub fn distance_to_outline(point: (f32, f32), shape: &ShapeElement) -> f32 {
    match shape_outline_points(shape) {
        Some(poly) => {
            let mut best = f32::MAX;
            for i in 0..poly.len() {
                let a = poly[i];
                let b = poly[(i + 1) % poly.len()];
                best = best.min(point_to_segment_distance(point, a, b));
            }
            best
        }
        None => {
            let center = shape.center();
            let local = rotate_point(point, center, -shape.angle);
            let rx = (shape.width / 2.0).max(EPS);
            let ry = (shape.height / 2.0).max(EPS);
            let dx = local.0 - center.0;
            let dy = local.1 - center.1;
            let denom = (dx * dx) / (rx * rx) + (dy * dy) / (ry * ry);
            if denom < EPS {
                return rx.min(ry);
            }
            let scale = 1.0 / denom.sqrt();
            let bx = center.0 + dx * scale;
            let by = center.1 + dy * scale;
            ((local.0 - bx).powi(2) + (local.1 - by).powi(2)).sqrt()
        }
    }
}

pub fn bounding_boxes_overlap(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> bool {
    a.0 <= b.0 + b.2 && b.0 <= a.0 + a.2 && a.1 <= b.1 + b.3 && b.1 <= a.1 + a.3
}

/// Point halfway along a polyline by arc length. Used to place bound
/// labels on connector routes.
pub fn polyline_midpoint(points: &[(f32, f32)]) -> Option<(f32, f32)> {
    match points {
        [] => None,
        [only] => Some(*only),
        _ => {
            let mut total = 0.0f32;
            for pair in points.windows(2) {
                total += ((pair[1].0 - pair[0].0).powi(2) + (pair[1].1 - pair[0].1).powi(2)).sqrt();
            }
            if total < EPS {
                return Some(points[0]);
            }
            let mut remaining = total / 2.0;
            for pair in points.windows(2) {
                let len =
                    ((pair[1].0 - pair[0].0).powi(2) + (pair[1].1 - pair[0].1).powi(2)).sqrt();
                if len >= remaining {
                    let t = if len < EPS { 0.0 } else { remaining / len };
                    return Some((
                        pair[0].0 + (pair[1].0 - pair[0].0) * t,
                        pair[0].1 + (pair[1].1 - pair[0].1) * t,
                    ));
                }
                remaining -= len;
            }
            Some(points[points.len() - 1])
        }
    }
}

/// Drops duplicate and collinear interior points from an axis-aligned
/// route.
pub fn compress_path(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    out.push(points[0]);
    for idx in 1..points.len() - 1 {
        let prev = out[out.len() - 1];
        let curr = points[idx];
        if (curr.0 - prev.0).abs() <= 1e-4 && (curr.1 - prev.1).abs() <= 1e-4 {
            continue;
        }
        let next = points[idx + 1];
        let dx1 = curr.0 - prev.0;
        let dy1 = curr.1 - prev.1;
        let dx2 = next.0 - curr.0;
        let dy2 = next.1 - curr.1;
        if (dx1.abs() <= 1e-4 && dx2.abs() <= 1e-4) || (dy1.abs() <= 1e-4 && dy2.abs() <= 1e-4) {
            continue;
        }
        out.push(curr);
    }
    let last = points[points.len() - 1];
    if (last.0 - out[out.len() - 1].0).abs() > 1e-4 || (last.1 - out[out.len() - 1].1).abs() > 1e-4
    {
        out.push(last);
    }
    out
}
