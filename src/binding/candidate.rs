use crate::binding::anchor::max_binding_distance;
use crate::config::BindingConfig;
use crate::element::{Element, ShapeElement, ShapeKind};
use crate::geometry::{distance_to_outline, point_in_shape};
use crate::scene::Scene;

/// Hover lookup: the shape a connector endpoint at `point` would bind
/// to, or none. Considers live shapes only, topmost first.
pub fn find_bindable_at<'a>(
    point: (f32, f32),
    scene: &'a Scene,
    zoom: f32,
    config: &BindingConfig,
) -> Option<&'a ShapeElement> {
    let shapes: Vec<&ShapeElement> = scene.iter_live().filter_map(Element::as_shape).collect();
    best_candidate(point, &shapes, zoom, config)
}

/// Ranks bindable candidates among `shapes` (given bottommost first, as
/// drawn). Callers must pass live elements; a logically deleted shape
/// here is a stale element list upstream.
pub fn best_candidate<'a>(
    point: (f32, f32),
    shapes: &[&'a ShapeElement],
    zoom: f32,
    config: &BindingConfig,
) -> Option<&'a ShapeElement> {
    let mut best: Option<(&ShapeElement, f32)> = None;
    for &shape in shapes.iter().rev() {
        debug_assert!(
            !shape.is_deleted,
            "candidate selection requires a live element list"
        );
        let threshold = max_binding_distance(shape, zoom, config);
        if !expanded_bounds_contain(shape, point, threshold) {
            continue;
        }
        let near_outline = distance_to_outline(point, shape) <= threshold;
        // Frames never take full-body hits, so connectors can still bind
        // to a frame's children through its interior.
        let hit = if shape.kind == ShapeKind::Frame {
            near_outline
        } else {
            near_outline || point_in_shape(point, shape)
        };
        if !hit {
            continue;
        }
        let area = shape.width * shape.height;
        // Strict comparison keeps the topmost shape among equal areas.
        if best.map_or(true, |(_, best_area)| area < best_area) {
            best = Some((shape, area));
        }
    }
    if let Some((shape, _)) = best {
        tracing::trace!(id = %shape.id, "bindable candidate");
    }
    best.map(|(shape, _)| shape)
}

/// Cheap rejection: the point box, grown by the binding threshold, must
/// meet the shape's rotation-inflated bounding box.
fn expanded_bounds_contain(shape: &ShapeElement, point: (f32, f32), threshold: f32) -> bool {
    let (x, y, w, h) = shape.bounds();
    // A rotated shape stays inside the circle around its center, so the
    // half-diagonal bounds it in every orientation.
    let reach = if shape.angle == 0.0 {
        0.0
    } else {
        (w * w + h * h).sqrt() / 2.0 - w.min(h) / 2.0
    };
    point.0 >= x - threshold - reach
        && point.0 <= x + w + threshold + reach
        && point.1 >= y - threshold - reach
        && point.1 <= y + h + threshold + reach
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindingConfig;
    use crate::element::ShapeElement;

    fn scene_with(shapes: Vec<ShapeElement>) -> Scene {
        let mut scene = Scene::new();
        for shape in shapes {
            scene.insert(Element::Shape(shape));
        }
        scene
    }

    #[test]
    fn nested_smaller_shape_wins() {
        let config = BindingConfig::default();
        let outer = ShapeElement::new("outer", ShapeKind::Rectangle, 0.0, 0.0, 100.0, 100.0);
        let inner = ShapeElement::new("inner", ShapeKind::Rectangle, 40.0, 40.0, 20.0, 20.0);
        let scene = scene_with(vec![outer, inner]);
        let hit = find_bindable_at((50.0, 50.0), &scene, 1.0, &config).expect("candidate");
        assert_eq!(hit.id, "inner");
    }

    #[test]
    fn frame_interior_does_not_capture() {
        let config = BindingConfig::default();
        let frame = ShapeElement::new("frame", ShapeKind::Frame, 0.0, 0.0, 400.0, 400.0);
        let child = ShapeElement::new("child", ShapeKind::Rectangle, 150.0, 150.0, 40.0, 40.0);
        let scene = scene_with(vec![frame, child]);
        // Deep inside the frame, on the child: the child wins and the
        // frame is not even a candidate.
        let hit = find_bindable_at((170.0, 170.0), &scene, 1.0, &config).expect("candidate");
        assert_eq!(hit.id, "child");
        // Deep inside the frame, far from both outlines: nothing binds.
        assert!(find_bindable_at((60.0, 300.0), &scene, 1.0, &config).is_none());
        // Near the frame border the frame does bind.
        let hit = find_bindable_at((2.0, 200.0), &scene, 1.0, &config).expect("candidate");
        assert_eq!(hit.id, "frame");
    }

    #[test]
    fn deleted_shapes_are_not_candidates() {
        let config = BindingConfig::default();
        let shape = ShapeElement::new("a", ShapeKind::Rectangle, 0.0, 0.0, 50.0, 50.0);
        let mut scene = scene_with(vec![shape]);
        scene.mark_deleted("a");
        assert!(find_bindable_at((25.0, 25.0), &scene, 1.0, &config).is_none());
    }

    #[test]
    fn point_beyond_threshold_misses() {
        let config = BindingConfig::default();
        let shape = ShapeElement::new("a", ShapeKind::Rectangle, 0.0, 0.0, 50.0, 50.0);
        let scene = scene_with(vec![shape]);
        assert!(find_bindable_at((120.0, 25.0), &scene, 1.0, &config).is_none());
        assert!(find_bindable_at((55.0, 25.0), &scene, 1.0, &config).is_some());
    }
}
