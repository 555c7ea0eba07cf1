use crate::element::ConnectorElement;
use crate::geometry::compress_path;

/// Point-level contract of the orthogonal-routing collaborator: given a
/// connector and its two resolved global endpoints, produce an
/// axis-aligned polyline from `start` to `end`. The binding engine
/// consumes routes; it never path-finds itself.
pub trait ElbowRouter {
    fn route(
        &self,
        connector: &ConnectorElement,
        start: (f32, f32),
        end: (f32, f32),
    ) -> Vec<(f32, f32)>;
}

/// Minimal compliant router: one bend channel at the midpoint of the
/// dominant axis. Callers with a real pathfinder supply their own
/// [`ElbowRouter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MidAxisRouter;

impl ElbowRouter for MidAxisRouter {
    fn route(
        &self,
        _connector: &ConnectorElement,
        start: (f32, f32),
        end: (f32, f32),
    ) -> Vec<(f32, f32)> {
        let dx = (end.0 - start.0).abs();
        let dy = (end.1 - start.1).abs();
        let points = if dx >= dy {
            let mid_x = (start.0 + end.0) / 2.0;
            vec![start, (mid_x, start.1), (mid_x, end.1), end]
        } else {
            let mid_y = (start.1 + end.1) / 2.0;
            vec![start, (start.0, mid_y), (end.0, mid_y), end]
        };
        compress_path(&points)
    }
}
