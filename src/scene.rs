use std::collections::BTreeMap;

use crate::element::{
    Binding, BoundRef, ConnectorElement, ConnectorEndpoint, Element, LabelElement, ShapeElement,
};

/// Field-level partial update for a shape. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ShapeUpdate {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub angle: Option<f32>,
    pub bound_elements: Option<Vec<BoundRef>>,
    pub is_deleted: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectorUpdate {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub points: Option<Vec<(f32, f32)>>,
    /// `Some(None)` clears the binding; `None` leaves it untouched.
    pub start_binding: Option<Option<Binding>>,
    pub end_binding: Option<Option<Binding>>,
    pub bound_elements: Option<Vec<BoundRef>>,
    pub is_deleted: Option<bool>,
}

impl ConnectorUpdate {
    pub fn set_binding(&mut self, endpoint: ConnectorEndpoint, value: Option<Binding>) {
        match endpoint {
            ConnectorEndpoint::Start => self.start_binding = Some(value),
            ConnectorEndpoint::End => self.end_binding = Some(value),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelUpdate {
    pub x: Option<f32>,
    pub y: Option<f32>,
    /// `Some(None)` detaches the label from its container.
    pub container_id: Option<Option<String>>,
    pub is_deleted: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum ElementUpdate {
    Shape(ShapeUpdate),
    Connector(ConnectorUpdate),
    Label(LabelUpdate),
}

/// The shared element table: id-indexed storage plus draw order. This is
/// both the query surface and the mutation sink the binding engine works
/// against; every mutation goes through [`Scene::apply_update`] and is
/// atomic per element.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    elements: BTreeMap<String, Element>,
    order: Vec<String>,
    next_copy: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: Element) {
        let id = element.id().to_string();
        if self.elements.insert(id.clone(), element).is_none() {
            self.order.push(id);
        }
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn shape(&self, id: &str) -> Option<&ShapeElement> {
        self.elements.get(id).and_then(Element::as_shape)
    }

    pub fn connector(&self, id: &str) -> Option<&ConnectorElement> {
        self.elements.get(id).and_then(Element::as_connector)
    }

    pub fn label(&self, id: &str) -> Option<&LabelElement> {
        self.elements.get(id).and_then(Element::as_label)
    }

    pub fn live_shape(&self, id: &str) -> Option<&ShapeElement> {
        self.shape(id).filter(|shape| !shape.is_deleted)
    }

    pub fn live_connector(&self, id: &str) -> Option<&ConnectorElement> {
        self.connector(id).filter(|connector| !connector.is_deleted)
    }

    pub fn live_label(&self, id: &str) -> Option<&LabelElement> {
        self.label(id).filter(|label| !label.is_deleted)
    }

    /// Live elements in draw order, bottommost first.
    pub fn iter_live(&self) -> impl Iterator<Item = &Element> {
        self.order
            .iter()
            .filter_map(|id| self.elements.get(id))
            .filter(|element| !element.is_deleted())
    }

    /// Every element, deleted ones included, in draw order.
    pub fn iter_all(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    pub fn shape_bounds(&self, id: &str) -> Option<(f32, f32, f32, f32)> {
        self.shape(id).map(ShapeElement::bounds)
    }

    /// Logical deletion: the record stays in the table for the
    /// consistency maintainer to prune against.
    pub fn mark_deleted(&mut self, id: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.set_deleted(true);
        }
    }

    pub fn restore(&mut self, id: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.set_deleted(false);
        }
    }

    /// Applies a partial update to one element. Unknown ids and
    /// mismatched element kinds are ignored; stale update instructions
    /// degrade to no-ops rather than failing.
    pub fn apply_update(&mut self, id: &str, update: ElementUpdate) {
        let Some(element) = self.elements.get_mut(id) else {
            tracing::debug!(id, "apply_update: unknown element");
            return;
        };
        match (element, update) {
            (Element::Shape(shape), ElementUpdate::Shape(update)) => {
                if let Some(x) = update.x {
                    shape.x = x;
                }
                if let Some(y) = update.y {
                    shape.y = y;
                }
                if let Some(width) = update.width {
                    shape.width = width;
                }
                if let Some(height) = update.height {
                    shape.height = height;
                }
                if let Some(angle) = update.angle {
                    shape.angle = angle;
                }
                if let Some(bound_elements) = update.bound_elements {
                    shape.bound_elements = bound_elements;
                }
                if let Some(is_deleted) = update.is_deleted {
                    shape.is_deleted = is_deleted;
                }
            }
            (Element::Connector(connector), ElementUpdate::Connector(update)) => {
                if let Some(x) = update.x {
                    connector.x = x;
                }
                if let Some(y) = update.y {
                    connector.y = y;
                }
                if let Some(points) = update.points {
                    connector.points = points;
                }
                if let Some(start_binding) = update.start_binding {
                    connector.start_binding = start_binding;
                }
                if let Some(end_binding) = update.end_binding {
                    connector.end_binding = end_binding;
                }
                if let Some(bound_elements) = update.bound_elements {
                    connector.bound_elements = bound_elements;
                }
                if let Some(is_deleted) = update.is_deleted {
                    connector.is_deleted = is_deleted;
                }
            }
            (Element::Label(label), ElementUpdate::Label(update)) => {
                if let Some(x) = update.x {
                    label.x = x;
                }
                if let Some(y) = update.y {
                    label.y = y;
                }
                if let Some(container_id) = update.container_id {
                    label.container_id = container_id;
                }
                if let Some(is_deleted) = update.is_deleted {
                    label.is_deleted = is_deleted;
                }
            }
            _ => {
                tracing::debug!(id, "apply_update: element kind mismatch");
            }
        }
    }

    /// Clones the given elements under fresh ids, appending them in draw
    /// order, and returns the original-id to duplicate-id map. References
    /// inside the clones still point at the originals until
    /// `fix_bindings_after_duplication` rewrites them.
    pub fn duplicate_elements(&mut self, ids: &[String]) -> BTreeMap<String, String> {
        let mut id_map = BTreeMap::new();
        for id in ids {
            let Some(element) = self.elements.get(id) else {
                continue;
            };
            self.next_copy += 1;
            let new_id = format!("{id}-copy-{}", self.next_copy);
            let mut copy = element.clone();
            copy.set_id(new_id.clone());
            self.insert(copy);
            id_map.insert(id.clone(), new_id);
        }
        id_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ShapeKind;

    #[test]
    fn insert_preserves_draw_order_and_replace_keeps_position() {
        let mut scene = Scene::new();
        scene.insert(Element::Shape(ShapeElement::new("a", ShapeKind::Rectangle, 0.0, 0.0, 10.0, 10.0)));
        scene.insert(Element::Shape(ShapeElement::new("b", ShapeKind::Rectangle, 0.0, 0.0, 10.0, 10.0)));
        scene.insert(Element::Shape(ShapeElement::new("a", ShapeKind::Diamond, 0.0, 0.0, 10.0, 10.0)));
        let ids: Vec<&str> = scene.iter_live().map(Element::id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(scene.shape("a").unwrap().kind, ShapeKind::Diamond);
    }

    #[test]
    fn mark_deleted_hides_from_live_iteration_only() {
        let mut scene = Scene::new();
        scene.insert(Element::Shape(ShapeElement::new("a", ShapeKind::Rectangle, 0.0, 0.0, 10.0, 10.0)));
        scene.mark_deleted("a");
        assert_eq!(scene.iter_live().count(), 0);
        assert_eq!(scene.iter_all().count(), 1);
        assert!(scene.shape("a").is_some());
        assert!(scene.live_shape("a").is_none());
        scene.restore("a");
        assert_eq!(scene.iter_live().count(), 1);
    }

    #[test]
    fn shape_bounds_ignores_rotation() {
        let mut scene = Scene::new();
        let mut shape = ShapeElement::new("a", ShapeKind::Rectangle, 5.0, 6.0, 30.0, 20.0);
        shape.angle = 1.0;
        scene.insert(Element::Shape(shape));
        assert_eq!(scene.shape_bounds("a"), Some((5.0, 6.0, 30.0, 20.0)));
        assert_eq!(scene.shape_bounds("missing"), None);
    }

    #[test]
    fn apply_update_ignores_kind_mismatch() {
        let mut scene = Scene::new();
        scene.insert(Element::Shape(ShapeElement::new("a", ShapeKind::Rectangle, 0.0, 0.0, 10.0, 10.0)));
        scene.apply_update("a", ElementUpdate::Label(LabelUpdate::default()));
        scene.apply_update(
            "a",
            ElementUpdate::Shape(ShapeUpdate { x: Some(5.0), ..Default::default() }),
        );
        assert_eq!(scene.shape("a").unwrap().x, 5.0);
    }

    #[test]
    fn duplicate_elements_returns_id_map() {
        let mut scene = Scene::new();
        scene.insert(Element::Shape(ShapeElement::new("a", ShapeKind::Rectangle, 0.0, 0.0, 10.0, 10.0)));
        let map = scene.duplicate_elements(&["a".to_string(), "missing".to_string()]);
        assert_eq!(map.len(), 1);
        let copy_id = map.get("a").unwrap();
        assert!(scene.shape(copy_id).is_some());
        assert_eq!(scene.iter_live().count(), 2);
    }
}
