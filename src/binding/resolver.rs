use crate::binding::anchor::{global_to_fixed_point, snap_to_outline};
use crate::binding::candidate::find_bindable_at;
use crate::config::BindingConfig;
use crate::element::{
    Binding, BindingMode, BoundRef, ConnectorElement, ConnectorEndpoint, Element,
};
use crate::geometry::{distance_to_outline, point_in_shape};
use crate::scene::{ConnectorUpdate, ElementUpdate, Scene, ShapeUpdate};

/// Which connector endpoints a drag gesture is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraggedEndpoints {
    Start,
    End,
    Both,
}

/// One shape a selection's connector still touches at its original
/// endpoint, reported by [`suggested_bindings_for_connectors`].
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedBinding {
    pub connector_id: String,
    pub endpoint: ConnectorEndpoint,
    pub shape_id: String,
}

/// Decides, at the end of an endpoint drag, whether the endpoint binds
/// to the hover target, rebinds, or unbinds. Dragging both endpoints at
/// once always clears both bindings; reattachment would be ambiguous.
pub fn resolve_endpoint_drag(
    scene: &mut Scene,
    connector_id: &str,
    dragged: DraggedEndpoints,
    binding_enabled: bool,
    hover_id: Option<&str>,
    drop_point: (f32, f32),
    mode_override: Option<BindingMode>,
    config: &BindingConfig,
) {
    let endpoint = match dragged {
        DraggedEndpoints::Both => {
            unbind_connector_end(scene, connector_id, ConnectorEndpoint::Start);
            unbind_connector_end(scene, connector_id, ConnectorEndpoint::End);
            return;
        }
        DraggedEndpoints::Start => ConnectorEndpoint::Start,
        DraggedEndpoints::End => ConnectorEndpoint::End,
    };
    if !binding_enabled {
        unbind_connector_end(scene, connector_id, endpoint);
        return;
    }
    let Some(shape_id) = hover_id else {
        unbind_connector_end(scene, connector_id, endpoint);
        return;
    };
    let Some(shape) = scene.live_shape(shape_id) else {
        unbind_connector_end(scene, connector_id, endpoint);
        return;
    };
    let hits_body = point_in_shape(drop_point, shape)
        || distance_to_outline(drop_point, shape) <= config.body_hit_tolerance;
    let mode = mode_override.unwrap_or(if hits_body {
        BindingMode::Inside
    } else {
        BindingMode::Orbit
    });
    let shape_id = shape_id.to_string();
    bind_connector_end(scene, connector_id, endpoint, &shape_id, mode, config);
}

/// Writes a binding record onto the connector endpoint and a
/// back-reference onto the shape. Elbow connectors always bind in orbit
/// mode regardless of the requested mode.
pub fn bind_connector_end(
    scene: &mut Scene,
    connector_id: &str,
    endpoint: ConnectorEndpoint,
    shape_id: &str,
    requested_mode: BindingMode,
    config: &BindingConfig,
) {
    let Some(connector) = scene.live_connector(connector_id).cloned() else {
        return;
    };
    let Some(shape) = scene.live_shape(shape_id).cloned() else {
        return;
    };
    let Some(edge) = connector.endpoint_global(endpoint) else {
        return;
    };
    let mode = if connector.elbow {
        BindingMode::Orbit
    } else {
        requested_mode
    };
    let anchor = match mode {
        BindingMode::Inside => edge,
        BindingMode::Orbit => snap_to_outline(&connector, &shape, endpoint, config),
    };
    let fixed_point = global_to_fixed_point(anchor, &shape);

    let mut connector_update = ConnectorUpdate::default();
    connector_update.set_binding(
        endpoint,
        Some(Binding {
            element_id: shape_id.to_string(),
            mode,
            fixed_point,
        }),
    );
    scene.apply_update(connector_id, ElementUpdate::Connector(connector_update));

    if !shape.has_bound_ref(connector_id) {
        let mut refs = shape.bound_elements.clone();
        refs.push(BoundRef::connector(connector_id));
        scene.apply_update(
            shape_id,
            ElementUpdate::Shape(ShapeUpdate {
                bound_elements: Some(refs),
                ..Default::default()
            }),
        );
    }
    tracing::debug!(connector = connector_id, shape = shape_id, ?mode, "bound endpoint");
}

/// Clears an endpoint's binding record. The shape keeps its
/// back-reference when the connector's other endpoint is still bound to
/// the same shape.
pub fn unbind_connector_end(scene: &mut Scene, connector_id: &str, endpoint: ConnectorEndpoint) {
    let Some(connector) = scene.connector(connector_id).cloned() else {
        return;
    };
    let Some(binding) = connector.binding(endpoint).cloned() else {
        return;
    };
    let mut update = ConnectorUpdate::default();
    update.set_binding(endpoint, None);
    scene.apply_update(connector_id, ElementUpdate::Connector(update));

    let opposite_shares_shape = connector
        .binding(endpoint.opposite())
        .is_some_and(|other| other.element_id == binding.element_id);
    if opposite_shares_shape {
        return;
    }
    if let Some(shape) = scene.shape(&binding.element_id)
        && shape.has_bound_ref(connector_id)
    {
        let refs: Vec<BoundRef> = shape
            .bound_elements
            .iter()
            .filter(|bound_ref| bound_ref.id != connector_id)
            .cloned()
            .collect();
        scene.apply_update(
            &binding.element_id,
            ElementUpdate::Shape(ShapeUpdate {
                bound_elements: Some(refs),
                ..Default::default()
            }),
        );
    }
    tracing::debug!(connector = connector_id, shape = %binding.element_id, "unbound endpoint");
}

/// Fast path: a two-point straight connector whose endpoint is already
/// bound to the hovered shape needs no recomputation.
pub fn is_simple_and_already_bound(
    connector: &ConnectorElement,
    endpoint: ConnectorEndpoint,
    shape_id: &str,
) -> bool {
    connector.points.len() < 3
        && !connector.elbow
        && connector
            .binding(endpoint)
            .is_some_and(|binding| binding.element_id == shape_id)
}

/// For a bounded selection being dragged as a group, the shapes its
/// connectors still touch at their original endpoints. Shapes inside the
/// selection are excluded so a group drag never suggests binding to
/// itself. Oversized selections skip suggestion entirely.
pub fn suggested_bindings_for_connectors(
    scene: &Scene,
    selection: &[String],
    zoom: f32,
    config: &BindingConfig,
) -> Vec<SuggestedBinding> {
    if selection.len() > config.suggestion_cap {
        tracing::debug!(len = selection.len(), "selection too large for binding suggestions");
        return Vec::new();
    }
    let mut suggestions = Vec::new();
    for id in selection {
        let Some(connector) = scene.live_connector(id) else {
            continue;
        };
        for endpoint in [ConnectorEndpoint::Start, ConnectorEndpoint::End] {
            let Some(point) = connector.endpoint_global(endpoint) else {
                continue;
            };
            let Some(shape) = find_bindable_at(point, scene, zoom, config) else {
                continue;
            };
            if selection.iter().any(|selected| selected == &shape.id) {
                continue;
            }
            suggestions.push(SuggestedBinding {
                connector_id: id.clone(),
                endpoint,
                shape_id: shape.id.clone(),
            });
        }
    }
    suggestions
}

/// Convenience for interaction code: all live connectors bound to the
/// given shape.
pub fn connectors_bound_to<'a>(scene: &'a Scene, shape_id: &str) -> Vec<&'a ConnectorElement> {
    scene
        .iter_live()
        .filter_map(Element::as_connector)
        .filter(|connector| {
            [ConnectorEndpoint::Start, ConnectorEndpoint::End]
                .into_iter()
                .any(|endpoint| {
                    connector
                        .binding(endpoint)
                        .is_some_and(|binding| binding.element_id == shape_id)
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ShapeElement, ShapeKind};

    fn rect(id: &str, x: f32, y: f32, w: f32, h: f32) -> ShapeElement {
        ShapeElement::new(id, ShapeKind::Rectangle, x, y, w, h)
    }

    fn scene_with_rect_and_connector() -> Scene {
        let mut scene = Scene::new();
        scene.insert(Element::Shape(rect("host", 100.0, 100.0, 80.0, 60.0)));
        scene.insert(Element::Connector(ConnectorElement::new(
            "arrow",
            0.0,
            130.0,
            vec![(0.0, 0.0), (105.0, 0.0)],
        )));
        scene
    }

    #[test]
    fn bind_writes_record_and_back_reference() {
        let config = BindingConfig::default();
        let mut scene = scene_with_rect_and_connector();
        bind_connector_end(
            &mut scene,
            "arrow",
            ConnectorEndpoint::End,
            "host",
            BindingMode::Orbit,
            &config,
        );
        let connector = scene.connector("arrow").unwrap();
        let binding = connector.end_binding.as_ref().expect("binding");
        assert_eq!(binding.element_id, "host");
        assert_eq!(binding.mode, BindingMode::Orbit);
        assert!(scene.shape("host").unwrap().has_bound_ref("arrow"));
    }

    #[test]
    fn rebinding_does_not_duplicate_back_reference() {
        let config = BindingConfig::default();
        let mut scene = scene_with_rect_and_connector();
        for _ in 0..2 {
            bind_connector_end(
                &mut scene,
                "arrow",
                ConnectorEndpoint::End,
                "host",
                BindingMode::Orbit,
                &config,
            );
        }
        let shape = scene.shape("host").unwrap();
        assert_eq!(shape.bound_elements.len(), 1);
    }

    #[test]
    fn unbind_keeps_reference_while_other_end_shares_shape() {
        let config = BindingConfig::default();
        let mut scene = scene_with_rect_and_connector();
        bind_connector_end(&mut scene, "arrow", ConnectorEndpoint::Start, "host", BindingMode::Inside, &config);
        bind_connector_end(&mut scene, "arrow", ConnectorEndpoint::End, "host", BindingMode::Inside, &config);
        unbind_connector_end(&mut scene, "arrow", ConnectorEndpoint::Start);
        assert!(scene.shape("host").unwrap().has_bound_ref("arrow"));
        unbind_connector_end(&mut scene, "arrow", ConnectorEndpoint::End);
        assert!(!scene.shape("host").unwrap().has_bound_ref("arrow"));
        let connector = scene.connector("arrow").unwrap();
        assert!(connector.start_binding.is_none());
        assert!(connector.end_binding.is_none());
    }

    #[test]
    fn dragging_both_endpoints_clears_both_bindings() {
        let config = BindingConfig::default();
        let mut scene = scene_with_rect_and_connector();
        bind_connector_end(&mut scene, "arrow", ConnectorEndpoint::Start, "host", BindingMode::Inside, &config);
        bind_connector_end(&mut scene, "arrow", ConnectorEndpoint::End, "host", BindingMode::Inside, &config);
        resolve_endpoint_drag(
            &mut scene,
            "arrow",
            DraggedEndpoints::Both,
            true,
            Some("host"),
            (120.0, 130.0),
            None,
            &config,
        );
        let connector = scene.connector("arrow").unwrap();
        assert!(connector.start_binding.is_none());
        assert!(connector.end_binding.is_none());
        assert!(!scene.shape("host").unwrap().has_bound_ref("arrow"));
    }

    #[test]
    fn drop_on_body_selects_inside_mode() {
        let config = BindingConfig::default();
        let mut scene = scene_with_rect_and_connector();
        resolve_endpoint_drag(
            &mut scene,
            "arrow",
            DraggedEndpoints::End,
            true,
            Some("host"),
            (105.0, 130.0),
            None,
            &config,
        );
        let binding = scene.connector("arrow").unwrap().end_binding.clone().unwrap();
        assert_eq!(binding.mode, BindingMode::Inside);
    }

    #[test]
    fn drop_near_outline_selects_orbit_mode() {
        let config = BindingConfig::default();
        let mut scene = scene_with_rect_and_connector();
        resolve_endpoint_drag(
            &mut scene,
            "arrow",
            DraggedEndpoints::End,
            true,
            Some("host"),
            (95.0, 130.0),
            None,
            &config,
        );
        let binding = scene.connector("arrow").unwrap().end_binding.clone().unwrap();
        assert_eq!(binding.mode, BindingMode::Orbit);
    }

    #[test]
    fn elbow_connectors_force_orbit_mode() {
        let config = BindingConfig::default();
        let mut scene = Scene::new();
        scene.insert(Element::Shape(rect("host", 100.0, 100.0, 80.0, 60.0)));
        let mut connector =
            ConnectorElement::new("elbow", 0.0, 130.0, vec![(0.0, 0.0), (105.0, 0.0)]);
        connector.elbow = true;
        scene.insert(Element::Connector(connector));
        bind_connector_end(
            &mut scene,
            "elbow",
            ConnectorEndpoint::End,
            "host",
            BindingMode::Inside,
            &config,
        );
        let binding = scene.connector("elbow").unwrap().end_binding.clone().unwrap();
        assert_eq!(binding.mode, BindingMode::Orbit);
    }

    #[test]
    fn fast_path_detects_short_bound_connector() {
        let config = BindingConfig::default();
        let mut scene = scene_with_rect_and_connector();
        bind_connector_end(&mut scene, "arrow", ConnectorEndpoint::End, "host", BindingMode::Orbit, &config);
        let connector = scene.connector("arrow").unwrap();
        assert!(is_simple_and_already_bound(connector, ConnectorEndpoint::End, "host"));
        assert!(!is_simple_and_already_bound(connector, ConnectorEndpoint::End, "other"));
        assert!(!is_simple_and_already_bound(connector, ConnectorEndpoint::Start, "host"));
    }

    #[test]
    fn suggestions_exclude_selection_members_and_respect_cap() {
        let config = BindingConfig::default();
        let mut scene = scene_with_rect_and_connector();
        scene.insert(Element::Shape(rect("other", -40.0, 110.0, 30.0, 40.0)));
        let selection = vec!["arrow".to_string()];
        let suggestions = suggested_bindings_for_connectors(&scene, &selection, 1.0, &config);
        // Start endpoint at (0, 130) touches "other"; end endpoint at
        // (105, 130) touches "host".
        assert!(suggestions.iter().any(|s| s.shape_id == "other"));
        assert!(suggestions.iter().any(|s| s.shape_id == "host"));

        let selection_with_host: Vec<String> =
            vec!["arrow".to_string(), "host".to_string()];
        let filtered =
            suggested_bindings_for_connectors(&scene, &selection_with_host, 1.0, &config);
        assert!(filtered.iter().all(|s| s.shape_id != "host"));

        let oversized: Vec<String> = (0..60).map(|i| format!("e{i}")).collect();
        assert!(suggested_bindings_for_connectors(&scene, &oversized, 1.0, &config).is_empty());
    }
}
