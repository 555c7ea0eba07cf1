use std::collections::{BTreeMap, BTreeSet};

use crate::binding::anchor::{
    avoid_rectangular_corner, fixed_point_to_global, snap_elbow_anchor, snap_ray_to_outline,
};
use crate::config::BindingConfig;
use crate::element::{
    Binding, BindingMode, BoundRef, BoundRefKind, ConnectorElement, ConnectorEndpoint, Element,
    LabelElement, ShapeElement,
};
use crate::geometry::{bounding_boxes_overlap, polyline_midpoint};
use crate::routing::ElbowRouter;
use crate::scene::{ConnectorUpdate, ElementUpdate, LabelUpdate, Scene, ShapeUpdate};

/// Recomputed points within this distance of the stored ones count as
/// unchanged. Keeps repeated maintainer passes idempotent in the face of
/// float noise from different ray origins.
const POINT_EPS: f32 = 1e-3;

fn points_differ(a: (f32, f32), b: (f32, f32)) -> bool {
    (a.0 - b.0).abs() > POINT_EPS || (a.1 - b.1).abs() > POINT_EPS
}

/// Caller context for [`update_bound_elements`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Connectors already being moved by the same interaction (e.g. part
    /// of the dragged selection); their geometry is left alone.
    pub excluded: BTreeSet<String>,
    /// Set when this call is a transitive hop from another host's
    /// update. An endpoint whose opposite end is bound to that
    /// originating host is skipped when the two hosts' boxes overlap,
    /// which breaks the feedback loop between two ends sharing one spot.
    pub originated_from: Option<String>,
}

/// Propagates a shape change to every dependent connector and label:
/// anchors are recomputed from their fixed points, elbow routes are
/// re-derived through the router, bound labels are re-laid out, and
/// stale back-references are pruned. All updates are computed from a
/// snapshot before any of them is applied.
pub fn update_bound_elements(
    scene: &mut Scene,
    changed_shape_id: &str,
    options: &UpdateOptions,
    router: &dyn ElbowRouter,
    config: &BindingConfig,
) {
    let Some(shape) = scene.live_shape(changed_shape_id).cloned() else {
        return;
    };
    let mut staged: Vec<(String, ElementUpdate)> = Vec::new();
    let mut kept_refs: Vec<BoundRef> = Vec::new();
    let mut pruned_any = false;

    for bound_ref in &shape.bound_elements {
        match bound_ref.kind {
            BoundRefKind::Label => {
                let Some(label) = scene.live_label(&bound_ref.id) else {
                    tracing::debug!(shape = changed_shape_id, label = %bound_ref.id, "pruning stale label ref");
                    pruned_any = true;
                    continue;
                };
                kept_refs.push(bound_ref.clone());
                if label.container_id.as_deref() == Some(changed_shape_id) {
                    stage_label_center(&mut staged, label, shape.center());
                }
            }
            BoundRefKind::Connector => {
                let Some(connector) = scene.live_connector(&bound_ref.id) else {
                    tracing::debug!(shape = changed_shape_id, connector = %bound_ref.id, "pruning stale connector ref");
                    pruned_any = true;
                    continue;
                };
                kept_refs.push(bound_ref.clone());
                if options.excluded.contains(&bound_ref.id) {
                    continue;
                }
                recompute_connector(
                    &mut staged,
                    scene,
                    connector,
                    &shape,
                    options,
                    router,
                    config,
                );
            }
        }
    }

    if pruned_any {
        staged.push((
            changed_shape_id.to_string(),
            ElementUpdate::Shape(ShapeUpdate {
                bound_elements: Some(kept_refs),
                ..Default::default()
            }),
        ));
    }
    for (id, update) in staged {
        scene.apply_update(&id, update);
    }
}

fn recompute_connector(
    staged: &mut Vec<(String, ElementUpdate)>,
    scene: &Scene,
    connector: &ConnectorElement,
    shape: &ShapeElement,
    options: &UpdateOptions,
    router: &dyn ElbowRouter,
    config: &BindingConfig,
) {
    let mut working = connector.clone();
    let mut changed = false;
    let mut elbow_anchors: [Option<(f32, f32)>; 2] = [None, None];

    for (slot, endpoint) in [ConnectorEndpoint::Start, ConnectorEndpoint::End]
        .into_iter()
        .enumerate()
    {
        let Some(binding) = connector.binding(endpoint) else {
            continue;
        };
        if binding.element_id != shape.id {
            continue;
        }
        if skip_for_shared_host(scene, connector, endpoint, binding, shape, options) {
            tracing::debug!(
                connector = %connector.id,
                shape = %shape.id,
                "skipping endpoint shared with originating host"
            );
            continue;
        }
        let mut anchor = fixed_point_to_global(binding.fixed_point, shape);
        if binding.mode == BindingMode::Orbit {
            anchor = avoid_rectangular_corner(shape, anchor, config);
            let adjacent = working.adjacent_global(endpoint).unwrap_or(anchor);
            anchor = if connector.elbow {
                snap_elbow_anchor(shape, anchor, adjacent, config)
            } else {
                snap_ray_to_outline(shape, anchor, adjacent, config)
            };
        }
        if connector.elbow {
            elbow_anchors[slot] = Some(anchor);
        } else {
            let index = working.point_index(endpoint);
            if index >= working.points.len() {
                continue;
            }
            let local = working.point_local(anchor);
            if points_differ(working.points[index], local) {
                working.points[index] = local;
                changed = true;
            }
        }
    }

    if connector.elbow && elbow_anchors.iter().any(Option::is_some) {
        let start = elbow_anchors[0].or_else(|| working.endpoint_global(ConnectorEndpoint::Start));
        let end = elbow_anchors[1].or_else(|| working.endpoint_global(ConnectorEndpoint::End));
        if let (Some(start), Some(end)) = (start, end) {
            let route = router.route(&working, start, end);
            let local: Vec<(f32, f32)> = route
                .iter()
                .map(|&(px, py)| (px - working.x, py - working.y))
                .collect();
            if local.len() != working.points.len()
                || local
                    .iter()
                    .zip(&working.points)
                    .any(|(&a, &b)| points_differ(a, b))
            {
                working.points = local;
                changed = true;
            }
        }
    }

    if !changed {
        return;
    }
    staged.push((
        connector.id.clone(),
        ElementUpdate::Connector(ConnectorUpdate {
            points: Some(working.points.clone()),
            ..Default::default()
        }),
    ));
    // The connector moved, so its own bound label follows the new route.
    for label_ref in &connector.bound_elements {
        if label_ref.kind != BoundRefKind::Label {
            continue;
        }
        let Some(label) = scene.live_label(&label_ref.id) else {
            continue;
        };
        if let Some(mid) = polyline_midpoint(&working.points) {
            stage_label_center(staged, label, (working.x + mid.0, working.y + mid.1));
        }
    }
}

fn skip_for_shared_host(
    scene: &Scene,
    connector: &ConnectorElement,
    endpoint: ConnectorEndpoint,
    binding: &Binding,
    shape: &ShapeElement,
    options: &UpdateOptions,
) -> bool {
    let Some(other) = connector.binding(endpoint.opposite()) else {
        return false;
    };
    if other.element_id == binding.element_id {
        return false;
    }
    if options.originated_from.as_deref() != Some(other.element_id.as_str()) {
        return false;
    }
    scene
        .live_shape(&other.element_id)
        .is_some_and(|other_shape| bounding_boxes_overlap(shape.bounds(), other_shape.bounds()))
}

fn stage_label_center(
    staged: &mut Vec<(String, ElementUpdate)>,
    label: &LabelElement,
    center: (f32, f32),
) {
    staged.push((
        label.id.clone(),
        ElementUpdate::Label(LabelUpdate {
            x: Some(center.0 - label.width / 2.0),
            y: Some(center.1 - label.height / 2.0),
            ..Default::default()
        }),
    ));
}

/// Unbind pass over the full live set after elements were logically
/// deleted. Deleted shapes release their dependents' binding fields;
/// deleted connectors and labels disappear from every shape's
/// back-reference list.
pub fn fix_bindings_after_deletion(scene: &mut Scene, deleted_ids: &[String]) {
    let mut deleted_shapes: Vec<String> = Vec::new();
    let mut deleted_dependents: BTreeSet<String> = BTreeSet::new();
    for id in deleted_ids {
        match scene.element(id) {
            Some(Element::Shape(_)) => deleted_shapes.push(id.clone()),
            Some(Element::Connector(_)) | Some(Element::Label(_)) => {
                deleted_dependents.insert(id.clone());
            }
            None => {}
        }
    }

    let mut staged: Vec<(String, ElementUpdate)> = Vec::new();

    // Bound side: each deleted shape releases the fields pointing at it.
    for shape_id in &deleted_shapes {
        for element in scene.iter_live() {
            match element {
                Element::Connector(connector) => {
                    let mut update = ConnectorUpdate::default();
                    let mut any = false;
                    for endpoint in [ConnectorEndpoint::Start, ConnectorEndpoint::End] {
                        if connector
                            .binding(endpoint)
                            .is_some_and(|binding| &binding.element_id == shape_id)
                        {
                            update.set_binding(endpoint, None);
                            any = true;
                        }
                    }
                    if any {
                        tracing::debug!(connector = %connector.id, shape = %shape_id, "clearing binding to deleted shape");
                        staged.push((connector.id.clone(), ElementUpdate::Connector(update)));
                    }
                }
                Element::Label(label) => {
                    if label.container_id.as_deref() == Some(shape_id) {
                        staged.push((
                            label.id.clone(),
                            ElementUpdate::Label(LabelUpdate {
                                container_id: Some(None),
                                ..Default::default()
                            }),
                        ));
                    }
                }
                Element::Shape(_) => {}
            }
        }
    }

    // Bindable side: deleted connectors/labels leave every shape's
    // back-reference list. One filtered list per shape covers all
    // deletions at once.
    if !deleted_dependents.is_empty() {
        for element in scene.iter_live() {
            let Element::Shape(shape) = element else {
                continue;
            };
            if !shape
                .bound_elements
                .iter()
                .any(|bound_ref| deleted_dependents.contains(&bound_ref.id))
            {
                continue;
            }
            let refs: Vec<BoundRef> = shape
                .bound_elements
                .iter()
                .filter(|bound_ref| !deleted_dependents.contains(&bound_ref.id))
                .cloned()
                .collect();
            staged.push((
                shape.id.clone(),
                ElementUpdate::Shape(ShapeUpdate {
                    bound_elements: Some(refs),
                    ..Default::default()
                }),
            ));
        }
    }

    for (id, update) in staged {
        scene.apply_update(&id, update);
    }
}

/// Rebind pass after elements came back to life (an undo-style restore).
/// Restored shapes regain back-references from live dependents; restored
/// connectors reuse valid back-references or drop bindings to shapes
/// that stayed deleted; restored labels claim their container with
/// last-added-wins semantics.
pub fn fix_bindings_after_restore(scene: &mut Scene, restored_ids: &[String]) {
    let mut staged: Vec<(String, ElementUpdate)> = Vec::new();

    for id in restored_ids {
        match scene.element(id) {
            Some(Element::Shape(shape)) if !shape.is_deleted => {
                let mut refs = shape.bound_elements.clone();
                let mut changed = false;
                for element in scene.iter_live() {
                    if let Element::Connector(connector) = element
                        && connector_targets(connector, id)
                        && !refs.iter().any(|r| r.id == connector.id)
                    {
                        refs.push(BoundRef::connector(connector.id.clone()));
                        changed = true;
                    }
                }
                let claimants: Vec<&LabelElement> = scene
                    .iter_live()
                    .filter_map(Element::as_label)
                    .filter(|label| label.container_id.as_deref() == Some(id))
                    .collect();
                if let Some((winner, losers)) = claimants.split_last() {
                    let before = refs.len();
                    refs.retain(|r| r.kind != BoundRefKind::Label || r.id == winner.id);
                    changed |= refs.len() != before;
                    if !refs.iter().any(|r| r.id == winner.id) {
                        refs.push(BoundRef::label(winner.id.clone()));
                        changed = true;
                    }
                    for loser in losers {
                        tracing::debug!(shape = %id, label = %loser.id, "detaching conflicting label");
                        staged.push((
                            loser.id.clone(),
                            ElementUpdate::Label(LabelUpdate {
                                container_id: Some(None),
                                ..Default::default()
                            }),
                        ));
                    }
                }
                if changed {
                    staged.push((
                        id.clone(),
                        ElementUpdate::Shape(ShapeUpdate {
                            bound_elements: Some(refs),
                            ..Default::default()
                        }),
                    ));
                }
            }
            Some(Element::Connector(connector)) if !connector.is_deleted => {
                let mut shape_refs: BTreeMap<String, Vec<BoundRef>> = BTreeMap::new();
                let mut update = ConnectorUpdate::default();
                let mut clear_any = false;
                for endpoint in [ConnectorEndpoint::Start, ConnectorEndpoint::End] {
                    let Some(binding) = connector.binding(endpoint) else {
                        continue;
                    };
                    match scene.shape(&binding.element_id) {
                        Some(shape) if !shape.is_deleted => {
                            let refs = shape_refs
                                .entry(shape.id.clone())
                                .or_insert_with(|| shape.bound_elements.clone());
                            if !refs.iter().any(|r| r.id == connector.id) {
                                refs.push(BoundRef::connector(connector.id.clone()));
                            }
                        }
                        _ => {
                            tracing::debug!(connector = %id, shape = %binding.element_id, "dropping binding to deleted shape");
                            update.set_binding(endpoint, None);
                            clear_any = true;
                        }
                    }
                }
                for (shape_id, refs) in shape_refs {
                    let unchanged = scene
                        .shape(&shape_id)
                        .is_some_and(|shape| shape.bound_elements == refs);
                    if !unchanged {
                        staged.push((
                            shape_id,
                            ElementUpdate::Shape(ShapeUpdate {
                                bound_elements: Some(refs),
                                ..Default::default()
                            }),
                        ));
                    }
                }
                if clear_any {
                    staged.push((id.clone(), ElementUpdate::Connector(update)));
                }
            }
            Some(Element::Label(label)) if !label.is_deleted => {
                let Some(container_id) = label.container_id.clone() else {
                    continue;
                };
                match scene.shape(&container_id) {
                    Some(shape) if !shape.is_deleted => {
                        let mut refs: Vec<BoundRef> = Vec::with_capacity(shape.bound_elements.len() + 1);
                        for bound_ref in &shape.bound_elements {
                            if bound_ref.kind == BoundRefKind::Label && bound_ref.id != label.id {
                                // Last added wins; the previous label is detached.
                                tracing::debug!(shape = %container_id, label = %bound_ref.id, "detaching superseded label");
                                staged.push((
                                    bound_ref.id.clone(),
                                    ElementUpdate::Label(LabelUpdate {
                                        container_id: Some(None),
                                        ..Default::default()
                                    }),
                                ));
                                continue;
                            }
                            refs.push(bound_ref.clone());
                        }
                        if !refs.iter().any(|r| r.id == label.id) {
                            refs.push(BoundRef::label(label.id.clone()));
                        }
                        if refs != shape.bound_elements {
                            staged.push((
                                container_id,
                                ElementUpdate::Shape(ShapeUpdate {
                                    bound_elements: Some(refs),
                                    ..Default::default()
                                }),
                            ));
                        }
                    }
                    _ => {
                        staged.push((
                            id.clone(),
                            ElementUpdate::Label(LabelUpdate {
                                container_id: Some(None),
                                ..Default::default()
                            }),
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    for (id, update) in staged {
        scene.apply_update(&id, update);
    }
}

/// Rewrites every reference on freshly duplicated elements through the
/// original-id to duplicate-id map. References whose target was not
/// duplicated are dropped, and elbow duplicates re-derive their route
/// from the remapped fixed endpoints.
pub fn fix_bindings_after_duplication(
    scene: &mut Scene,
    duplicated_ids: &[String],
    id_map: &BTreeMap<String, String>,
    router: &dyn ElbowRouter,
    config: &BindingConfig,
) {
    let mut staged: Vec<(String, ElementUpdate)> = Vec::new();

    for id in duplicated_ids {
        match scene.element(id) {
            Some(Element::Shape(shape)) => {
                let refs: Vec<BoundRef> = shape
                    .bound_elements
                    .iter()
                    .filter_map(|bound_ref| {
                        let mapped = id_map.get(&bound_ref.id);
                        if mapped.is_none() {
                            tracing::debug!(shape = %id, dropped = %bound_ref.id, "dropping unmapped back-reference");
                        }
                        mapped.map(|new_id| BoundRef {
                            id: new_id.clone(),
                            kind: bound_ref.kind,
                        })
                    })
                    .collect();
                if refs != shape.bound_elements {
                    staged.push((
                        id.clone(),
                        ElementUpdate::Shape(ShapeUpdate {
                            bound_elements: Some(refs),
                            ..Default::default()
                        }),
                    ));
                }
            }
            Some(Element::Connector(connector)) => {
                let mut update = ConnectorUpdate::default();
                let mut remapped = connector.clone();
                let mut any = false;
                for endpoint in [ConnectorEndpoint::Start, ConnectorEndpoint::End] {
                    let Some(binding) = connector.binding(endpoint) else {
                        continue;
                    };
                    let new_binding = id_map.get(&binding.element_id).map(|new_id| Binding {
                        element_id: new_id.clone(),
                        ..binding.clone()
                    });
                    if new_binding.as_ref() != Some(binding) {
                        any = true;
                    }
                    match endpoint {
                        ConnectorEndpoint::Start => remapped.start_binding = new_binding.clone(),
                        ConnectorEndpoint::End => remapped.end_binding = new_binding.clone(),
                    }
                    update.set_binding(endpoint, new_binding);
                }
                let refs: Vec<BoundRef> = connector
                    .bound_elements
                    .iter()
                    .filter_map(|bound_ref| {
                        id_map.get(&bound_ref.id).map(|new_id| BoundRef {
                            id: new_id.clone(),
                            kind: bound_ref.kind,
                        })
                    })
                    .collect();
                if refs != connector.bound_elements {
                    update.bound_elements = Some(refs);
                    any = true;
                }
                if connector.elbow
                    && let Some(points) = rederive_elbow_route(scene, &remapped, router, config)
                {
                    if points != connector.points {
                        update.points = Some(points);
                        any = true;
                    }
                }
                if any {
                    staged.push((id.clone(), ElementUpdate::Connector(update)));
                }
            }
            Some(Element::Label(label)) => {
                if let Some(container_id) = &label.container_id {
                    let mapped = id_map.get(container_id).cloned();
                    if mapped.as_deref() != Some(container_id.as_str()) {
                        staged.push((
                            id.clone(),
                            ElementUpdate::Label(LabelUpdate {
                                container_id: Some(mapped),
                                ..Default::default()
                            }),
                        ));
                    }
                }
            }
            None => {}
        }
    }

    for (id, update) in staged {
        scene.apply_update(&id, update);
    }
}

/// New route for an elbow duplicate, derived from its (possibly
/// remapped) fixed endpoints. Unbound ends stay where they are.
fn rederive_elbow_route(
    scene: &Scene,
    connector: &ConnectorElement,
    router: &dyn ElbowRouter,
    config: &BindingConfig,
) -> Option<Vec<(f32, f32)>> {
    let mut endpoints: [Option<(f32, f32)>; 2] = [None, None];
    for (slot, endpoint) in [ConnectorEndpoint::Start, ConnectorEndpoint::End]
        .into_iter()
        .enumerate()
    {
        endpoints[slot] = match connector.binding(endpoint) {
            Some(binding) => {
                let shape = scene.live_shape(&binding.element_id)?;
                let anchor = fixed_point_to_global(binding.fixed_point, shape);
                let adjacent = connector.adjacent_global(endpoint).unwrap_or(anchor);
                Some(snap_elbow_anchor(shape, anchor, adjacent, config))
            }
            None => connector.endpoint_global(endpoint),
        };
    }
    let (Some(start), Some(end)) = (endpoints[0], endpoints[1]) else {
        return None;
    };
    let route = router.route(connector, start, end);
    Some(
        route
            .iter()
            .map(|&(px, py)| (px - connector.x, py - connector.y))
            .collect(),
    )
}

fn connector_targets(connector: &ConnectorElement, shape_id: &str) -> bool {
    [ConnectorEndpoint::Start, ConnectorEndpoint::End]
        .into_iter()
        .any(|endpoint| {
            connector
                .binding(endpoint)
                .is_some_and(|binding| binding.element_id == shape_id)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::resolver::bind_connector_end;
    use crate::element::ShapeKind;
    use crate::routing::MidAxisRouter;

    fn rect(id: &str, x: f32, y: f32, w: f32, h: f32) -> ShapeElement {
        ShapeElement::new(id, ShapeKind::Rectangle, x, y, w, h)
    }

    fn bound_scene() -> Scene {
        let mut scene = Scene::new();
        scene.insert(Element::Shape(rect("host", 100.0, 100.0, 80.0, 60.0)));
        // The endpoint sits off the host's mid-lines so fixed-point
        // ratios stay clear of the 0.5 nudge in position assertions.
        scene.insert(Element::Connector(ConnectorElement::new(
            "arrow",
            0.0,
            120.0,
            vec![(0.0, 0.0), (110.0, 0.0)],
        )));
        bind_connector_end(
            &mut scene,
            "arrow",
            ConnectorEndpoint::End,
            "host",
            BindingMode::Inside,
            crate::config::default_config(),
        );
        scene
    }

    #[test]
    fn moving_the_host_moves_the_bound_endpoint() {
        let config = BindingConfig::default();
        let mut scene = bound_scene();
        let before = scene
            .connector("arrow")
            .unwrap()
            .endpoint_global(ConnectorEndpoint::End)
            .unwrap();
        scene.apply_update(
            "host",
            ElementUpdate::Shape(ShapeUpdate { x: Some(140.0), ..Default::default() }),
        );
        update_bound_elements(
            &mut scene,
            "host",
            &UpdateOptions::default(),
            &MidAxisRouter,
            &config,
        );
        let after = scene
            .connector("arrow")
            .unwrap()
            .endpoint_global(ConnectorEndpoint::End)
            .unwrap();
        assert!((after.0 - (before.0 + 40.0)).abs() < 1e-3);
        assert!((after.1 - before.1).abs() < 1e-3);
    }

    #[test]
    fn resizing_and_rotating_the_host_keeps_the_anchor_ratio() {
        let config = BindingConfig::default();
        let mut scene = bound_scene();
        scene.apply_update(
            "host",
            ElementUpdate::Shape(ShapeUpdate {
                width: Some(160.0),
                height: Some(90.0),
                angle: Some(std::f32::consts::FRAC_PI_3),
                ..Default::default()
            }),
        );
        update_bound_elements(&mut scene, "host", &UpdateOptions::default(), &MidAxisRouter, &config);
        let connector = scene.connector("arrow").unwrap();
        let binding = connector.end_binding.as_ref().unwrap();
        let expected = fixed_point_to_global(binding.fixed_point, scene.shape("host").unwrap());
        let actual = connector.endpoint_global(ConnectorEndpoint::End).unwrap();
        assert!((actual.0 - expected.0).abs() < 1e-2);
        assert!((actual.1 - expected.1).abs() < 1e-2);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let config = BindingConfig::default();
        let mut scene = bound_scene();
        scene.apply_update(
            "host",
            ElementUpdate::Shape(ShapeUpdate { y: Some(90.0), ..Default::default() }),
        );
        update_bound_elements(&mut scene, "host", &UpdateOptions::default(), &MidAxisRouter, &config);
        let first = scene.connector("arrow").unwrap().points.clone();
        update_bound_elements(&mut scene, "host", &UpdateOptions::default(), &MidAxisRouter, &config);
        let second = scene.connector("arrow").unwrap().points.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn excluded_connectors_are_left_alone() {
        let config = BindingConfig::default();
        let mut scene = bound_scene();
        let before = scene.connector("arrow").unwrap().points.clone();
        scene.apply_update(
            "host",
            ElementUpdate::Shape(ShapeUpdate { x: Some(300.0), ..Default::default() }),
        );
        let options = UpdateOptions {
            excluded: BTreeSet::from(["arrow".to_string()]),
            ..Default::default()
        };
        update_bound_elements(&mut scene, "host", &options, &MidAxisRouter, &config);
        assert_eq!(scene.connector("arrow").unwrap().points, before);
    }

    #[test]
    fn stale_refs_are_pruned_on_update() {
        let config = BindingConfig::default();
        let mut scene = bound_scene();
        scene.mark_deleted("arrow");
        update_bound_elements(&mut scene, "host", &UpdateOptions::default(), &MidAxisRouter, &config);
        assert!(scene.shape("host").unwrap().bound_elements.is_empty());
    }

    #[test]
    fn container_label_follows_the_shape() {
        let config = BindingConfig::default();
        let mut scene = Scene::new();
        let mut shape = rect("host", 0.0, 0.0, 100.0, 50.0);
        shape.bound_elements.push(BoundRef::label("tag"));
        scene.insert(Element::Shape(shape));
        let mut label = LabelElement::new("tag", 0.0, 0.0, 40.0, 10.0);
        label.container_id = Some("host".to_string());
        scene.insert(Element::Label(label));
        scene.apply_update(
            "host",
            ElementUpdate::Shape(ShapeUpdate { x: Some(200.0), ..Default::default() }),
        );
        update_bound_elements(&mut scene, "host", &UpdateOptions::default(), &MidAxisRouter, &config);
        let label = scene.label("tag").unwrap();
        assert_eq!((label.x, label.y), (250.0 - 20.0, 25.0 - 5.0));
    }

    #[test]
    fn deletion_cascade_clears_all_bindings() {
        let config = BindingConfig::default();
        let mut scene = Scene::new();
        scene.insert(Element::Shape(rect("host", 100.0, 100.0, 80.0, 60.0)));
        for i in 0..3 {
            scene.insert(Element::Connector(ConnectorElement::new(
                format!("arrow-{i}"),
                0.0,
                110.0 + i as f32 * 10.0,
                vec![(0.0, 0.0), (110.0, 0.0)],
            )));
            bind_connector_end(
                &mut scene,
                &format!("arrow-{i}"),
                ConnectorEndpoint::End,
                "host",
                BindingMode::Inside,
                &config,
            );
        }
        scene.mark_deleted("host");
        fix_bindings_after_deletion(&mut scene, &["host".to_string()]);
        for i in 0..3 {
            let connector = scene.connector(&format!("arrow-{i}")).unwrap();
            assert!(connector.end_binding.is_none(), "arrow-{i} still bound");
        }
    }

    #[test]
    fn deleting_two_connectors_prunes_both_refs() {
        let config = BindingConfig::default();
        let mut scene = Scene::new();
        scene.insert(Element::Shape(rect("host", 100.0, 100.0, 80.0, 60.0)));
        for id in ["a", "b"] {
            scene.insert(Element::Connector(ConnectorElement::new(
                id,
                0.0,
                130.0,
                vec![(0.0, 0.0), (110.0, 0.0)],
            )));
            bind_connector_end(&mut scene, id, ConnectorEndpoint::End, "host", BindingMode::Inside, &config);
        }
        scene.mark_deleted("a");
        scene.mark_deleted("b");
        fix_bindings_after_deletion(&mut scene, &["a".to_string(), "b".to_string()]);
        assert!(scene.shape("host").unwrap().bound_elements.is_empty());
    }

    #[test]
    fn restore_rebinds_live_dependents() {
        let config = BindingConfig::default();
        let mut scene = bound_scene();
        scene.mark_deleted("host");
        fix_bindings_after_deletion(&mut scene, &["host".to_string()]);
        // The connector lost its binding; re-bind manually as an undo
        // would restore it, then bring the shape back.
        scene.restore("host");
        scene.apply_update(
            "arrow",
            ElementUpdate::Connector({
                let mut update = ConnectorUpdate::default();
                update.set_binding(
                    ConnectorEndpoint::End,
                    Some(Binding {
                        element_id: "host".to_string(),
                        mode: BindingMode::Inside,
                        fixed_point: crate::binding::anchor::normalize_fixed_point(0.3, 0.3),
                    }),
                );
                update
            }),
        );
        scene.apply_update(
            "host",
            ElementUpdate::Shape(ShapeUpdate {
                bound_elements: Some(Vec::new()),
                ..Default::default()
            }),
        );
        fix_bindings_after_restore(&mut scene, &["host".to_string()]);
        assert!(scene.shape("host").unwrap().has_bound_ref("arrow"));
    }

    #[test]
    fn restore_connector_drops_binding_to_deleted_shape() {
        let mut scene = bound_scene();
        scene.mark_deleted("host");
        scene.mark_deleted("arrow");
        scene.restore("arrow");
        fix_bindings_after_restore(&mut scene, &["arrow".to_string()]);
        assert!(scene.connector("arrow").unwrap().end_binding.is_none());
    }

    #[test]
    fn last_added_label_wins_the_container() {
        let mut scene = Scene::new();
        let mut shape = rect("host", 0.0, 0.0, 100.0, 50.0);
        shape.bound_elements.push(BoundRef::label("old"));
        scene.insert(Element::Shape(shape));
        let mut old_label = LabelElement::new("old", 0.0, 0.0, 10.0, 10.0);
        old_label.container_id = Some("host".to_string());
        scene.insert(Element::Label(old_label));
        let mut new_label = LabelElement::new("new", 0.0, 0.0, 10.0, 10.0);
        new_label.container_id = Some("host".to_string());
        scene.insert(Element::Label(new_label));
        fix_bindings_after_restore(&mut scene, &["new".to_string()]);
        let shape = scene.shape("host").unwrap();
        assert!(shape.has_bound_ref("new"));
        assert!(!shape.has_bound_ref("old"));
        assert!(scene.label("old").unwrap().container_id.is_none());
        assert_eq!(
            scene.label("new").unwrap().container_id.as_deref(),
            Some("host")
        );
    }

    #[test]
    fn duplication_remaps_bindings_to_duplicates() {
        let config = BindingConfig::default();
        let mut scene = bound_scene();
        let ids = vec!["host".to_string(), "arrow".to_string()];
        let id_map = scene.duplicate_elements(&ids);
        let new_ids: Vec<String> = id_map.values().cloned().collect();
        fix_bindings_after_duplication(&mut scene, &new_ids, &id_map, &MidAxisRouter, &config);

        let new_host = id_map.get("host").unwrap();
        let new_arrow = id_map.get("arrow").unwrap();
        let connector = scene.connector(new_arrow).unwrap();
        assert_eq!(
            connector.end_binding.as_ref().unwrap().element_id,
            *new_host
        );
        let shape = scene.shape(new_host).unwrap();
        assert!(shape.has_bound_ref(new_arrow));
        assert!(!shape.has_bound_ref("arrow"));
        // Originals are untouched.
        assert_eq!(
            scene.connector("arrow").unwrap().end_binding.as_ref().unwrap().element_id,
            "host"
        );
    }

    #[test]
    fn duplication_drops_references_without_duplicates() {
        let config = BindingConfig::default();
        let mut scene = bound_scene();
        let ids = vec!["arrow".to_string()];
        let id_map = scene.duplicate_elements(&ids);
        let new_ids: Vec<String> = id_map.values().cloned().collect();
        fix_bindings_after_duplication(&mut scene, &new_ids, &id_map, &MidAxisRouter, &config);
        let connector = scene.connector(id_map.get("arrow").unwrap()).unwrap();
        assert!(connector.end_binding.is_none());
    }
}
