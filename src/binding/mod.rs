//! The binding engine: anchor math, hover candidate lookup, endpoint
//! bind/unbind decisions, and reference-graph consistency maintenance.

pub mod anchor;
pub mod candidate;
pub mod consistency;
pub mod resolver;

pub use anchor::{
    avoid_rectangular_corner, fixed_point_to_global, global_to_fixed_point, max_binding_distance,
    normalize_fixed_point, snap_to_mid, snap_to_outline,
};
pub use candidate::{best_candidate, find_bindable_at};
pub use consistency::{
    UpdateOptions, fix_bindings_after_deletion, fix_bindings_after_duplication,
    fix_bindings_after_restore, update_bound_elements,
};
pub use resolver::{
    DraggedEndpoints, SuggestedBinding, bind_connector_end, is_simple_and_already_bound,
    resolve_endpoint_drag, suggested_bindings_for_connectors, unbind_connector_end,
};
