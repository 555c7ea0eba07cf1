pub mod binding;
pub mod config;
pub mod element;
pub mod geometry;
pub mod routing;
pub mod scene;

pub use binding::{
    UpdateOptions, find_bindable_at, fix_bindings_after_deletion, fix_bindings_after_duplication,
    fix_bindings_after_restore, resolve_endpoint_drag, suggested_bindings_for_connectors,
    update_bound_elements,
};
pub use config::{BindingConfig, default_config, load_config};
pub use element::{
    Binding, BindingMode, BoundRef, BoundRefKind, ConnectorElement, ConnectorEndpoint, Element,
    FixedPoint, LabelElement, ShapeElement, ShapeKind,
};
pub use routing::{ElbowRouter, MidAxisRouter};
pub use scene::{ConnectorUpdate, ElementUpdate, LabelUpdate, Scene, ShapeUpdate};
