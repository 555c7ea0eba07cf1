use serde::{Deserialize, Serialize};

/// Shape silhouettes the binding engine distinguishes. The silhouette
/// drives outline intersection, corner avoidance and the bindable zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    RoundRect,
    Diamond,
    Ellipse,
    FreeForm,
    Frame,
}

impl ShapeKind {
    /// Rectangle-silhouette shapes share outline and corner-avoidance behavior.
    pub fn is_rectanguloid(self) -> bool {
        matches!(self, Self::Rectangle | Self::RoundRect | Self::Frame)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundRefKind {
    Connector,
    Label,
}

/// Back-reference carried by a shape: one connector or label that
/// depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundRef {
    pub id: String,
    pub kind: BoundRefKind,
}

impl BoundRef {
    pub fn connector(id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: BoundRefKind::Connector }
    }

    pub fn label(id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: BoundRefKind::Label }
    }
}

/// `Inside` anchors may rest anywhere within or on the outline; `Orbit`
/// anchors are kept just outside it, avoiding corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    Inside,
    Orbit,
}

/// Ratio-space anchor coordinate relative to the host shape's bounding
/// box, invariant under the host's moves and resizes. Never exactly 0.5
/// on either axis once normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedPoint {
    pub x: f32,
    pub y: f32,
}

/// Persisted binding record attached to one connector endpoint. This is
/// the only binding state that crosses the serialization boundary and it
/// must round-trip exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub element_id: String,
    pub mode: BindingMode,
    pub fixed_point: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeElement {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Rotation in radians, applied about the bounding-box center.
    pub angle: f32,
    pub kind: ShapeKind,
    /// Local-space outline polygon; only read for `ShapeKind::FreeForm`.
    #[serde(default)]
    pub outline: Vec<(f32, f32)>,
    #[serde(default)]
    pub bound_elements: Vec<BoundRef>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl ShapeElement {
    pub fn new(id: impl Into<String>, kind: ShapeKind, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            angle: 0.0,
            kind,
            outline: Vec::new(),
            bound_elements: Vec::new(),
            is_deleted: false,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Axis-aligned bounds as `(x, y, width, height)`, ignoring rotation.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.width, self.height)
    }

    pub fn has_bound_ref(&self, id: &str) -> bool {
        self.bound_elements.iter().any(|r| r.id == id)
    }
}

/// Which end of a connector an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorEndpoint {
    Start,
    End,
}

impl ConnectorEndpoint {
    pub fn opposite(self) -> Self {
        match self {
            Self::Start => Self::End,
            Self::End => Self::Start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorElement {
    pub id: String,
    pub x: f32,
    pub y: f32,
    /// Rotation in radians about the local-point bounding-box center.
    /// Elbow connectors keep this at zero; their routes are axis-aligned.
    pub angle: f32,
    /// Local-space route, offset from `(x, y)`. Bindable connectors have
    /// at least two points.
    pub points: Vec<(f32, f32)>,
    #[serde(default)]
    pub elbow: bool,
    #[serde(default)]
    pub start_binding: Option<Binding>,
    #[serde(default)]
    pub end_binding: Option<Binding>,
    /// At most one label ref (the connector's own label).
    #[serde(default)]
    pub bound_elements: Vec<BoundRef>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl ConnectorElement {
    pub fn new(id: impl Into<String>, x: f32, y: f32, points: Vec<(f32, f32)>) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            angle: 0.0,
            points,
            elbow: false,
            start_binding: None,
            end_binding: None,
            bound_elements: Vec::new(),
            is_deleted: false,
        }
    }

    pub fn binding(&self, endpoint: ConnectorEndpoint) -> Option<&Binding> {
        match endpoint {
            ConnectorEndpoint::Start => self.start_binding.as_ref(),
            ConnectorEndpoint::End => self.end_binding.as_ref(),
        }
    }

    pub fn point_index(&self, endpoint: ConnectorEndpoint) -> usize {
        match endpoint {
            ConnectorEndpoint::Start => 0,
            ConnectorEndpoint::End => self.points.len().saturating_sub(1),
        }
    }

    /// Index of the route point adjacent to `endpoint`.
    pub fn adjacent_index(&self, endpoint: ConnectorEndpoint) -> usize {
        match endpoint {
            ConnectorEndpoint::Start => 1.min(self.points.len().saturating_sub(1)),
            ConnectorEndpoint::End => self.points.len().saturating_sub(2),
        }
    }

    /// Local-point bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn local_bounds(&self) -> (f32, f32, f32, f32) {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for &(px, py) in &self.points {
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
        if min_x > max_x {
            return (0.0, 0.0, 0.0, 0.0);
        }
        (min_x, min_y, max_x, max_y)
    }

    fn rotation_center(&self) -> (f32, f32) {
        let (min_x, min_y, max_x, max_y) = self.local_bounds();
        (self.x + (min_x + max_x) / 2.0, self.y + (min_y + max_y) / 2.0)
    }

    pub fn point_global(&self, local: (f32, f32)) -> (f32, f32) {
        let point = (self.x + local.0, self.y + local.1);
        if self.angle == 0.0 {
            return point;
        }
        crate::geometry::rotate_point(point, self.rotation_center(), self.angle)
    }

    pub fn point_local(&self, global: (f32, f32)) -> (f32, f32) {
        let point = if self.angle == 0.0 {
            global
        } else {
            crate::geometry::rotate_point(global, self.rotation_center(), -self.angle)
        };
        (point.0 - self.x, point.1 - self.y)
    }

    pub fn endpoint_global(&self, endpoint: ConnectorEndpoint) -> Option<(f32, f32)> {
        let local = *self.points.get(self.point_index(endpoint))?;
        Some(self.point_global(local))
    }

    pub fn adjacent_global(&self, endpoint: ConnectorEndpoint) -> Option<(f32, f32)> {
        let local = *self.points.get(self.adjacent_index(endpoint))?;
        Some(self.point_global(local))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelElement {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl LabelElement {
    pub fn new(id: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            container_id: None,
            is_deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum Element {
    Shape(ShapeElement),
    Connector(ConnectorElement),
    Label(LabelElement),
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Self::Shape(shape) => &shape.id,
            Self::Connector(connector) => &connector.id,
            Self::Label(label) => &label.id,
        }
    }

    pub fn is_deleted(&self) -> bool {
        match self {
            Self::Shape(shape) => shape.is_deleted,
            Self::Connector(connector) => connector.is_deleted,
            Self::Label(label) => label.is_deleted,
        }
    }

    pub(crate) fn set_deleted(&mut self, deleted: bool) {
        match self {
            Self::Shape(shape) => shape.is_deleted = deleted,
            Self::Connector(connector) => connector.is_deleted = deleted,
            Self::Label(label) => label.is_deleted = deleted,
        }
    }

    pub(crate) fn set_id(&mut self, id: String) {
        match self {
            Self::Shape(shape) => shape.id = id,
            Self::Connector(connector) => connector.id = id,
            Self::Label(label) => label.id = id,
        }
    }

    pub fn as_shape(&self) -> Option<&ShapeElement> {
        match self {
            Self::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn as_connector(&self) -> Option<&ConnectorElement> {
        match self {
            Self::Connector(connector) => Some(connector),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&LabelElement> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }
}
