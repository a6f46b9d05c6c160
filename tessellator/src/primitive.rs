//! Primitive kinds, vertex codes and stroke edges.

/// Kind of shape submitted between `begin_shape` and `end_shape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveKind {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleFan,
    TriangleStrip,
    Quads,
    QuadStrip,
    /// General polygon, possibly with curves and contours.
    #[default]
    Polygon,
}

impl PrimitiveKind {
    /// Kinds whose fill is a list of independent or connected triangles.
    pub fn is_triangle_kind(&self) -> bool {
        matches!(
            self,
            Self::Triangles | Self::TriangleFan | Self::TriangleStrip | Self::Quads | Self::QuadStrip
        )
    }

    /// Kinds that only ever produce strokes.
    pub fn is_line_kind(&self) -> bool {
        matches!(self, Self::Lines | Self::LineStrip | Self::LineLoop)
    }
}

/// Marker stored in the sparse vertex code stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexCode {
    /// Plain vertex.
    Vertex,
    /// First of three vertices forming a cubic bezier segment.
    Bezier,
    /// First of two vertices forming a quadratic segment.
    Quadratic,
    /// Catmull-Rom control point.
    Curve,
    /// Start of a new contour.
    Break,
}

/// Position of an edge within its stroke path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Interior segment, joined to its predecessor.
    Middle,
    /// First segment of a path.
    Start,
    /// Last segment of a path.
    Stop,
    /// A path made of one segment.
    Single,
    /// Marker closing the path: joins the last segment back to the first.
    Close,
}

impl EdgeKind {
    pub fn from_flags(start: bool, end: bool) -> Self {
        match (start, end) {
            (false, false) => Self::Middle,
            (true, false) => Self::Start,
            (false, true) => Self::Stop,
            (true, true) => Self::Single,
        }
    }

    /// Whether this segment begins a new path.
    pub fn starts_path(&self) -> bool {
        matches!(self, Self::Start | Self::Single)
    }
}

/// A stroke segment between two vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub start: usize,
    pub end: usize,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(start: usize, end: usize, kind: EdgeKind) -> Self {
        Self { start, end, kind }
    }
}

/// Append the edges of a polyline over vertices `first..=last`.
///
/// A closed polyline gets a segment from `last` back to `first` followed by a
/// [`EdgeKind::Close`] marker.
pub fn push_polygon_edges(edges: &mut Vec<Edge>, first: usize, last: usize, closed: bool) {
    if last <= first {
        return;
    }
    let closed = closed && last - first >= 2;
    for i in first..last {
        let is_start = i == first;
        let is_end = !closed && i + 1 == last;
        edges.push(Edge::new(i, i + 1, EdgeKind::from_flags(is_start, is_end)));
    }
    if closed {
        edges.push(Edge::new(last, first, EdgeKind::Stop));
        edges.push(Edge::new(last, first, EdgeKind::Close));
    }
}
