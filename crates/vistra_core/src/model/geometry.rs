//! Typed, appendable geometry buffers.
//!
//! # Responsibility
//! - Hold per-object, per-primitive-kind data channels grouped in blocks.
//! - Enforce per-vertex cardinality agreement atomically on every append.
//!
//! # Invariants
//! - A failed append never mutates any channel of the target block.
//! - All non-empty per-vertex channels of one block agree on element count.
//! - `new_block` never discards prior blocks; only `clear` does, and it is
//!   irreversible.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for geometry mutations.
pub type GeometryResult<T> = Result<T, GeometryError>;

/// Render-primitive kind one geometry store belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Points,
    Lines,
    Triangles,
    Quads,
    Volume,
    Labels,
}

impl GeometryKind {
    pub const ALL: &'static [GeometryKind] = &[
        Self::Points,
        Self::Lines,
        Self::Triangles,
        Self::Quads,
        Self::Volume,
        Self::Labels,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::Triangles => "triangles",
            Self::Quads => "quads",
            Self::Volume => "volume",
            Self::Labels => "labels",
        }
    }

    pub fn parse(value: &str) -> Option<GeometryKind> {
        match value {
            "points" => Some(Self::Points),
            "lines" => Some(Self::Lines),
            "triangles" => Some(Self::Triangles),
            "quads" => Some(Self::Quads),
            "volume" => Some(Self::Volume),
            "labels" => Some(Self::Labels),
            _ => None,
        }
    }
}

impl Display for GeometryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data channel classification within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChannelKind {
    Vertices,
    Normals,
    Colours,
    TexCoords,
    Indices,
    Values,
    Labels,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vertices => "vertices",
            Self::Normals => "normals",
            Self::Colours => "colours",
            Self::TexCoords => "texcoords",
            Self::Indices => "indices",
            Self::Values => "values",
            Self::Labels => "labels",
        }
    }

    /// Components per element for this channel kind.
    pub fn dims(self) -> usize {
        match self {
            Self::Vertices | Self::Normals => 3,
            Self::TexCoords => 2,
            Self::Colours | Self::Indices | Self::Values | Self::Labels => 1,
        }
    }

    /// Whether elements count per primitive rather than per vertex.
    ///
    /// Indices are inherently per-primitive; all other kinds start
    /// per-vertex and may be collapsed by [`GeometryStore::compact`].
    pub fn per_primitive(self) -> bool {
        matches!(self, Self::Indices)
    }

    fn expected_data(self) -> &'static str {
        match self {
            Self::Vertices | Self::Normals | Self::TexCoords | Self::Values => "float",
            Self::Colours | Self::Indices => "uint",
            Self::Labels => "text",
        }
    }
}

impl Display for ChannelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw channel payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Float(Vec<f32>),
    UInt(Vec<u32>),
    Text(Vec<String>),
}

impl ChannelData {
    pub fn len(&self) -> usize {
        match self {
            Self::Float(data) => data.len(),
            Self::UInt(data) => data.len(),
            Self::Text(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::UInt(_) => "uint",
            Self::Text(_) => "text",
        }
    }

    fn extend(&mut self, other: ChannelData) {
        match (self, other) {
            (Self::Float(dest), Self::Float(src)) => dest.extend(src),
            (Self::UInt(dest), Self::UInt(src)) => dest.extend(src),
            (Self::Text(dest), Self::Text(src)) => dest.extend(src),
            _ => unreachable!("type agreement is checked before extend"),
        }
    }
}

/// Errors from geometry mutations.
#[derive(Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// Appended data would break per-vertex count agreement in the block.
    CardinalityMismatch {
        channel: ChannelKind,
        expected: usize,
        got: usize,
    },
    /// Payload type does not match the channel kind.
    DataTypeMismatch {
        channel: ChannelKind,
        expected: &'static str,
        got: &'static str,
    },
    /// Data length is not a multiple of the channel's component count.
    InvalidStride {
        channel: ChannelKind,
        dims: usize,
        len: usize,
    },
    /// Block index out of range.
    NoSuchBlock { index: usize, count: usize },
}

impl Display for GeometryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CardinalityMismatch {
                channel,
                expected,
                got,
            } => write!(
                f,
                "channel `{channel}` would hold {got} elements but the block is established at {expected}"
            ),
            Self::DataTypeMismatch {
                channel,
                expected,
                got,
            } => write!(f, "channel `{channel}` expects {expected} data, got {got}"),
            Self::InvalidStride { channel, dims, len } => write!(
                f,
                "channel `{channel}` data length {len} is not a multiple of {dims} components"
            ),
            Self::NoSuchBlock { index, count } => {
                write!(f, "block index {index} out of range ({count} blocks)")
            }
        }
    }
}

impl Error for GeometryError {}

/// One data channel: payload plus metadata and a scalar range cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    kind: ChannelKind,
    label: Option<String>,
    dims: usize,
    per_primitive: bool,
    data: ChannelData,
    range: Option<(f32, f32)>,
}

impl Channel {
    fn new(kind: ChannelKind, label: Option<String>, data: ChannelData) -> Self {
        let mut channel = Self {
            kind,
            label,
            dims: kind.dims(),
            per_primitive: kind.per_primitive(),
            data,
            range: None,
        };
        channel.refresh_range();
        channel
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Label attached to `Values` channels (e.g. `"pressure"`).
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn per_primitive(&self) -> bool {
        self.per_primitive
    }

    pub fn data(&self) -> &ChannelData {
        &self.data
    }

    /// Number of logical elements (components / dims).
    pub fn element_count(&self) -> usize {
        self.data.len() / self.dims
    }

    /// Cached min/max over float components, when populated.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.range
    }

    fn refresh_range(&mut self) {
        self.range = match &self.data {
            ChannelData::Float(data) if !data.is_empty() => {
                let mut min = f32::INFINITY;
                let mut max = f32::NEG_INFINITY;
                for value in data {
                    min = min.min(*value);
                    max = max.max(*value);
                }
                Some((min, max))
            }
            _ => None,
        };
    }
}

/// One logically independent block of channels.
///
/// A block is the unit of per-timestep caching: loaders call
/// [`GeometryStore::new_block`] per step so older data stays resident.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBlock {
    channels: Vec<Channel>,
}

impl GeometryBlock {
    /// Established per-vertex element count, from the first non-empty
    /// per-vertex channel.
    pub fn vertex_count(&self) -> Option<usize> {
        self.channels
            .iter()
            .find(|channel| !channel.per_primitive() && !channel.data.is_empty())
            .map(Channel::element_count)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, kind: ChannelKind) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.kind == kind)
    }

    /// Looks up a labelled `Values` channel.
    pub fn values(&self, label: &str) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|channel| channel.kind == ChannelKind::Values && channel.label() == Some(label))
    }

    /// Axis-aligned bounds from the vertex channel, when 3-component
    /// positions are present.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let channel = self.channel(ChannelKind::Vertices)?;
        let ChannelData::Float(data) = &channel.data else {
            return None;
        };
        if data.is_empty() || channel.dims != 3 {
            return None;
        }
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for vertex in data.chunks_exact(3) {
            for axis in 0..3 {
                min[axis] = min[axis].min(vertex[axis]);
                max[axis] = max[axis].max(vertex[axis]);
            }
        }
        Some((min, max))
    }

    fn find_mut(&mut self, kind: ChannelKind, label: Option<&str>) -> Option<usize> {
        self.channels.iter().position(|channel| {
            channel.kind == kind && channel.label.as_deref() == label
        })
    }

    /// Validates an append without mutating anything.
    fn check_append(
        &self,
        kind: ChannelKind,
        label: Option<&str>,
        data: &ChannelData,
    ) -> GeometryResult<()> {
        if data.type_name() != kind.expected_data() {
            return Err(GeometryError::DataTypeMismatch {
                channel: kind,
                expected: kind.expected_data(),
                got: data.type_name(),
            });
        }

        let dims = kind.dims();
        if data.len() % dims != 0 {
            return Err(GeometryError::InvalidStride {
                channel: kind,
                dims,
                len: data.len(),
            });
        }

        if kind.per_primitive() {
            return Ok(());
        }

        // Resulting count must agree with every other populated per-vertex
        // channel of this block.
        let existing = self
            .channels
            .iter()
            .find(|channel| channel.kind == kind && channel.label.as_deref() == label)
            .map_or(0, |channel| channel.data.len());
        let resulting = (existing + data.len()) / dims;

        for channel in &self.channels {
            if channel.per_primitive() || channel.data.is_empty() {
                continue;
            }
            if channel.kind == kind && channel.label.as_deref() == label {
                continue;
            }
            let established = channel.element_count();
            if resulting != established {
                return Err(GeometryError::CardinalityMismatch {
                    channel: kind,
                    expected: established,
                    got: resulting,
                });
            }
        }

        Ok(())
    }

    fn append(
        &mut self,
        kind: ChannelKind,
        label: Option<&str>,
        data: ChannelData,
    ) -> GeometryResult<usize> {
        self.check_append(kind, label, &data)?;

        let appended = data.len() / kind.dims();
        match self.find_mut(kind, label) {
            Some(index) => {
                let channel = &mut self.channels[index];
                channel.data.extend(data);
                channel.refresh_range();
            }
            None => {
                self.channels
                    .push(Channel::new(kind, label.map(str::to_string), data));
            }
        }
        Ok(appended)
    }

    /// Collapses uniform colour/value channels to one per-primitive element.
    fn compact(&mut self) -> usize {
        let mut collapsed = 0;
        for channel in &mut self.channels {
            if channel.per_primitive() || channel.element_count() < 2 {
                continue;
            }
            let uniform = match (&channel.kind, &channel.data) {
                (ChannelKind::Colours, ChannelData::UInt(data)) => {
                    data.windows(2).all(|pair| pair[0] == pair[1])
                }
                (ChannelKind::Values, ChannelData::Float(data)) => {
                    data.windows(2).all(|pair| pair[0] == pair[1])
                }
                _ => false,
            };
            if uniform {
                match &mut channel.data {
                    ChannelData::Float(data) => data.truncate(1),
                    ChannelData::UInt(data) => data.truncate(1),
                    ChannelData::Text(data) => data.truncate(1),
                }
                channel.per_primitive = true;
                channel.refresh_range();
                collapsed += 1;
            }
        }
        collapsed
    }
}

/// Appendable block sequence for one object and one primitive kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryStore {
    blocks: Vec<GeometryBlock>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the active (most recent) block, creating the first block
    /// on demand. Fails atomically: a rejected append leaves every channel
    /// untouched.
    pub fn append(&mut self, kind: ChannelKind, data: ChannelData) -> GeometryResult<usize> {
        self.append_channel(kind, None, data)
    }

    /// Appends a labelled per-vertex scalar channel (`Values`).
    pub fn append_values(&mut self, label: &str, data: Vec<f32>) -> GeometryResult<usize> {
        self.append_channel(ChannelKind::Values, Some(label), ChannelData::Float(data))
    }

    fn append_channel(
        &mut self,
        kind: ChannelKind,
        label: Option<&str>,
        data: ChannelData,
    ) -> GeometryResult<usize> {
        if self.blocks.is_empty() {
            self.blocks.push(GeometryBlock::default());
        }
        let active = self.blocks.len() - 1;
        self.blocks[active].append(kind, label, data)
    }

    /// Bulk replace: discards every block and restarts with `data` as the
    /// only channel of a fresh block. On failure the existing blocks are
    /// kept untouched.
    pub fn replace(&mut self, kind: ChannelKind, data: ChannelData) -> GeometryResult<usize> {
        let mut fresh = GeometryStore::new();
        let appended = fresh.append(kind, data)?;
        *self = fresh;
        Ok(appended)
    }

    /// Closes the active block; subsequent appends start a fresh block.
    /// Prior blocks are retained for timestep caching.
    pub fn new_block(&mut self) {
        if self.blocks.last().is_some_and(|block| block.channels.is_empty()) {
            return;
        }
        self.blocks.push(GeometryBlock::default());
    }

    /// Discards all blocks. Irreversible.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| block.channels.is_empty())
    }

    /// Read-only block view; valid until the next mutating call.
    pub fn block(&self, index: usize) -> GeometryResult<&GeometryBlock> {
        self.blocks.get(index).ok_or(GeometryError::NoSuchBlock {
            index,
            count: self.blocks.len(),
        })
    }

    pub fn blocks(&self) -> &[GeometryBlock] {
        &self.blocks
    }

    /// Total per-vertex elements across all blocks.
    pub fn total_elements(&self) -> usize {
        self.blocks
            .iter()
            .filter_map(GeometryBlock::vertex_count)
            .sum()
    }

    /// Union bounds over all blocks with vertex positions.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut union: Option<([f32; 3], [f32; 3])> = None;
        for block in &self.blocks {
            let Some((min, max)) = block.bounds() else {
                continue;
            };
            union = Some(match union {
                None => (min, max),
                Some((mut umin, mut umax)) => {
                    for axis in 0..3 {
                        umin[axis] = umin[axis].min(min[axis]);
                        umax[axis] = umax[axis].max(max[axis]);
                    }
                    (umin, umax)
                }
            });
        }
        union
    }

    /// Dedup/compression pass: collapses uniform colour/value channels and
    /// trims excess capacity. Returns the number of collapsed channels.
    pub fn compact(&mut self) -> usize {
        let mut collapsed = 0;
        for block in &mut self.blocks {
            collapsed += block.compact();
            block.channels.shrink_to_fit();
        }
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelData, ChannelKind, GeometryError, GeometryStore};

    fn triangle_vertices() -> Vec<f32> {
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
    }

    #[test]
    fn append_establishes_and_extends_the_active_block() {
        let mut store = GeometryStore::new();
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("first vertex append");
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("second vertex append extends the same block");

        assert_eq!(store.block_count(), 1);
        let block = store.block(0).expect("block 0");
        assert_eq!(block.vertex_count(), Some(6));
    }

    #[test]
    fn mismatched_channel_append_fails_without_mutation() {
        let mut store = GeometryStore::new();
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("vertex append");

        let err = store
            .append(ChannelKind::Colours, ChannelData::UInt(vec![0xff0000ff, 0xff00ff00]))
            .expect_err("two colours against three vertices must fail");
        assert_eq!(
            err,
            GeometryError::CardinalityMismatch {
                channel: ChannelKind::Colours,
                expected: 3,
                got: 2,
            }
        );

        // Atomicity: no colour channel was created by the failed append.
        let block = store.block(0).expect("block 0");
        assert!(block.channel(ChannelKind::Colours).is_none());
        assert_eq!(block.vertex_count(), Some(3));
    }

    #[test]
    fn wrong_payload_type_is_rejected() {
        let mut store = GeometryStore::new();
        let err = store
            .append(ChannelKind::Vertices, ChannelData::UInt(vec![1, 2, 3]))
            .expect_err("vertices take float data");
        assert!(matches!(err, GeometryError::DataTypeMismatch { .. }));
    }

    #[test]
    fn partial_stride_is_rejected() {
        let mut store = GeometryStore::new();
        let err = store
            .append(ChannelKind::Vertices, ChannelData::Float(vec![1.0, 2.0]))
            .expect_err("two components are not a whole vertex");
        assert!(matches!(err, GeometryError::InvalidStride { .. }));
    }

    #[test]
    fn new_block_isolates_cardinality_and_keeps_history() {
        let mut store = GeometryStore::new();
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("step one vertices");
        store.new_block();
        store
            .append(
                ChannelKind::Vertices,
                ChannelData::Float(vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0]),
            )
            .expect("step two vertices, different count");

        assert_eq!(store.block_count(), 2);
        assert_eq!(store.block(0).expect("block 0").vertex_count(), Some(3));
        assert_eq!(store.block(1).expect("block 1").vertex_count(), Some(2));
        assert_eq!(store.total_elements(), 5);
    }

    #[test]
    fn replace_swaps_all_blocks_or_none() {
        let mut store = GeometryStore::new();
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("original data");
        store.new_block();
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("second block");

        // Invalid payload leaves the two original blocks alone.
        let err = store
            .replace(ChannelKind::Vertices, ChannelData::Float(vec![1.0]))
            .expect_err("partial vertex");
        assert!(matches!(err, GeometryError::InvalidStride { .. }));
        assert_eq!(store.block_count(), 2);

        let appended = store
            .replace(
                ChannelKind::Vertices,
                ChannelData::Float(vec![5.0, 5.0, 5.0]),
            )
            .expect("bulk replace");
        assert_eq!(appended, 1);
        assert_eq!(store.block_count(), 1);
        assert_eq!(store.total_elements(), 1);
    }

    #[test]
    fn repeated_new_block_does_not_stack_empty_blocks() {
        let mut store = GeometryStore::new();
        store.new_block();
        store.new_block();
        assert!(store.block_count() <= 1);
        assert!(store.is_empty());
    }

    #[test]
    fn indices_are_per_primitive_and_skip_vertex_agreement() {
        let mut store = GeometryStore::new();
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("vertices");
        store
            .append(ChannelKind::Indices, ChannelData::UInt(vec![0, 1, 2, 0]))
            .expect("index count is independent of vertex count");
    }

    #[test]
    fn labelled_values_round_trip_with_range_cache() {
        let mut store = GeometryStore::new();
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("vertices");
        store
            .append_values("pressure", vec![0.5, 2.5, 1.0])
            .expect("labelled values");

        let block = store.block(0).expect("block 0");
        let channel = block.values("pressure").expect("pressure channel");
        assert_eq!(channel.range(), Some((0.5, 2.5)));
    }

    #[test]
    fn compact_collapses_uniform_colours() {
        let mut store = GeometryStore::new();
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("vertices");
        store
            .append(
                ChannelKind::Colours,
                ChannelData::UInt(vec![0xff0000ff, 0xff0000ff, 0xff0000ff]),
            )
            .expect("uniform colours");

        assert_eq!(store.compact(), 1);
        let channel = store
            .block(0)
            .expect("block 0")
            .channel(ChannelKind::Colours)
            .expect("colour channel");
        assert_eq!(channel.element_count(), 1);
        assert!(channel.per_primitive());
    }

    #[test]
    fn bounds_union_spans_all_blocks() {
        let mut store = GeometryStore::new();
        store
            .append(ChannelKind::Vertices, ChannelData::Float(triangle_vertices()))
            .expect("block one");
        store.new_block();
        store
            .append(
                ChannelKind::Vertices,
                ChannelData::Float(vec![-1.0, -2.0, -3.0, 2.0, 3.0, 4.0]),
            )
            .expect("block two");

        let (min, max) = store.bounds().expect("bounds");
        assert_eq!(min, [-1.0, -2.0, -3.0]);
        assert_eq!(max, [2.0, 3.0, 4.0]);
    }
}
