use vistra_core::{ChannelData, ChannelKind, GeometryError, GeometryKind, Session};

fn square_vertices() -> Vec<f32> {
    vec![
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0,
    ]
}

#[test]
fn incompatible_append_fails_atomically() {
    let mut session = Session::new();
    let id = session.create_object("quad");
    let store = session
        .objects
        .get_mut(id)
        .expect("object")
        .geometry_mut(GeometryKind::Quads);

    store
        .append(ChannelKind::Vertices, ChannelData::Float(square_vertices()))
        .expect("four vertices");
    store
        .append_values("height", vec![0.1, 0.2, 0.3, 0.4])
        .expect("matching values");

    // Three colours against four vertices: rejected without mutation.
    let err = store
        .append(
            ChannelKind::Colours,
            ChannelData::UInt(vec![0xff0000ff, 0xff00ff00, 0xffff0000]),
        )
        .expect_err("cardinality violation");
    assert!(matches!(err, GeometryError::CardinalityMismatch { .. }));

    let block = store.block(0).expect("block 0");
    assert!(block.channel(ChannelKind::Colours).is_none());
    assert_eq!(block.vertex_count(), Some(4));
    assert_eq!(
        block.values("height").expect("height channel").range(),
        Some((0.1, 0.4))
    );
}

#[test]
fn new_block_supports_per_timestep_caching_without_discarding_history() {
    let mut session = Session::new();
    let id = session.create_object("stream");
    let store = session
        .objects
        .get_mut(id)
        .expect("object")
        .geometry_mut(GeometryKind::Points);

    // Two chunks streamed into the first block.
    store
        .append(
            ChannelKind::Vertices,
            ChannelData::Float(vec![0.0, 0.0, 0.0]),
        )
        .expect("chunk one");
    store
        .append(
            ChannelKind::Vertices,
            ChannelData::Float(vec![1.0, 1.0, 1.0]),
        )
        .expect("chunk two");

    store.new_block();
    store
        .append(ChannelKind::Vertices, ChannelData::Float(square_vertices()))
        .expect("next timestep");

    assert_eq!(store.block_count(), 2);
    assert_eq!(store.block(0).expect("block 0").vertex_count(), Some(2));
    assert_eq!(store.block(1).expect("block 1").vertex_count(), Some(4));
}

#[test]
fn clear_discards_blocks_irreversibly() {
    let mut session = Session::new();
    let id = session.create_object("volatile");
    let object = session.objects.get_mut(id).expect("object");

    object
        .geometry_mut(GeometryKind::Lines)
        .append(
            ChannelKind::Vertices,
            ChannelData::Float(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
        )
        .expect("line vertices");
    assert_eq!(object.total_elements(), 2);

    object.clear_geometry(Some(GeometryKind::Lines));
    assert_eq!(object.total_elements(), 0);
    assert!(object.geometry(GeometryKind::Lines).is_none());
}

#[test]
fn block_views_expose_read_only_channel_data() {
    let mut session = Session::new();
    let id = session.create_object("labelled");
    let store = session
        .objects
        .get_mut(id)
        .expect("object")
        .geometry_mut(GeometryKind::Labels);

    store
        .append(
            ChannelKind::Vertices,
            ChannelData::Float(vec![0.5, 0.5, 0.5]),
        )
        .expect("anchor vertex");
    store
        .append(
            ChannelKind::Labels,
            ChannelData::Text(vec!["probe A".to_string()]),
        )
        .expect("label text");

    let block = store.block(0).expect("block 0");
    let labels = block.channel(ChannelKind::Labels).expect("label channel");
    match labels.data() {
        ChannelData::Text(entries) => assert_eq!(entries[0], "probe A"),
        other => panic!("expected text data, got {}", other.type_name()),
    }

    let err = store.block(5).expect_err("out-of-range block");
    assert!(matches!(err, GeometryError::NoSuchBlock { index: 5, .. }));
}
