//! State document serialization.
//!
//! # Responsibility
//! - Convert the live graph (globals, views, models, objects, colour maps,
//!   figures) to and from a JSON document.
//! - Support merge-on-load alongside full replacement.
//!
//! # Invariants
//! - `load(dump())` reproduces ids, names and resolved property values.
//! - Dumping twice without mutation yields byte-identical documents.
//! - Invalid entries/keys are skipped with a reported `SchemaError`; the
//!   rest of the document still applies.
//! - Raw geometry arrays are exported only on explicit request.

use crate::model::geometry::{ChannelData, ChannelKind, GeometryKind};
use crate::model::object::ObjectId;
use crate::model::property::PropertyStore;
use crate::report::{EngineError, EngineResult};
use crate::scene::colourmap::ColourMapId;
use crate::scene::figure::Figure;
use crate::scene::session::Session;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// How `load` treats entities already present in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Update matching entities by id/name, add new ones, leave the rest.
    Merge,
    /// Clear the whole graph and rebuild it from the document.
    Replace,
}

/// Dump configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    /// Embed raw geometry arrays per object (full export).
    pub geometry: bool,
}

/// Top-level persisted document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub options: JsonMap,
    #[serde(default)]
    pub views: Vec<ViewDocument>,
    #[serde(default)]
    pub models: Vec<ModelDocument>,
    #[serde(default)]
    pub colourmaps: Vec<ColourMapDocument>,
    #[serde(default)]
    pub figures: Vec<FigureDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: JsonMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timesteps: Vec<i32>,
    #[serde(default)]
    pub defaults: JsonMap,
    #[serde(default)]
    pub objects: Vec<ObjectDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectDocument {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: JsonMap,
    /// Coarse per-kind metadata; never raw arrays.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub geometry: BTreeMap<String, GeometrySummary>,
    /// Raw channel data, present only for explicit full exports.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Vec<BlockDocument>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometrySummary {
    pub blocks: usize,
    pub elements: usize,
}

/// Raw channels of one geometry block (full export only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vertices: Vec<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normals: Vec<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texcoords: Vec<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colours: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Vec<f32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColourMapDocument {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub colours: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FigureDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub view: JsonMap,
    #[serde(default)]
    pub options: JsonMap,
}

/// Serializes the whole graph. Geometry payloads are summarized unless the
/// caller requests a full export.
pub fn dump(session: &Session, options: DumpOptions) -> StateDocument {
    let views = session
        .views()
        .iter()
        .map(|view| ViewDocument {
            name: view.name().to_string(),
            properties: view.properties.to_document(),
        })
        .collect();

    let models = session
        .models()
        .iter()
        .map(|model| ModelDocument {
            name: model.name().to_string(),
            timesteps: model.timesteps().to_vec(),
            defaults: model.defaults.to_document(),
            objects: model
                .objects()
                .iter()
                .filter_map(|id| session.objects.get(*id))
                .map(|object| dump_object(object, options))
                .collect(),
        })
        .collect();

    let colourmaps = session
        .colourmaps()
        .iter()
        .map(|map| ColourMapDocument {
            id: map.id().0,
            name: map.name().to_string(),
            colours: map.colours().to_vec(),
        })
        .collect();

    let figures = session
        .figures()
        .iter()
        .map(|figure| FigureDocument {
            name: figure.name().to_string(),
            view: figure.view_properties.to_document(),
            options: figure.global_properties.to_document(),
        })
        .collect();

    StateDocument {
        options: session.globals.to_document(),
        views,
        models,
        colourmaps,
        figures,
    }
}

fn dump_object(
    object: &crate::model::object::DrawingObject,
    options: DumpOptions,
) -> ObjectDocument {
    let geometry = object
        .geometry_counts()
        .iter()
        .map(|(kind, blocks)| {
            let elements = object
                .geometry(*kind)
                .map_or(0, |store| store.total_elements());
            (
                kind.as_str().to_string(),
                GeometrySummary {
                    blocks: *blocks,
                    elements,
                },
            )
        })
        .collect();

    let data = if options.geometry {
        dump_geometry_data(object)
    } else {
        BTreeMap::new()
    };

    ObjectDocument {
        id: object.id().0,
        name: object.name().to_string(),
        properties: object.properties.to_document(),
        geometry,
        data,
    }
}

fn dump_geometry_data(
    object: &crate::model::object::DrawingObject,
) -> BTreeMap<String, Vec<BlockDocument>> {
    let mut data = BTreeMap::new();
    for kind in GeometryKind::ALL {
        let Some(store) = object.geometry(*kind) else {
            continue;
        };
        if store.is_empty() {
            continue;
        }
        let blocks = store
            .blocks()
            .iter()
            .map(|block| {
                let mut document = BlockDocument::default();
                for channel in block.channels() {
                    match (channel.kind(), channel.data()) {
                        (ChannelKind::Vertices, ChannelData::Float(values)) => {
                            document.vertices = values.clone();
                        }
                        (ChannelKind::Normals, ChannelData::Float(values)) => {
                            document.normals = values.clone();
                        }
                        (ChannelKind::TexCoords, ChannelData::Float(values)) => {
                            document.texcoords = values.clone();
                        }
                        (ChannelKind::Colours, ChannelData::UInt(values)) => {
                            document.colours = values.clone();
                        }
                        (ChannelKind::Indices, ChannelData::UInt(values)) => {
                            document.indices = values.clone();
                        }
                        (ChannelKind::Values, ChannelData::Float(values)) => {
                            let label = channel.label().unwrap_or("values").to_string();
                            document.values.insert(label, values.clone());
                        }
                        (ChannelKind::Labels, ChannelData::Text(values)) => {
                            document.labels = values.clone();
                        }
                        _ => {}
                    }
                }
                document
            })
            .collect();
        data.insert(kind.as_str().to_string(), blocks);
    }
    data
}

/// Serializes the graph to deterministic, pretty-printed JSON.
///
/// Property maps are key-sorted and struct fields have a fixed order, so
/// repeated dumps of an unchanged graph are byte-identical.
pub fn dump_string(session: &Session) -> String {
    serde_json::to_string_pretty(&dump(session, DumpOptions::default())).unwrap_or_default()
}

/// Parses and applies a state document from text.
///
/// A structurally unreadable document is an error and nothing is applied;
/// invalid individual entries are skipped and reported. Returns the number
/// of skipped entries/keys.
pub fn load_string(session: &mut Session, text: &str, mode: LoadMode) -> EngineResult<usize> {
    let document: StateDocument =
        serde_json::from_str(text).map_err(|err| EngineError::Schema {
            entry: "document".to_string(),
            message: err.to_string(),
        })?;
    Ok(load(session, &document, mode))
}

/// Applies a parsed state document.
pub fn load(session: &mut Session, document: &StateDocument, mode: LoadMode) -> usize {
    if mode == LoadMode::Replace {
        session.reset_graph();
    }

    let mut skipped = session.globals.merge_document(&document.options);

    for view_doc in &document.views {
        if view_doc.name.trim().is_empty() {
            skip(session, "view", "missing name", &mut skipped);
            continue;
        }
        let index = session
            .views()
            .iter()
            .position(|view| view.name() == view_doc.name)
            .unwrap_or_else(|| session.add_view(view_doc.name.clone()));
        if let Some(view) = session.view_at_mut(index) {
            skipped += view.properties.merge_document(&view_doc.properties);
        }
    }

    for model_doc in &document.models {
        if model_doc.name.trim().is_empty() {
            skip(session, "model", "missing name", &mut skipped);
            continue;
        }
        let index = session
            .models()
            .iter()
            .position(|model| model.name() == model_doc.name)
            .unwrap_or_else(|| session.add_model(model_doc.name.clone()));

        if let Some(model) = session.model_at_mut(index) {
            skipped += model.defaults.merge_document(&model_doc.defaults);
            if !model_doc.timesteps.is_empty() {
                model.set_timesteps(model_doc.timesteps.clone());
            }
        }

        for object_doc in &model_doc.objects {
            skipped += load_object(session, index, object_doc);
        }
    }

    for map_doc in &document.colourmaps {
        if map_doc.name.trim().is_empty() {
            skip(session, "colourmap", "missing name", &mut skipped);
            continue;
        }
        if session.find_colourmap(&map_doc.name).is_some() {
            session.define_colourmap(&map_doc.name, map_doc.colours.clone());
        } else if map_doc.id > 0
            && !session
                .colourmaps()
                .iter()
                .any(|map| map.id() == ColourMapId(map_doc.id))
        {
            session.insert_colourmap_with_id(
                ColourMapId(map_doc.id),
                &map_doc.name,
                map_doc.colours.clone(),
            );
        } else {
            session.define_colourmap(&map_doc.name, map_doc.colours.clone());
        }
    }

    for figure_doc in &document.figures {
        if figure_doc.name.trim().is_empty() {
            skip(session, "figure", "missing name", &mut skipped);
            continue;
        }
        let (view_properties, view_skipped) = PropertyStore::from_document(&figure_doc.view);
        let (global_properties, option_skipped) =
            PropertyStore::from_document(&figure_doc.options);
        skipped += view_skipped + option_skipped;
        session.insert_figure(Figure::new(
            figure_doc.name.clone(),
            view_properties,
            global_properties,
        ));
    }

    session.ensure_defaults();
    info!(
        "event=state_load module=state status=ok mode={mode:?} skipped={skipped}"
    );
    skipped
}

/// Applies one object entry under the model at `model_index`.
///
/// Match precedence mirrors command lookup: id first (the document's id is
/// authoritative), then exact name; unmatched entries are created. Entries
/// with neither id nor name do not resolve and are skipped.
fn load_object(
    session: &mut Session,
    model_index: usize,
    object_doc: &ObjectDocument,
) -> usize {
    if object_doc.id == 0 && object_doc.name.trim().is_empty() {
        let mut skipped = 0;
        skip(session, "object", "missing id and name", &mut skipped);
        return skipped;
    }

    let mut skipped = 0;
    let existing = if object_doc.id > 0 {
        session
            .objects
            .get(ObjectId(object_doc.id))
            .map(|object| object.id())
    } else {
        None
    };
    let existing = existing.or_else(|| {
        session
            .objects
            .find_by_name(&object_doc.name)
            .map(|object| object.id())
    });

    let id = match existing {
        Some(id) => {
            if let Some(object) = session.objects.get_mut(id) {
                if !object_doc.name.trim().is_empty() {
                    object.rename(object_doc.name.clone());
                }
                skipped += object.properties.merge_document(&object_doc.properties);
            }
            id
        }
        None => {
            let created = if object_doc.id > 0 {
                session
                    .objects
                    .insert_with_id(ObjectId(object_doc.id), object_doc.name.clone())
            } else {
                Ok(session.objects.create(object_doc.name.clone()))
            };
            let id = match created {
                Ok(id) => id,
                Err(err) => {
                    skip(session, &object_doc.name, &err.to_string(), &mut skipped);
                    return skipped;
                }
            };
            if let Some(object) = session.objects.get_mut(id) {
                skipped += object.properties.merge_document(&object_doc.properties);
            }
            id
        }
    };

    if let Some(model) = session.model_at_mut(model_index) {
        model.add_object(id);
    }
    skipped
}

fn skip(session: &mut Session, entry: &str, message: &str, skipped: &mut usize) {
    session.messages.report_error(&EngineError::Schema {
        entry: entry.to_string(),
        message: message.to_string(),
    });
    *skipped += 1;
}

#[cfg(test)]
mod tests {
    use super::{dump, dump_string, load, load_string, DumpOptions, LoadMode};
    use crate::model::geometry::{ChannelData, ChannelKind, GeometryKind};
    use crate::scene::session::Session;

    fn populated_session() -> Session {
        let mut session = Session::new();
        session.globals.set("background", "black");
        let id = session.create_object("sphere");
        let object = session.objects.get_mut(id).expect("object");
        object.properties.set("colour", "red");
        object
            .geometry_mut(GeometryKind::Triangles)
            .append(
                ChannelKind::Vertices,
                ChannelData::Float(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            )
            .expect("vertices");
        session
    }

    #[test]
    fn dump_summarizes_geometry_by_default() {
        let session = populated_session();
        let document = dump(&session, DumpOptions::default());

        let object = &document.models[0].objects[0];
        let summary = object.geometry.get("triangles").expect("summary");
        assert_eq!(summary.blocks, 1);
        assert_eq!(summary.elements, 3);
        assert!(object.data.is_empty());
    }

    #[test]
    fn full_export_embeds_raw_arrays() {
        let session = populated_session();
        let document = dump(&session, DumpOptions { geometry: true });

        let object = &document.models[0].objects[0];
        let blocks = object.data.get("triangles").expect("raw blocks");
        assert_eq!(blocks[0].vertices.len(), 9);
    }

    #[test]
    fn double_dump_is_byte_identical() {
        let session = populated_session();
        assert_eq!(dump_string(&session), dump_string(&session));
    }

    #[test]
    fn merge_load_keeps_unmatched_entities() {
        let mut session = populated_session();
        let keeper = session.create_object("keeper");

        let incoming = r#"{
            "models": [{
                "name": "default",
                "objects": [
                    {"id": 1, "name": "sphere", "properties": {"opacity": 0.5}},
                    {"id": 9, "name": "added", "properties": {}}
                ]
            }]
        }"#;
        load_string(&mut session, incoming, LoadMode::Merge).expect("merge load");

        assert!(session.objects.get(keeper).is_some());
        assert!(session.objects.find_by_name("added").is_some());
        let sphere = session.objects.find_by_name("sphere").expect("sphere");
        assert_eq!(
            sphere.properties.get("opacity").and_then(|v| v.as_float()),
            Some(0.5)
        );
        // The pre-merge colour stays; merge never clears existing keys.
        assert_eq!(
            sphere.properties.get("colour").and_then(|v| v.as_str()),
            Some("red")
        );
    }

    #[test]
    fn replace_load_rebuilds_the_graph() {
        let mut session = populated_session();
        let document = dump(&session, DumpOptions::default());
        session.create_object("extra");

        load(&mut session, &document, LoadMode::Replace);
        assert!(session.objects.find_by_name("extra").is_none());
        assert!(session.objects.find_by_name("sphere").is_some());
    }

    #[test]
    fn invalid_entries_are_skipped_and_reported() {
        let mut session = Session::new();
        let incoming = r#"{
            "options": {"good": 1, "bad": null},
            "views": [{"name": "", "properties": {}}],
            "models": [{
                "name": "default",
                "objects": [{"id": 0, "name": "", "properties": {}}]
            }]
        }"#;
        let skipped = load_string(&mut session, incoming, LoadMode::Merge).expect("load");

        assert_eq!(skipped, 3);
        assert!(session.messages.len() >= 2);
        assert_eq!(
            session.globals.get("good").and_then(|v| v.as_int()),
            Some(1)
        );
    }

    #[test]
    fn structurally_broken_document_is_rejected_whole() {
        let mut session = populated_session();
        let err = load_string(&mut session, "{not json", LoadMode::Replace)
            .expect_err("broken document");
        assert!(err.to_string().contains("document"));
        // Nothing was applied: the graph is untouched.
        assert!(session.objects.find_by_name("sphere").is_some());
    }
}
