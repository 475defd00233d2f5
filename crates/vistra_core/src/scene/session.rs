//! Top-level scene context.
//!
//! # Responsibility
//! - Own every model, view, object, colour map and figure, plus the global
//!   property tier and the current selection.
//! - Be the sole deallocation authority for the scene graph.
//!
//! # Invariants
//! - No ambient statics: independent sessions coexist (one per embedding
//!   caller or test).
//! - There is always at least one model and one view.
//! - Object storage lives in the registry; models hold membership only.

use crate::model::object::{DrawingObject, ObjectId, ObjectRegistry};
use crate::model::property::PropertyStore;
use crate::model::value::PropertyValue;
use crate::report::MessageLog;
use crate::scene::colourmap::{ColourMap, ColourMapId};
use crate::scene::figure::Figure;
use crate::scene::model::{Model, StepError, StepOutcome};
use crate::scene::view::{Bounds, View};
use log::info;

const DEFAULT_NAME: &str = "default";

/// The owned scene-state context every component operates on.
pub struct Session {
    /// Global defaults: third tier of the property resolution chain.
    pub globals: PropertyStore,
    pub objects: ObjectRegistry,
    /// Collected messages from all components, for post-batch inspection.
    pub messages: MessageLog,
    models: Vec<Model>,
    views: Vec<View>,
    colourmaps: Vec<ColourMap>,
    figures: Vec<Figure>,
    active_model: usize,
    active_view: usize,
    selected: Option<ObjectId>,
    next_colourmap_id: u32,
}

impl Session {
    /// Creates a session with one default model and one default view.
    pub fn new() -> Self {
        Self {
            globals: PropertyStore::new(),
            objects: ObjectRegistry::new(),
            messages: MessageLog::new(),
            models: vec![Model::new(DEFAULT_NAME)],
            views: vec![View::new(DEFAULT_NAME)],
            colourmaps: Vec::new(),
            figures: Vec::new(),
            active_model: 0,
            active_view: 0,
            selected: None,
            next_colourmap_id: 1,
        }
    }

    // --- models -----------------------------------------------------------

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// The active model.
    pub fn model(&self) -> &Model {
        &self.models[self.active_model]
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.models[self.active_model]
    }

    pub fn model_at_mut(&mut self, index: usize) -> Option<&mut Model> {
        self.models.get_mut(index)
    }

    pub fn active_model_index(&self) -> usize {
        self.active_model
    }

    /// Adds a model and returns its index.
    pub fn add_model(&mut self, name: impl Into<String>) -> usize {
        self.models.push(Model::new(name));
        self.models.len() - 1
    }

    pub fn select_model(&mut self, index: usize) -> bool {
        if index < self.models.len() {
            self.active_model = index;
            true
        } else {
            false
        }
    }

    /// Model index by exact name, then by 1-based position.
    pub fn find_model(&self, token: &str) -> Option<usize> {
        if let Some(index) = self.models.iter().position(|model| model.name() == token) {
            return Some(index);
        }
        let position: usize = token.parse().ok()?;
        (1..=self.models.len()).contains(&position).then(|| position - 1)
    }

    // --- views ------------------------------------------------------------

    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// The active view.
    pub fn view(&self) -> &View {
        &self.views[self.active_view]
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.views[self.active_view]
    }

    pub fn view_at_mut(&mut self, index: usize) -> Option<&mut View> {
        self.views.get_mut(index)
    }

    pub fn active_view_index(&self) -> usize {
        self.active_view
    }

    /// Adds a view and returns its index.
    pub fn add_view(&mut self, name: impl Into<String>) -> usize {
        self.views.push(View::new(name));
        self.views.len() - 1
    }

    pub fn select_view(&mut self, index: usize) -> bool {
        if index < self.views.len() {
            self.active_view = index;
            true
        } else {
            false
        }
    }

    /// View index by exact name, then by 1-based position.
    pub fn find_view(&self, token: &str) -> Option<usize> {
        if let Some(index) = self.views.iter().position(|view| view.name() == token) {
            return Some(index);
        }
        let position: usize = token.parse().ok()?;
        (1..=self.views.len()).contains(&position).then(|| position - 1)
    }

    // --- objects ----------------------------------------------------------

    /// Creates an object, registers it with the active model and selects it.
    pub fn create_object(&mut self, name: impl Into<String>) -> ObjectId {
        let id = self.objects.create(name);
        self.models[self.active_model].add_object(id);
        self.selected = Some(id);
        info!("event=object_create module=scene status=ok id={id}");
        id
    }

    /// Removes an object from the registry and every model's membership.
    pub fn delete_object(&mut self, id: ObjectId) -> Option<DrawingObject> {
        for model in &mut self.models {
            model.remove_object(id);
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        let removed = self.objects.remove(id);
        if removed.is_some() {
            info!("event=object_delete module=scene status=ok id={id}");
        }
        removed
    }

    pub fn selected_object(&self) -> Option<ObjectId> {
        self.selected
    }

    pub fn select_object(&mut self, id: Option<ObjectId>) {
        self.selected = id;
    }

    /// Resolves one property for an object through the full chain:
    /// object-local, then the owning model's defaults, then globals.
    pub fn resolved<'a>(&'a self, id: ObjectId, key: &str) -> Option<&'a PropertyValue> {
        let object = self.objects.get(id)?;
        let owner = self
            .models
            .iter()
            .find(|model| model.contains_object(id))
            .unwrap_or(&self.models[self.active_model]);
        object
            .properties
            .get_resolved(key, Some(&owner.defaults), Some(&self.globals))
    }

    /// Clears geometry from every object; with `objects` set, also removes
    /// the objects themselves. Explicit and irreversible.
    pub fn clear(&mut self, objects: bool) {
        if objects {
            self.objects.clear();
            for model in &mut self.models {
                model.clear_objects();
            }
            self.selected = None;
        } else {
            for object in self.objects.iter_mut() {
                object.clear_geometry(None);
            }
            for model in &mut self.models {
                model.invalidate_cache();
            }
        }
        info!("event=scene_clear module=scene status=ok objects={objects}");
    }

    // --- timesteps --------------------------------------------------------

    /// Known timesteps of the active model.
    pub fn timesteps(&self) -> &[i32] {
        self.model().timesteps()
    }

    /// Loads a timestep on the active model.
    pub fn load_step(&mut self, step: i32, force: bool) -> Result<StepOutcome, StepError> {
        let model = &mut self.models[self.active_model];
        model.load_step(step, force, &mut self.objects)
    }

    /// Relative step on the active model; clamps at boundaries.
    pub fn try_step(&mut self, delta: i32) -> Result<StepOutcome, StepError> {
        let model = &mut self.models[self.active_model];
        model.try_step(delta, &mut self.objects)
    }

    // --- colour maps ------------------------------------------------------

    pub fn colourmaps(&self) -> &[ColourMap] {
        &self.colourmaps
    }

    /// Defines or redefines a colour map by name; redefinition keeps the id.
    pub fn define_colourmap(&mut self, name: &str, colours: Vec<String>) -> ColourMapId {
        if let Some(existing) = self
            .colourmaps
            .iter_mut()
            .find(|map| map.name() == name)
        {
            existing.set_colours(colours);
            return existing.id();
        }
        let id = ColourMapId(self.next_colourmap_id);
        self.next_colourmap_id += 1;
        self.colourmaps.push(ColourMap::new(id, name, colours));
        id
    }

    /// Inserts a colour map under a caller-provided id (state load).
    pub(crate) fn insert_colourmap_with_id(
        &mut self,
        id: ColourMapId,
        name: &str,
        colours: Vec<String>,
    ) {
        self.next_colourmap_id = self.next_colourmap_id.max(id.0 + 1);
        self.colourmaps.push(ColourMap::new(id, name, colours));
    }

    pub fn find_colourmap(&self, name: &str) -> Option<&ColourMap> {
        self.colourmaps.iter().find(|map| map.name() == name)
    }

    // --- figures ----------------------------------------------------------

    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }

    pub fn figure_names(&self) -> Vec<&str> {
        self.figures.iter().map(Figure::name).collect()
    }

    /// Snapshots the active view + global properties under `name`,
    /// replacing an existing figure of the same name.
    pub fn save_figure(&mut self, name: &str) {
        let snapshot = Figure::new(
            name,
            self.views[self.active_view].properties.clone(),
            self.globals.clone(),
        );
        if let Some(existing) = self
            .figures
            .iter_mut()
            .find(|figure| figure.name() == name)
        {
            *existing = snapshot;
        } else {
            self.figures.push(snapshot);
        }
    }

    /// Restores a figure onto the active view and globals. Returns `false`
    /// when no figure has that name. Never touches object geometry.
    pub fn restore_figure(&mut self, name: &str) -> bool {
        let Some(figure) = self
            .figures
            .iter()
            .find(|figure| figure.name() == name)
            .cloned()
        else {
            return false;
        };
        self.views[self.active_view].properties = figure.view_properties;
        self.globals = figure.global_properties;
        true
    }

    pub(crate) fn insert_figure(&mut self, figure: Figure) {
        if let Some(existing) = self
            .figures
            .iter_mut()
            .find(|candidate| candidate.name() == figure.name())
        {
            *existing = figure;
        } else {
            self.figures.push(figure);
        }
    }

    // --- view fitting -----------------------------------------------------

    /// Caller-requested fit of the active view around the active model's
    /// currently active objects. No-op when no geometry carries positions.
    pub fn fit_view_to_active(&mut self) -> Option<Bounds> {
        let mut union: Option<Bounds> = None;
        for id in self.models[self.active_model].active_objects() {
            let Some(object) = self.objects.get(*id) else {
                continue;
            };
            let Some((min, max)) = object.bounds() else {
                continue;
            };
            let bounds = Bounds::new(min, max);
            union = Some(match union {
                None => bounds,
                Some(current) => current.union(&bounds),
            });
        }
        if let Some(bounds) = union {
            self.views[self.active_view].fit_bounds(bounds);
        }
        union
    }

    // --- state load support ----------------------------------------------

    /// Empties the whole graph for a replace-mode state load.
    pub(crate) fn reset_graph(&mut self) {
        self.globals.clear();
        self.objects.clear();
        self.models.clear();
        self.views.clear();
        self.colourmaps.clear();
        self.figures.clear();
        self.active_model = 0;
        self.active_view = 0;
        self.selected = None;
        self.next_colourmap_id = 1;
    }

    /// Restores the one-model/one-view floor after a load.
    pub(crate) fn ensure_defaults(&mut self) {
        if self.models.is_empty() {
            self.models.push(Model::new(DEFAULT_NAME));
        }
        if self.views.is_empty() {
            self.views.push(View::new(DEFAULT_NAME));
        }
        self.active_model = self.active_model.min(self.models.len() - 1);
        self.active_view = self.active_view.min(self.views.len() - 1);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
