//! Timestep-indexed model container.
//!
//! # Responsibility
//! - Track which drawing objects are active at the current timestep.
//! - Drive the step state machine through the external data loader.
//!
//! # Invariants
//! - `load_step(T)` is idempotent: a resident, unforced step is a success
//!   no-op and the loader is not invoked.
//! - A failed load leaves the model at its previously loaded timestep.
//! - `try_step` clamps at sequence boundaries; it never wraps.

use crate::model::object::{ObjectId, ObjectRegistry};
use crate::model::property::PropertyStore;
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure reported by a [`StepLoader`] collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLoadError {
    message: String,
}

impl StepLoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for StepLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for StepLoadError {}

/// External data-reading collaborator.
///
/// Implementations populate geometry through the registry's objects
/// (`append` / `new_block`) and return the ids active at that step. They
/// never touch command or serializer state.
pub trait StepLoader {
    fn load_step(
        &mut self,
        step: i32,
        objects: &mut ObjectRegistry,
    ) -> Result<Vec<ObjectId>, StepLoadError>;
}

/// Step machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Unloaded,
    Loading,
    Loaded(i32),
}

/// Outcome of a successful step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step was loaded (or restored from the resident cache).
    Loaded(i32),
    /// The requested step was already live; nothing happened.
    AlreadyResident(i32),
    /// A relative step hit a sequence boundary and was clamped onto the
    /// current step; nothing happened.
    Clamped(i32),
}

/// Errors from step transitions.
#[derive(Debug)]
pub enum StepError {
    /// Requested timestep is not in the model's sequence.
    UnknownStep(i32),
    /// The model has no timesteps at all.
    EmptySequence,
    /// The loader failed; the model stays at the prior timestep.
    Load { step: i32, source: StepLoadError },
}

impl Display for StepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStep(step) => write!(f, "timestep {step} is not in the sequence"),
            Self::EmptySequence => f.write_str("model has no timesteps"),
            Self::Load { step, source } => write!(f, "loading timestep {step} failed: {source}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// The timestep-indexed container of active drawing objects for a dataset.
pub struct Model {
    name: String,
    /// Second tier of the property resolution chain.
    pub defaults: PropertyStore,
    timesteps: Vec<i32>,
    state: StepState,
    /// Membership: every object associated with this model.
    objects: Vec<ObjectId>,
    /// Objects active at the current step.
    active: Vec<ObjectId>,
    /// Resident per-step active lists, reused when stepping back.
    resident: BTreeMap<i32, Vec<ObjectId>>,
    loader: Option<Box<dyn StepLoader>>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: PropertyStore::new(),
            timesteps: Vec::new(),
            state: StepState::Unloaded,
            objects: Vec::new(),
            active: Vec::new(),
            resident: BTreeMap::new(),
            loader: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    pub fn current_step(&self) -> Option<i32> {
        match self.state {
            StepState::Loaded(step) => Some(step),
            _ => None,
        }
    }

    /// Ordered timestep markers; not required contiguous.
    pub fn timesteps(&self) -> &[i32] {
        &self.timesteps
    }

    /// Inserts a timestep marker, keeping the sequence sorted and unique.
    pub fn add_timestep(&mut self, step: i32) {
        if let Err(index) = self.timesteps.binary_search(&step) {
            self.timesteps.insert(index, step);
        }
    }

    pub fn set_timesteps(&mut self, mut steps: Vec<i32>) {
        steps.sort_unstable();
        steps.dedup();
        self.timesteps = steps;
    }

    /// Associates an object with this model. Membership only; storage stays
    /// in the session registry.
    pub fn add_object(&mut self, id: ObjectId) {
        if !self.objects.contains(&id) {
            self.objects.push(id);
        }
    }

    pub fn remove_object(&mut self, id: ObjectId) {
        self.objects.retain(|member| *member != id);
        self.active.retain(|member| *member != id);
        for cached in self.resident.values_mut() {
            cached.retain(|member| *member != id);
        }
    }

    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.objects.contains(&id)
    }

    /// All objects associated with the model, in registration order.
    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    /// Objects active at the current step; full membership when no step has
    /// been loaded yet.
    pub fn active_objects(&self) -> &[ObjectId] {
        match self.state {
            StepState::Loaded(_) => &self.active,
            _ => &self.objects,
        }
    }

    pub fn set_loader(&mut self, loader: Box<dyn StepLoader>) {
        self.loader = Some(loader);
    }

    /// Drops the cached active lists so the next `load_step` re-invokes the
    /// loader even for previously resident steps.
    pub fn invalidate_cache(&mut self) {
        self.resident.clear();
    }

    /// Drops every object association while keeping timesteps, defaults and
    /// the loader. Used by explicit scene clears.
    pub fn clear_objects(&mut self) {
        self.objects.clear();
        self.active.clear();
        self.resident.clear();
    }

    /// Loads timestep `step`.
    ///
    /// Resident and unforced requests return immediately without invoking
    /// the loader. On loader failure the previous state (including the
    /// previously loaded step) is restored and the error is recoverable.
    pub fn load_step(
        &mut self,
        step: i32,
        force: bool,
        objects: &mut ObjectRegistry,
    ) -> Result<StepOutcome, StepError> {
        if !self.timesteps.contains(&step) {
            return Err(StepError::UnknownStep(step));
        }

        if !force {
            if self.state == StepState::Loaded(step) {
                return Ok(StepOutcome::AlreadyResident(step));
            }
            if let Some(cached) = self.resident.get(&step) {
                self.active = cached.clone();
                self.state = StepState::Loaded(step);
                info!(
                    "event=step_load module=scene status=cached model={} step={step}",
                    self.name
                );
                return Ok(StepOutcome::Loaded(step));
            }
        }

        let previous = self.state;
        self.state = StepState::Loading;

        let loaded = match self.loader.as_mut() {
            Some(loader) => loader.load_step(step, objects),
            // Without a loader the step transition is purely a membership
            // switch; every associated object stays active.
            None => Ok(self.objects.clone()),
        };

        match loaded {
            Ok(active) => {
                for id in &active {
                    if !self.objects.contains(id) {
                        self.objects.push(*id);
                    }
                }
                self.resident.insert(step, active.clone());
                self.active = active;
                self.state = StepState::Loaded(step);
                info!(
                    "event=step_load module=scene status=ok model={} step={step} active={}",
                    self.name,
                    self.active.len()
                );
                Ok(StepOutcome::Loaded(step))
            }
            Err(source) => {
                self.state = previous;
                warn!(
                    "event=step_load module=scene status=error model={} step={step} error={source}",
                    self.name
                );
                Err(StepError::Load { step, source })
            }
        }
    }

    /// Relative step: the navigation primitive behind `next`/`previous`.
    ///
    /// Clamps at the sequence boundaries instead of wrapping; a clamped
    /// request that lands on the current step is a no-op success.
    pub fn try_step(
        &mut self,
        delta: i32,
        objects: &mut ObjectRegistry,
    ) -> Result<StepOutcome, StepError> {
        if self.timesteps.is_empty() {
            return Err(StepError::EmptySequence);
        }

        let current_index = self
            .current_step()
            .and_then(|step| self.timesteps.iter().position(|candidate| *candidate == step));

        // Nothing loaded yet enters the sequence at its first step.
        let target_index = match current_index {
            Some(index) => {
                let last = self.timesteps.len() as i32 - 1;
                (index as i32 + delta).clamp(0, last) as usize
            }
            None => 0,
        };

        let target = self.timesteps[target_index];
        if Some(target) == self.current_step() {
            return Ok(StepOutcome::Clamped(target));
        }
        self.load_step(target, false, objects)
    }
}
