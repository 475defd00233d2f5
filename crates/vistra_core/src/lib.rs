//! Scene-state engine for interactive scientific-data visualization.
//! This crate is the single source of truth for scene graph invariants:
//! entity identity, property resolution, command dispatch, timestep
//! transitions and state (de)serialization. Rendering, window systems and
//! file readers are external collaborators behind the `backend` and
//! `StepLoader` interfaces.

pub mod backend;
pub mod command;
pub mod logging;
pub mod model;
pub mod report;
pub mod scene;
pub mod state;

pub use backend::{
    DiscardExporter, ExportError, FrameBuffer, FrameExporter, HeadlessBackend, InputEvent,
    MouseButton, WindowBackend,
};
pub use command::engine::CommandEngine;
pub use command::parser::{parse_line, Statement};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::geometry::{
    ChannelData, ChannelKind, GeometryError, GeometryKind, GeometryResult, GeometryStore,
};
pub use model::object::{DrawingObject, ObjectId, ObjectRegistry};
pub use model::property::PropertyStore;
pub use model::value::PropertyValue;
pub use report::{EngineError, EngineResult, Message, MessageLog, Severity};
pub use scene::colourmap::{ColourMap, ColourMapId};
pub use scene::figure::Figure;
pub use scene::model::{Model, StepError, StepLoadError, StepLoader, StepOutcome, StepState};
pub use scene::session::Session;
pub use scene::view::{Bounds, View};
pub use state::{dump, dump_string, load, load_string, DumpOptions, LoadMode, StateDocument};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
