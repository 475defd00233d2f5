//! Scene graph: models, views, figures, colour maps and the owning session.
//!
//! # Responsibility
//! - Tie the data model into the timestep-indexed scene the renderer reads.
//! - Keep ownership explicit: the session owns everything, models own
//!   membership lists only.

pub mod colourmap;
pub mod figure;
pub mod model;
pub mod session;
pub mod view;
