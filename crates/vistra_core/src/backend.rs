//! Window-system and exporter capability interfaces.
//!
//! # Responsibility
//! - Model the rendering/window boundary as swappable traits so the scene
//!   engine never depends on a concrete windowing implementation.
//! - Define the one-way handoff for finalized frame buffers.
//!
//! # Invariants
//! - Backends receive events; they never mutate scene state directly.
//! - An exporter owns each buffer it is handed (copy-on-handoff); nothing
//!   aliases it afterwards.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mouse buttons reported by a window backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Input events forwarded from the window system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    MouseMove { x: i32, y: i32 },
    MousePress { button: MouseButton, down: bool, x: i32, y: i32 },
    MouseScroll { delta: f32 },
    Key { key: char, x: i32, y: i32 },
}

/// Capability interface for the window/interaction system.
///
/// The interactive shell and embedding hosts drive this; tests use
/// [`HeadlessBackend`].
pub trait WindowBackend {
    fn open(&mut self, width: u32, height: u32);
    fn resize(&mut self, width: u32, height: u32);
    /// Request a redraw of the current scene.
    fn display(&mut self);
    fn close(&mut self);
    /// Forwards one input event; returns whether the backend consumed it.
    fn input(&mut self, event: InputEvent) -> bool;
}

/// No-window backend for tests and batch/embedded operation.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    pub opened: bool,
    pub width: u32,
    pub height: u32,
    pub displays: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowBackend for HeadlessBackend {
    fn open(&mut self, width: u32, height: u32) {
        self.opened = true;
        self.width = width;
        self.height = height;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn display(&mut self) {
        self.displays += 1;
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn input(&mut self, _event: InputEvent) -> bool {
        false
    }
}

/// A finalized RGBA pixel buffer, owned by whoever holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Failure reported by a frame exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportError {
    message: String,
}

impl ExportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ExportError {}

/// Consumer of finalized frames (image/video writers).
///
/// `export` takes the buffer by value: once handed off, the exporter is the
/// sole owner and may encode it asynchronously without touching scene
/// state.
pub trait FrameExporter {
    fn export(&mut self, frame: FrameBuffer) -> Result<(), ExportError>;
}

/// Exporter that drops every frame; placeholder for headless runs.
#[derive(Debug, Default)]
pub struct DiscardExporter {
    pub frames: usize,
}

impl FrameExporter for DiscardExporter {
    fn export(&mut self, frame: FrameBuffer) -> Result<(), ExportError> {
        drop(frame);
        self.frames += 1;
        Ok(())
    }
}
