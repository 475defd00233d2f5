//! Command dispatch, target resolution and replay machinery.
//!
//! # Responsibility
//! - Map parsed statements onto scene mutations through a fixed command
//!   table.
//! - Keep the three logs: applied-command history, raw line history, and
//!   the pending replay queue.
//!
//! # Invariants
//! - Script processing is fault-isolated per line; only fatal I/O aborts a
//!   batch, and applied state is never rolled back.
//! - The replay queue drains strictly FIFO and fully, before any live
//!   interactive command is accepted.
//! - A queued batch can be cleared wholesale before draining starts, never
//!   interrupted mid-command.

use crate::command::parser::{parse_line, Statement};
use crate::model::geometry::GeometryKind;
use crate::model::object::ObjectId;
use crate::model::value::PropertyValue;
use crate::report::{EngineError, EngineResult, Severity};
use crate::scene::colourmap::ColourMap;
use crate::scene::session::Session;
use crate::state::{self, LoadMode};
use log::debug;
use std::collections::VecDeque;

/// Fixed command table: keyword and help line.
const COMMANDS: &[(&str, &str)] = &[
    ("create", "create <name> [kind] : add a drawing object and select it"),
    ("delete", "delete [target] : remove an object from the scene"),
    (
        "clear",
        "clear [objects|<target>] : drop geometry; `objects` removes the objects too",
    ),
    ("select", "select [target] : set or clear the selected object"),
    ("name", "name [target] <new> : rename an object"),
    (
        "list",
        "list objects|views|steps|figures|colourmaps : print a listing",
    ),
    ("model", "model <name|index> : switch the active model"),
    ("view", "view <name|index> : switch the active view"),
    (
        "step",
        "step <timestep> [force] : load a timestep on the active model",
    ),
    ("next", "next : advance one timestep, clamped at the end"),
    ("previous", "previous : go back one timestep, clamped at the start"),
    (
        "figure",
        "figure <name> : restore the named figure, or save a new one",
    ),
    (
        "colourmap",
        "colourmap <name> [colours...] : define a colour map",
    ),
    (
        "fit",
        "fit : fit the active view around the active objects' bounds",
    ),
    ("save", "save <file> : write the state document to a file"),
    (
        "restore",
        "restore <file> [replace] : load a state document (merge by default)",
    ),
    ("history", "history : print applied commands"),
    ("clearhistory", "clearhistory : forget applied commands"),
    ("queue", "queue <command...> : append a command to the replay queue"),
    ("help", "help [command] : list commands or describe one"),
    ("quit", "quit : leave the interactive shell"),
];

/// Result of applying one statement.
///
/// Only `Ok` statements enter the applied-command history: queries,
/// comments and queue manipulation leave no replay trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Ok,
    Skipped,
    Quit,
}

/// Parses the textual protocol and drives scene mutations.
#[derive(Debug, Default)]
pub struct CommandEngine {
    /// Successfully applied commands, for save/replay.
    history: Vec<String>,
    /// Raw interactive input, for up/down recall.
    linehistory: Vec<String>,
    /// Pending commands drained cooperatively between interactive inputs.
    replay: VecDeque<String>,
    draining: bool,
}

impl CommandEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applied-command history, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Raw interactive lines, oldest first.
    pub fn line_history(&self) -> &[String] {
        &self.linehistory
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Number of queued replay commands.
    pub fn pending(&self) -> usize {
        self.replay.len()
    }

    /// Appends commands (one per line) to the replay queue without
    /// executing them; the idle tick drains them in order.
    pub fn queue_commands(&mut self, commands: &str) {
        for line in commands.lines() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                self.replay.push_back(trimmed.to_string());
            }
        }
    }

    /// Clears the queued batch wholesale. Only valid between commands; a
    /// command mid-execution is never interrupted.
    pub fn clear_queue(&mut self) -> usize {
        let dropped = self.replay.len();
        self.replay.clear();
        dropped
    }

    /// Cooperative scheduler tick: drains one queued command. Returns
    /// whether more remain.
    pub fn idle(&mut self, session: &mut Session) -> bool {
        if self.draining {
            return !self.replay.is_empty();
        }
        if let Some(line) = self.replay.pop_front() {
            self.draining = true;
            let result = self.apply(session, &line);
            self.draining = false;
            if let Err(err) = result {
                session.messages.report_error(&err);
            }
        }
        !self.replay.is_empty()
    }

    /// Executes one live interactive line.
    ///
    /// Any queued replay batch drains fully first, so command ordering
    /// stays deterministic. Returns `false` when the caller should stop
    /// (the `quit` command).
    pub fn execute(&mut self, session: &mut Session, line: &str) -> bool {
        self.linehistory.push(line.to_string());
        self.drain_replay(session);
        match self.apply(session, line) {
            Ok(Applied::Quit) => false,
            Ok(_) => true,
            Err(err) => {
                session.messages.report_error(&err);
                true
            }
        }
    }

    /// Executes a multi-line script with per-line fault isolation.
    ///
    /// Non-fatal errors are reported and processing continues; a fatal I/O
    /// error aborts the remaining lines, leaving applied state in place.
    /// Returns the number of reported errors.
    pub fn run_script(&mut self, session: &mut Session, source: &str) -> usize {
        let mut errors = 0;
        for line in source.lines() {
            match self.apply(session, line) {
                Ok(Applied::Quit) => break,
                Ok(_) => {}
                Err(err) => {
                    errors += 1;
                    let fatal = err.is_fatal();
                    session.messages.report_error(&err);
                    if fatal {
                        break;
                    }
                }
            }
        }
        errors
    }

    fn drain_replay(&mut self, session: &mut Session) {
        if self.draining {
            return;
        }
        self.draining = true;
        while let Some(line) = self.replay.pop_front() {
            if let Err(err) = self.apply(session, &line) {
                let fatal = err.is_fatal();
                session.messages.report_error(&err);
                if fatal {
                    self.replay.clear();
                    break;
                }
            }
        }
        self.draining = false;
    }

    fn apply(&mut self, session: &mut Session, line: &str) -> EngineResult<Applied> {
        let statement = parse_line(line).map_err(|fault| EngineError::Parse {
            message: fault.to_string(),
        })?;

        let applied = match statement {
            Statement::Blank | Statement::Comment => return Ok(Applied::Skipped),
            Statement::Assign { target, key, value } => {
                self.apply_assignment(session, target.as_deref(), &key, &value)?
            }
            Statement::Command { name, args } => self.dispatch(session, &name, &args)?,
        };

        if applied == Applied::Ok {
            self.history.push(line.trim().to_string());
        }
        Ok(applied)
    }

    // --- target resolution -------------------------------------------------

    /// Resolves a string token to an object.
    ///
    /// Precedence: exact display name, then the token reparsed as an
    /// integer id, then a 1-based registration index. Name collisions
    /// resolve to the first-registered object.
    pub fn lookup_object(&self, session: &Session, token: &str) -> Option<ObjectId> {
        if let Some(object) = session.objects.find_by_name(token) {
            return Some(object.id());
        }
        let number: u32 = token.parse().ok()?;
        if let Some(object) = session.objects.get(ObjectId(number)) {
            return Some(object.id());
        }
        if number >= 1 {
            if let Some(object) = session.objects.by_index(number as usize - 1) {
                return Some(object.id());
            }
        }
        None
    }

    /// Numeric-context resolution: the value is an id, nothing else.
    pub fn lookup_object_by_id(&self, session: &Session, id: u32) -> Option<ObjectId> {
        session.objects.get(ObjectId(id)).map(|object| object.id())
    }

    /// Resolves many tokens, skipping (and reporting) the ones that fail.
    pub fn lookup_objects(&self, session: &mut Session, tokens: &[String]) -> Vec<ObjectId> {
        let mut found = Vec::new();
        for token in tokens {
            match self.lookup_object(session, token) {
                Some(id) => found.push(id),
                None => session.messages.report_error(&EngineError::Resolution {
                    target: token.clone(),
                }),
            }
        }
        found
    }

    // --- property assignment ----------------------------------------------

    fn apply_assignment(
        &mut self,
        session: &mut Session,
        target: Option<&str>,
        key: &str,
        value: &str,
    ) -> EngineResult<Applied> {
        let value = PropertyValue::parse_literal(value);
        debug!("event=assign module=command status=apply key={key}");

        match target {
            // Reserved targets address the non-object property tiers.
            Some("global") => session.globals.set(key, value),
            Some("view") => session.view_mut().properties.set(key, value),
            Some("model") => session.model_mut().defaults.set(key, value),
            Some(token) => {
                let id =
                    self.lookup_object(session, token)
                        .ok_or_else(|| EngineError::Resolution {
                            target: token.to_string(),
                        })?;
                if let Some(object) = session.objects.get_mut(id) {
                    object.properties.set(key, value);
                }
            }
            // Implicit target: the selected object, else the active view.
            None => match session.selected_object() {
                Some(id) => {
                    if let Some(object) = session.objects.get_mut(id) {
                        object.properties.set(key, value);
                    }
                }
                None => session.view_mut().properties.set(key, value),
            },
        }
        Ok(Applied::Ok)
    }

    // --- command dispatch ---------------------------------------------------

    fn dispatch(
        &mut self,
        session: &mut Session,
        name: &str,
        args: &[String],
    ) -> EngineResult<Applied> {
        match name {
            "create" => self.cmd_create(session, args),
            "delete" => self.cmd_delete(session, args),
            "clear" => self.cmd_clear(session, args),
            "select" => self.cmd_select(session, args),
            "name" => self.cmd_name(session, args),
            "list" => self.cmd_list(session, args),
            "model" => self.cmd_model(session, args),
            "view" => self.cmd_view(session, args),
            "step" => self.cmd_step(session, args),
            "next" => self.cmd_relative_step(session, 1),
            "previous" | "prev" => self.cmd_relative_step(session, -1),
            "figure" => self.cmd_figure(session, args),
            "colourmap" => self.cmd_colourmap(session, args),
            "fit" => self.cmd_fit(session),
            "save" => self.cmd_save(session, args),
            "restore" => self.cmd_restore(session, args),
            "history" => self.cmd_history(session),
            "clearhistory" => {
                self.history.clear();
                Ok(Applied::Skipped)
            }
            "queue" => self.cmd_queue(args),
            "help" => self.cmd_help(session, args),
            "quit" | "exit" => Ok(Applied::Quit),
            other => Err(EngineError::Parse {
                message: format!("unrecognized command `{other}`"),
            }),
        }
    }

    fn cmd_create(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let name = args.first().ok_or_else(|| EngineError::Parse {
            message: "create requires an object name".to_string(),
        })?;
        // Validate the kind before touching the registry so a rejected
        // statement leaves no partial state.
        let kind = args
            .get(1)
            .map(|token| {
                GeometryKind::parse(token).ok_or_else(|| EngineError::Parse {
                    message: format!("unknown geometry kind `{token}`"),
                })
            })
            .transpose()?;
        let id = session.create_object(name.clone());
        if let Some(kind) = kind {
            if let Some(object) = session.objects.get_mut(id) {
                object.properties.set("geometry", kind.as_str());
            }
        }
        session
            .messages
            .report(Severity::Info, format!("created object {id}: {name}"));
        Ok(Applied::Ok)
    }

    fn cmd_delete(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let id = self.resolve_target_or_selected(session, args.first())?;
        session.delete_object(id);
        session
            .messages
            .report(Severity::Info, format!("deleted object {id}"));
        Ok(Applied::Ok)
    }

    fn cmd_clear(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        match args.first().map(String::as_str) {
            None | Some("all") => session.clear(false),
            Some("objects") => session.clear(true),
            Some(token) => {
                let id = self
                    .lookup_object(session, token)
                    .ok_or_else(|| EngineError::Resolution {
                        target: token.to_string(),
                    })?;
                if let Some(object) = session.objects.get_mut(id) {
                    object.clear_geometry(None);
                }
            }
        }
        Ok(Applied::Ok)
    }

    fn cmd_select(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        match args.first() {
            None => {
                session.select_object(None);
                session
                    .messages
                    .report(Severity::Info, "selection cleared");
            }
            Some(token) => {
                let id = self
                    .lookup_object(session, token)
                    .ok_or_else(|| EngineError::Resolution {
                        target: token.clone(),
                    })?;
                session.select_object(Some(id));
                session
                    .messages
                    .report(Severity::Info, format!("selected object {id}"));
            }
        }
        Ok(Applied::Ok)
    }

    fn cmd_name(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let (id, new_name) = match args {
            [new_name] => (
                self.resolve_target_or_selected(session, None)?,
                new_name.clone(),
            ),
            [target, new_name] => (
                self.resolve_target_or_selected(session, Some(target))?,
                new_name.clone(),
            ),
            _ => {
                return Err(EngineError::Parse {
                    message: "name requires [target] <new-name>".to_string(),
                })
            }
        };
        if let Some(object) = session.objects.get_mut(id) {
            object.rename(new_name);
        }
        Ok(Applied::Ok)
    }

    fn cmd_list(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let what = args.first().map(String::as_str).unwrap_or("objects");
        let lines: Vec<String> = match what {
            "objects" => session
                .objects
                .iter()
                .map(|object| {
                    format!(
                        "{} {} ({} elements)",
                        object.id(),
                        object.name(),
                        object.total_elements()
                    )
                })
                .collect(),
            "views" => session
                .views()
                .iter()
                .enumerate()
                .map(|(index, view)| format!("{} {}", index + 1, view.name()))
                .collect(),
            "steps" => session
                .timesteps()
                .iter()
                .map(i32::to_string)
                .collect(),
            "figures" => session
                .figure_names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            "colourmaps" => session
                .colourmaps()
                .iter()
                .map(|map| format!("{} {}", map.id(), map.name()))
                .collect(),
            other => {
                return Err(EngineError::Parse {
                    message: format!("cannot list `{other}`"),
                })
            }
        };
        if lines.is_empty() {
            session
                .messages
                .report(Severity::Info, format!("no {what}"));
        }
        for line in lines {
            session.messages.report(Severity::Info, line);
        }
        Ok(Applied::Skipped)
    }

    fn cmd_model(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let token = args.first().ok_or_else(|| EngineError::Parse {
            message: "model requires a name or index".to_string(),
        })?;
        let index = session
            .find_model(token)
            .ok_or_else(|| EngineError::Resolution {
                target: token.clone(),
            })?;
        session.select_model(index);
        Ok(Applied::Ok)
    }

    fn cmd_view(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let token = args.first().ok_or_else(|| EngineError::Parse {
            message: "view requires a name or index".to_string(),
        })?;
        let index = session
            .find_view(token)
            .ok_or_else(|| EngineError::Resolution {
                target: token.clone(),
            })?;
        session.select_view(index);
        Ok(Applied::Ok)
    }

    fn cmd_step(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let token = args.first().ok_or_else(|| EngineError::Parse {
            message: "step requires a timestep".to_string(),
        })?;
        let step: i32 = token.parse().map_err(|_| EngineError::Parse {
            message: format!("`{token}` is not a timestep"),
        })?;
        let force = args.get(1).map(String::as_str) == Some("force");
        session
            .load_step(step, force)
            .map_err(|err| EngineError::Load {
                step,
                message: err.to_string(),
            })?;
        Ok(Applied::Ok)
    }

    fn cmd_relative_step(&mut self, session: &mut Session, delta: i32) -> EngineResult<Applied> {
        let requested = session.model().current_step().unwrap_or(0) + delta;
        session.try_step(delta).map_err(|err| EngineError::Load {
            step: requested,
            message: err.to_string(),
        })?;
        Ok(Applied::Ok)
    }

    fn cmd_figure(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let name = args.first().ok_or_else(|| EngineError::Parse {
            message: "figure requires a name".to_string(),
        })?;
        if session.restore_figure(name) {
            session
                .messages
                .report(Severity::Info, format!("restored figure {name}"));
        } else {
            session.save_figure(name);
            session
                .messages
                .report(Severity::Info, format!("saved figure {name}"));
        }
        Ok(Applied::Ok)
    }

    fn cmd_colourmap(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let name = args.first().ok_or_else(|| EngineError::Parse {
            message: "colourmap requires a name".to_string(),
        })?;
        let colours = ColourMap::parse_colours(&args[1..].join(" "));
        session.define_colourmap(name, colours);
        // A selected object adopts the map immediately.
        if let Some(id) = session.selected_object() {
            if let Some(object) = session.objects.get_mut(id) {
                object.properties.set("colourmap", name.as_str());
            }
        }
        Ok(Applied::Ok)
    }

    fn cmd_fit(&mut self, session: &mut Session) -> EngineResult<Applied> {
        if session.fit_view_to_active().is_none() {
            session
                .messages
                .report(Severity::Info, "no geometry to fit the view around");
        }
        Ok(Applied::Ok)
    }

    fn cmd_save(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let path = args.first().ok_or_else(|| EngineError::Parse {
            message: "save requires a file path".to_string(),
        })?;
        let document = state::dump_string(session);
        std::fs::write(path, document)?;
        session
            .messages
            .report(Severity::Info, format!("state saved to {path}"));
        Ok(Applied::Ok)
    }

    fn cmd_restore(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        let path = args.first().ok_or_else(|| EngineError::Parse {
            message: "restore requires a file path".to_string(),
        })?;
        let mode = if args.get(1).map(String::as_str) == Some("replace") {
            LoadMode::Replace
        } else {
            LoadMode::Merge
        };
        let text = std::fs::read_to_string(path)?;
        state::load_string(session, &text, mode)?;
        session
            .messages
            .report(Severity::Info, format!("state restored from {path}"));
        Ok(Applied::Ok)
    }

    fn cmd_history(&mut self, session: &mut Session) -> EngineResult<Applied> {
        if self.history.is_empty() {
            session.messages.report(Severity::Info, "history is empty");
        }
        for line in &self.history {
            session.messages.report(Severity::Info, line.clone());
        }
        Ok(Applied::Skipped)
    }

    fn cmd_queue(&mut self, args: &[String]) -> EngineResult<Applied> {
        if args.is_empty() {
            return Err(EngineError::Parse {
                message: "queue requires a command".to_string(),
            });
        }
        self.replay.push_back(args.join(" "));
        Ok(Applied::Skipped)
    }

    fn cmd_help(&mut self, session: &mut Session, args: &[String]) -> EngineResult<Applied> {
        match args.first() {
            None => {
                let names: Vec<&str> = COMMANDS.iter().map(|(name, _)| *name).collect();
                session
                    .messages
                    .report(Severity::Info, format!("commands: {}", names.join(" ")));
            }
            Some(topic) => {
                let entry = COMMANDS
                    .iter()
                    .find(|(name, _)| name == topic)
                    .ok_or_else(|| EngineError::Parse {
                        message: format!("unrecognized command `{topic}`"),
                    })?;
                session.messages.report(Severity::Info, entry.1);
            }
        }
        Ok(Applied::Skipped)
    }

    fn resolve_target_or_selected(
        &self,
        session: &Session,
        token: Option<&String>,
    ) -> EngineResult<ObjectId> {
        match token {
            Some(token) => self
                .lookup_object(session, token)
                .ok_or_else(|| EngineError::Resolution {
                    target: token.clone(),
                }),
            None => session
                .selected_object()
                .ok_or_else(|| EngineError::Resolution {
                    target: "(no selection)".to_string(),
                }),
        }
    }
}
