//! Colour map registry entries.
//!
//! # Responsibility
//! - Hold named, ordered colour lists that objects reference through their
//!   `colourmap` property.
//!
//! Numeric interpolation between entries is the renderer's concern; this
//! module only stores and addresses the definitions.

use std::fmt::{Display, Formatter};

/// Process-stable integer identity for a colour map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColourMapId(pub u32);

impl Display for ColourMapId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, ordered list of colour stops.
///
/// Entries are kept as the caller's strings (`"red"`, `"#ff0000"`,
/// `"rgba(255,0,0,1)"`); the renderer interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColourMap {
    id: ColourMapId,
    name: String,
    colours: Vec<String>,
}

impl ColourMap {
    pub fn new(id: ColourMapId, name: impl Into<String>, colours: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            colours,
        }
    }

    pub fn id(&self) -> ColourMapId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn colours(&self) -> &[String] {
        &self.colours
    }

    /// Replaces the colour list wholesale.
    pub fn set_colours(&mut self, colours: Vec<String>) {
        self.colours = colours;
    }

    /// Splits a definition string on whitespace into colour stops.
    pub fn parse_colours(definition: &str) -> Vec<String> {
        definition
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColourMap, ColourMapId};

    #[test]
    fn parse_colours_splits_on_whitespace() {
        let colours = ColourMap::parse_colours("red #00ff00  blue");
        assert_eq!(colours, vec!["red", "#00ff00", "blue"]);
    }

    #[test]
    fn set_colours_replaces_wholesale() {
        let mut map = ColourMap::new(ColourMapId(1), "heat", vec!["black".to_string()]);
        map.set_colours(ColourMap::parse_colours("black red yellow white"));
        assert_eq!(map.colours().len(), 4);
    }
}
