use std::collections::HashMap;

use crate::error::Error;
use crate::model::{Alignment, Color, DocumentConfig};

/// Name of the root style every other style ultimately inherits from.
pub const BASE_STYLE: &str = "Base";

/// Partial style definition. Unset fields inherit from the parent chain.
#[derive(Clone, Debug, Default)]
pub struct StyleAttrs {
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub text_color: Option<Color>,
    pub background: Option<Color>,
    pub alignment: Option<Alignment>,
    pub space_before: Option<f32>,
    pub space_after: Option<f32>,
    pub indent_left: Option<f32>,
    pub indent_right: Option<f32>,
    /// Line-height multiplier over the font's natural line height.
    pub leading: Option<f32>,
}

/// Fully merged style with every attribute concrete.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStyle {
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub text_color: Color,
    pub background: Option<Color>,
    pub alignment: Alignment,
    pub space_before: f32,
    pub space_after: f32,
    pub indent_left: f32,
    pub indent_right: f32,
    pub leading: f32,
}

struct StyleEntry {
    attrs: StyleAttrs,
    parent: Option<String>,
}

/// Named, inheritable style definitions. Built once at startup and passed by
/// reference into the content builder and the paginator; immutable once the
/// document build starts, so resolution is deterministic.
pub struct StyleRegistry {
    styles: HashMap<String, StyleEntry>,
    base: ResolvedStyle,
}

impl StyleRegistry {
    /// Creates a registry seeded with the `Base` style from the document
    /// configuration.
    pub fn new(config: &DocumentConfig) -> Self {
        let base = ResolvedStyle {
            font_family: config.base_font_family.clone(),
            font_size: config.base_font_size,
            bold: false,
            italic: false,
            text_color: Color::BLACK,
            background: None,
            alignment: Alignment::Left,
            space_before: 0.0,
            space_after: 0.0,
            indent_left: 0.0,
            indent_right: 0.0,
            leading: 1.0,
        };
        let mut styles = HashMap::new();
        styles.insert(
            BASE_STYLE.to_string(),
            StyleEntry {
                attrs: StyleAttrs::default(),
                parent: None,
            },
        );
        Self { styles, base }
    }

    /// Registers `name` with the given attributes. `parent` defaults to the
    /// base style. Parents must already be registered, which makes
    /// inheritance cycles unrepresentable.
    pub fn define(
        &mut self,
        name: &str,
        attrs: StyleAttrs,
        parent: Option<&str>,
    ) -> Result<(), Error> {
        if self.styles.contains_key(name) {
            return Err(Error::DuplicateStyle(name.to_string()));
        }
        let parent = parent.unwrap_or(BASE_STYLE);
        if !self.styles.contains_key(parent) {
            return Err(Error::UnknownParent(parent.to_string()));
        }
        log::debug!("style {name:?} defined (parent {parent:?})");
        self.styles.insert(
            name.to_string(),
            StyleEntry {
                attrs,
                parent: Some(parent.to_string()),
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    /// Returns the fully merged attributes for `name`: each style overrides
    /// only the fields it sets, falling back along the parent chain to the
    /// base style.
    pub fn resolve(&self, name: &str) -> Result<ResolvedStyle, Error> {
        if !self.styles.contains_key(name) {
            return Err(Error::UnknownStyle(name.to_string()));
        }

        // Collect the chain child -> root, then apply root-first so each
        // closer style overrides the one above it.
        let mut chain: Vec<&str> = Vec::new();
        let mut current = name;
        loop {
            chain.push(current);
            match self.styles[current].parent.as_deref() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        let mut resolved = self.base.clone();
        for id in chain.iter().rev() {
            let attrs = &self.styles[*id].attrs;
            if let Some(ref family) = attrs.font_family {
                resolved.font_family = family.clone();
            }
            if let Some(size) = attrs.font_size {
                resolved.font_size = size;
            }
            if let Some(bold) = attrs.bold {
                resolved.bold = bold;
            }
            if let Some(italic) = attrs.italic {
                resolved.italic = italic;
            }
            if let Some(color) = attrs.text_color {
                resolved.text_color = color;
            }
            if let Some(background) = attrs.background {
                resolved.background = Some(background);
            }
            if let Some(alignment) = attrs.alignment {
                resolved.alignment = alignment;
            }
            if let Some(before) = attrs.space_before {
                resolved.space_before = before;
            }
            if let Some(after) = attrs.space_after {
                resolved.space_after = after;
            }
            if let Some(indent) = attrs.indent_left {
                resolved.indent_left = indent;
            }
            if let Some(indent) = attrs.indent_right {
                resolved.indent_right = indent;
            }
            if let Some(leading) = attrs.leading {
                resolved.leading = leading;
            }
        }
        Ok(resolved)
    }
}
