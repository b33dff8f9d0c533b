//! Command templating.
//!
//! Compile and run commands are format strings with `{name}` placeholders,
//! e.g. `{cc} {ccflags} -o {outfile} {infile} {driver}`. Expansion is a plain
//! keyed substitution: every placeholder must name a known variable. `{{` and
//! `}}` produce literal braces.

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::case::CasePaths;
use crate::config::EngineConfig;
use crate::properties::{Properties, Property};

/// Toolchain used when neither a `cc` property nor an override is present.
pub const DEFAULT_TOOLCHAIN: &str = "cc";

/// Errors expanding a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// `{name}` with no matching variable.
    UnknownPlaceholder { name: String, template: String },
    /// A `{` or `}` that is neither escaped nor part of a placeholder.
    StrayBrace { offset: usize, template: String },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UnknownPlaceholder { name, template } => {
                write!(f, "unknown placeholder '{{{}}}' in '{}'", name, template)
            }
            TemplateError::StrayBrace { offset, template } => {
                write!(f, "single brace at offset {} in '{}'", offset, template)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}|[{}]").expect("valid token regex")
    })
}

/// A parsed-on-demand command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    source: &'a str,
}

impl<'a> Template<'a> {
    pub fn new(source: &'a str) -> Self {
        Template { source }
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> Vec<&'a str> {
        token_regex()
            .captures_iter(self.source)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Whether any of `names` appears as a placeholder.
    pub fn references_any(&self, names: &[&str]) -> bool {
        self.placeholders().iter().any(|p| names.contains(p))
    }

    /// Substitute every placeholder from `vars`.
    pub fn expand(&self, vars: &Vars) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;

        for caps in token_regex().captures_iter(self.source) {
            let token = caps.get(0).expect("group 0 always matches");
            out.push_str(&self.source[last..token.start()]);
            last = token.end();

            match (token.as_str(), caps.get(1)) {
                ("{{", _) => out.push('{'),
                ("}}", _) => out.push('}'),
                (_, Some(name)) => match vars.get(name.as_str()) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(TemplateError::UnknownPlaceholder {
                            name: name.as_str().to_string(),
                            template: self.source.to_string(),
                        })
                    }
                },
                _ => {
                    return Err(TemplateError::StrayBrace {
                        offset: token.start(),
                        template: self.source.to_string(),
                    })
                }
            }
        }

        out.push_str(&self.source[last..]);
        Ok(out)
    }
}

/// Substitution dictionary for command templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    values: IndexMap<&'static str, String>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<String>) {
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Append `extra` to a variable, space-separated.
    pub fn append(&mut self, name: &'static str, extra: &str) {
        let entry = self.values.entry(name).or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(extra);
    }

    /// Full variable set for one case.
    ///
    /// - `cc`: property, else the engine override, else [`DEFAULT_TOOLCHAIN`]
    /// - `ccflags`, `args`: property, else the fixed default
    /// - `ldflags`, `ldlibs`: engine override, else empty
    pub fn for_case(properties: &Properties, paths: &CasePaths, config: &EngineConfig) -> Self {
        let cc = properties
            .lookup(Property::Cc)
            .or(config.toolchain.as_deref())
            .unwrap_or(DEFAULT_TOOLCHAIN);
        let resolved = |p: Property| properties.resolve(p).unwrap_or_default().to_string();

        Vars::new()
            .with("cc", cc)
            .with("ccflags", resolved(Property::CcFlags))
            .with("ldflags", config.ldflags.clone().unwrap_or_default())
            .with("ldlibs", config.ldlibs.clone().unwrap_or_default())
            .with("infile", paths.source.display().to_string())
            .with("outfile", paths.binary.display().to_string())
            .with("driver", paths.driver.display().to_string())
            .with("args", resolved(Property::Args))
    }
}
