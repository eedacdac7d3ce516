//! Variable resolvers.
//!
//! This module contains the variable expansion used for configured directories and URL templates.

use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::fmt;

// Maximum number of nested expansions before giving up.
#[doc(hidden)]
const MAX_DEPTH: usize = 8;

/// The error type for operations interacting with variables.
#[cfg_attr(test, derive(PartialEq))]
#[derive(Debug, thiserror::Error)]
pub(crate) enum VarError {
    /// The specified variable is not present.
    #[error("variable '{0}' not found")]
    NotPresent(String),
    /// The expansion does not terminate.
    #[error("expansion of '{0}' is too deeply nested")]
    TooDeep(String),
}

/// Trait for variable resolvers.
pub(crate) trait VarResolver: fmt::Debug {
    /// Resolves the variable with the given name.
    fn resolve_var(&self, var_name: &str) -> Result<String, VarError>;
}

/// [`VarResolver`] implementation for environment variables of the operating system.
///
/// Only variables with the prefix `env.` are resolved, e.g. `${env.LOCALAPPDATA}`.
#[derive(Debug)]
pub(crate) struct OsEnvVarResolver;

impl VarResolver for OsEnvVarResolver {
    #[tracing::instrument(level = "trace", ret)]
    fn resolve_var(&self, v: &str) -> Result<String, VarError> {
        v.strip_prefix("env.") //
            .and_then(|name| env::var(name).ok())
            .ok_or_else(|| VarError::NotPresent(v.to_owned()))
    }
}

/// [`VarResolver`] implementation for simple variables.
#[derive(Debug, Default)]
pub(crate) struct SimpleVarResolver {
    vars: HashMap<String, String>,
}

impl SimpleVarResolver {
    /// Registers the value for the given variable name.
    pub(crate) fn insert(&mut self, name: impl Into<String>, val: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), val.into());

        self
    }
}

impl VarResolver for SimpleVarResolver {
    #[tracing::instrument(level = "trace", ret)]
    fn resolve_var(&self, v: &str) -> Result<String, VarError> {
        self.vars.get(v).cloned().ok_or_else(|| VarError::NotPresent(v.to_owned()))
    }
}

/// Expands variables in strings with the help of variable resolvers.
///
/// The first resolver that knows a variable wins.
#[derive(Debug)]
pub(crate) struct VarExpander {
    resolvers: Vec<Box<dyn VarResolver>>,
}

impl VarExpander {
    /// Constructs a new `VarExpander` with the given variable resolvers.
    pub(crate) fn new(resolvers: Vec<Box<dyn VarResolver>>) -> Self {
        Self { resolvers }
    }

    /// Constructs a new `VarExpander` that only knows about environment variables.
    pub(crate) fn env_only() -> Self {
        Self::new(vec![Box::new(OsEnvVarResolver)])
    }

    /// Expands all known variables in the given string.
    #[tracing::instrument(level = "trace", ret)]
    pub(crate) fn expand<'a>(&self, s: &'a str) -> Result<Cow<'a, str>, VarError> {
        let mut current = Cow::Borrowed(s);
        for _ in 0..MAX_DEPTH {
            let expanded = self.expand_once(&current)?.into_owned();
            if expanded == current {
                return Ok(current);
            }
            current = Cow::Owned(expanded);
        }

        Err(VarError::TooDeep(s.to_owned()))
    }

    /// Expands all known variables in the given string without scanning the substituted values again.
    pub(crate) fn expand_once<'a>(&self, s: &'a str) -> Result<Cow<'a, str>, VarError> {
        shellexpand::env_with_context(s, |v| self.resolve(v)).map_err(|err| err.cause)
    }

    // Provides the context for `expand`.
    #[doc(hidden)]
    fn resolve(&self, v: &str) -> Result<Option<String>, VarError> {
        self.resolvers
            .iter()
            .find_map(|resolver| resolver.resolve_var(v).ok())
            .map(Option::Some)
            .ok_or_else(|| VarError::NotPresent(v.to_owned()))
    }
}
