//! Build configuration.
//!
//! [`Config`] is the deserialized shape of `probs.toml`; [`Settings`] is
//! the validated, immutable form shared by every document build.
//!
//! ```toml
//! system_prefix = "http://example.org/system/"
//! preload = ["ontology/probs.ttl"]
//!
//! [extra_prefixes]
//! ex = "http://example.org/extra/"
//!
//! [units.lb]
//! scale = 0.45359237
//! metric = "Mass"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::resolver::Namespaces;
use crate::units::UnitTable;

/// A unit entry in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Factor converting the unit to its metric's base unit.
    pub scale: f64,
    /// Quantity-kind IRI or short name such as `Mass`.
    pub metric: String,
}

/// Deserialized configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URI of the system namespace (bound to `sys`).
    pub system_prefix: String,
    /// Additional prefix bindings.
    pub extra_prefixes: BTreeMap<String, String>,
    /// Additional or overriding units.
    pub units: BTreeMap<String, UnitConfig>,
    /// Turtle files loaded into the graph before references are resolved.
    pub preload: Vec<PathBuf>,
}

/// Validated settings for a build.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Prefix table used by the resolver.
    pub namespaces: Namespaces,
    /// Unit table used for recipe quantities.
    pub units: UnitTable,
}

impl Settings {
    /// Creates settings with the given system namespace and no extras.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Config`] if `system_prefix` is empty.
    pub fn new(system_prefix: &str) -> Result<Self> {
        Ok(Self {
            namespaces: Namespaces::new(system_prefix)?,
            units: UnitTable::new(),
        })
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Config`] for a missing system prefix, a
    /// malformed extra prefix or an invalid unit.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut settings = Self::new(&config.system_prefix)?;
        for (prefix, iri) in &config.extra_prefixes {
            settings.namespaces.insert(prefix, iri)?;
        }
        for (symbol, unit) in &config.units {
            settings.units.insert(symbol, unit.scale, &unit.metric)?;
        }
        Ok(settings)
    }
}
