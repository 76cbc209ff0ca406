//! Unit symbol → (scale, metric) lookup.
//!
//! Quantities in recipes are stored in the base unit of their metric (kg,
//! m, m², m³, or a bare number), so each unit carries the factor that
//! converts to that base.

use std::collections::BTreeMap;

use crate::error::{GraphError, Result};
use crate::model::iris;

/// Scale factor and quantity kind of a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Multiplier converting an amount in this unit to the metric's base unit.
    pub scale: f64,
    /// Full IRI of the quantity kind.
    pub metric: String,
}

impl Unit {
    /// Creates a unit.
    pub fn new(scale: f64, metric: impl Into<String>) -> Self {
        Self {
            scale,
            metric: metric.into(),
        }
    }

    /// The unit assumed when none is given or the given one is unknown:
    /// unscaled mass.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(1.0, iris::QK_MASS)
    }
}

/// Immutable table of known units.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTable {
    units: BTreeMap<String, Unit>,
}

impl Default for UnitTable {
    fn default() -> Self {
        let mut units = BTreeMap::new();
        for (symbol, scale, metric) in [
            ("kg", 1.0, iris::QK_MASS),
            ("g", 1e-3, iris::QK_MASS),
            ("t", 1e3, iris::QK_MASS),
            ("kt", 1e6, iris::QK_MASS),
            ("Mt", 1e9, iris::QK_MASS),
            ("m", 1.0, iris::QK_LENGTH),
            ("km", 1e3, iris::QK_LENGTH),
            ("m2", 1.0, iris::QK_AREA),
            ("ha", 1e4, iris::QK_AREA),
            ("m3", 1.0, iris::QK_VOLUME),
            ("L", 1e-3, iris::QK_VOLUME),
            ("-", 1.0, iris::QK_DIMENSIONLESS),
        ] {
            units.insert(symbol.to_string(), Unit::new(scale, metric));
        }
        Self { units }
    }
}

impl UnitTable {
    /// Returns the built-in table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a unit. `metric` may be a full IRI or a quantity-kind
    /// short name such as `Mass`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Config`] for an empty symbol, an empty metric or
    /// a scale that is not a finite positive number.
    pub fn insert(&mut self, symbol: &str, scale: f64, metric: &str) -> Result<()> {
        if symbol.is_empty() {
            return Err(GraphError::Config("unit symbol must not be empty".into()));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(GraphError::Config(format!(
                "unit \"{symbol}\" has invalid scale {scale}"
            )));
        }
        let metric = metric.trim();
        if metric.is_empty() {
            return Err(GraphError::Config(format!(
                "unit \"{symbol}\" has no metric"
            )));
        }
        let metric = if metric.contains("://") {
            metric.to_string()
        } else {
            format!("{}{}", iris::QUANTITYKIND, metric)
        };
        self.units
            .insert(symbol.to_string(), Unit::new(scale, metric));
        Ok(())
    }

    /// Looks up a unit symbol.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&Unit> {
        self.units.get(symbol)
    }

    /// Number of known units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
