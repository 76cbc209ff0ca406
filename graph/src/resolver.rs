//! Resolves short user-typed names to full URIs.
//!
//! A token is one of:
//! - `<http://full/iri>`: used verbatim;
//! - `Name` or `:Name`: the system namespace;
//! - `prefix:Name`: a namespace from the prefix table;
//! - `prefix:` or the empty string: the contextual default local name in
//!   that namespace (usually the thing currently being declared).

use std::collections::BTreeMap;

use crate::error::{GraphError, Result};
use crate::model::iris;

/// The prefix the system namespace is bound to in output.
pub const SYSTEM_PREFIX: &str = "sys";

/// Prefix → namespace table with a distinguished system namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    system: String,
    prefixes: BTreeMap<String, String>,
}

impl Namespaces {
    /// Creates a table with the built-in vocabulary prefixes and the given
    /// system namespace bound to `sys`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Config`] if the system namespace is empty.
    pub fn new(system: &str) -> Result<Self> {
        if system.trim().is_empty() {
            return Err(GraphError::Config(
                "system_prefix must be set to the base URI of the system namespace".into(),
            ));
        }
        let mut prefixes = BTreeMap::new();
        for (prefix, iri) in builtin_prefixes() {
            prefixes.insert(prefix.to_string(), iri.to_string());
        }
        prefixes.insert(SYSTEM_PREFIX.to_string(), system.to_string());
        Ok(Self {
            system: system.to_string(),
            prefixes,
        })
    }

    /// Adds an extra prefix.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Config`] when the prefix is malformed or tries to
    /// rebind `sys` to something other than the system namespace.
    pub fn insert(&mut self, prefix: &str, iri: &str) -> Result<()> {
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(GraphError::Config(format!(
                "invalid prefix name \"{prefix}\""
            )));
        }
        if prefix == SYSTEM_PREFIX && iri != self.system {
            return Err(GraphError::Config(format!(
                "prefix \"{SYSTEM_PREFIX}\" is reserved for the system namespace"
            )));
        }
        self.prefixes.insert(prefix.to_string(), iri.to_string());
        Ok(())
    }

    /// The system namespace base URI.
    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// Looks up a namespace by prefix.
    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Iterates over `(prefix, namespace)` pairs in prefix order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, i)| (p.as_str(), i.as_str()))
    }

    /// Resolves a token to a full URI.
    ///
    /// `contextual_default` is the local name substituted when the token's
    /// local part is empty.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownPrefix`] for an unbound prefix and
    /// [`GraphError::EmptyName`] for an empty local part with no default.
    pub fn resolve(&self, token: &str, contextual_default: Option<&str>) -> Result<String> {
        let token = token.trim();
        if let Some(inner) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            return Ok(inner.to_string());
        }

        let (namespace, local) = match token.rsplit_once(':') {
            None => (self.system.as_str(), token),
            Some(("", local)) => (self.system.as_str(), local),
            Some((prefix, local)) => {
                let ns = self.get(prefix).ok_or_else(|| GraphError::UnknownPrefix {
                    prefix: prefix.to_string(),
                    token: token.to_string(),
                })?;
                (ns, local)
            }
        };

        let local = if local.is_empty() {
            contextual_default.ok_or_else(|| GraphError::EmptyName(token.to_string()))?
        } else {
            local
        };
        Ok(join(namespace, local))
    }

    /// Abbreviates a URI to `prefix:local` using the longest matching namespace.
    #[must_use]
    pub fn compact(&self, uri: &str) -> Option<String> {
        self.prefixes
            .iter()
            .filter(|(_, ns)| !ns.is_empty() && uri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| format!("{}:{}", prefix, &uri[ns.len()..]))
    }
}

/// Concatenates a namespace base and a local name.
#[must_use]
pub fn join(namespace: &str, local: &str) -> String {
    let mut uri = String::with_capacity(namespace.len() + local.len());
    uri.push_str(namespace);
    uri.push_str(local);
    uri
}

/// Vocabulary prefixes every build knows about.
#[must_use]
pub fn builtin_prefixes() -> [(&'static str, &'static str); 7] {
    [
        ("probs", iris::PROBS),
        ("recipe", iris::PROBS_RECIPE),
        ("quantitykind", iris::QUANTITYKIND),
        ("rdf", iris::RDF),
        ("rdfs", iris::RDFS),
        ("skos", iris::SKOS),
        ("xsd", iris::XSD),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYS: &str = "http://example.org/system/";

    fn namespaces() -> Namespaces {
        let mut ns = Namespaces::new(SYS).unwrap();
        ns.insert("prefix", "http://example.org/prefix/").unwrap();
        ns
    }

    #[test]
    fn bare_name_uses_system_namespace() {
        let ns = namespaces();
        assert_eq!(ns.resolve("P1", None).unwrap(), format!("{SYS}P1"));
        assert_eq!(ns.resolve(":P1", None).unwrap(), format!("{SYS}P1"));
    }

    #[test]
    fn angle_brackets_are_verbatim() {
        let ns = namespaces();
        assert_eq!(
            ns.resolve("<http://other.org/x:y>", None).unwrap(),
            "http://other.org/x:y"
        );
    }

    #[test]
    fn known_prefix() {
        let ns = namespaces();
        assert_eq!(
            ns.resolve("prefix:Crumble", None).unwrap(),
            "http://example.org/prefix/Crumble"
        );
        assert_eq!(
            ns.resolve("probs:Process", None).unwrap(),
            iris::PROBS_PROCESS
        );
    }

    #[test]
    fn unknown_prefix_is_fatal() {
        let err = namespaces().resolve("nope:X", None).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownPrefix {
                prefix: "nope".into(),
                token: "nope:X".into()
            }
        );
    }

    #[test]
    fn empty_local_uses_contextual_default() {
        let ns = namespaces();
        assert_eq!(
            ns.resolve("prefix:", Some("P2")).unwrap(),
            "http://example.org/prefix/P2"
        );
        assert_eq!(ns.resolve("", Some("P2")).unwrap(), format!("{SYS}P2"));
        assert!(matches!(
            ns.resolve("prefix:", None),
            Err(GraphError::EmptyName(_))
        ));
    }

    #[test]
    fn splits_on_last_colon() {
        let mut ns = namespaces();
        ns.insert("a", "urn:a:").unwrap();
        // "a:b:c" has prefix "a:b", which is unknown.
        assert!(ns.resolve("a:b:c", None).is_err());
    }

    #[test]
    fn sys_cannot_be_rebound() {
        let mut ns = namespaces();
        assert!(ns.insert("sys", "http://elsewhere/").is_err());
        assert!(ns.insert("sys", SYS).is_ok());
    }

    #[test]
    fn empty_system_namespace_is_a_config_error() {
        assert!(matches!(Namespaces::new(" "), Err(GraphError::Config(_))));
    }

    #[test]
    fn compact_prefers_longest_namespace() {
        let ns = namespaces();
        assert_eq!(
            ns.compact(iris::RECIPE_QUANTITY).as_deref(),
            Some("recipe:quantity")
        );
        assert_eq!(ns.compact(&format!("{SYS}P1")).as_deref(), Some("sys:P1"));
        assert_eq!(ns.compact("http://unbound/x"), None);
    }
}
