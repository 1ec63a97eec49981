use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

pub(crate) const DEFAULT_SCOPE: &str = "user:read:email";

/// Joins enabled scope names into the `scope` value. The joined string is
/// form-encoded as a whole, so the `+` travels as `%2B`.
pub const SCOPE_SEPARATOR: &str = "+";

/// Requested permission scopes, in insertion order, each with an enabled flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scopes(Vec<(String, bool)>);

impl Scopes {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Sets `name` to `enabled`, keeping its original position if already present.
    pub fn set(&mut self, name: impl Into<String>, enabled: bool) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, flag)) => *flag = enabled,
            None => self.0.push((name, enabled)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.set(name, enabled);
        self
    }

    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(name, _)| name.as_str())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.iter().any(|(scope, enabled)| scope == name && *enabled)
    }

    /// Enabled scope names joined by [`SCOPE_SEPARATOR`], unencoded.
    pub fn joined(&self) -> String {
        self.enabled()
            .collect::<Vec<_>>()
            .join(SCOPE_SEPARATOR)
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::empty().with(DEFAULT_SCOPE, true)
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for Scopes {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut scopes = Self::empty();
        for (name, enabled) in iter {
            scopes.set(name, enabled);
        }
        scopes
    }
}

/// Reads a name→enabled table in document order.
impl<'de> Deserialize<'de> for Scopes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScopesVisitor;

        impl<'de> Visitor<'de> for ScopesVisitor {
            type Value = Scopes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of scope names to booleans")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Scopes, A::Error> {
                let mut scopes = Scopes::empty();
                while let Some((name, enabled)) = map.next_entry::<String, bool>()? {
                    scopes.set(name, enabled);
                }
                Ok(scopes)
            }
        }

        deserializer.deserialize_map(ScopesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::Scopes;

    #[test]
    fn default_requests_user_email() {
        assert_eq!(Scopes::default().joined(), "user:read:email");
    }

    #[test]
    fn joins_only_enabled_scopes_without_trailing_separator() {
        let scopes = Scopes::empty()
            .with("user:read:email", true)
            .with("channel:read:subscriptions", false)
            .with("bits:read", true);
        assert_eq!(scopes.joined(), "user:read:email+bits:read");
    }

    #[test]
    fn all_disabled_yields_empty_string() {
        let scopes = Scopes::empty().with("bits:read", false);
        assert_eq!(scopes.joined(), "");
        assert!(!scopes.is_enabled("bits:read"));
    }

    #[test]
    fn deserializes_in_document_order() {
        let scopes: Scopes = serde_json::from_str(
            r#"{"user:read:email": true, "bits:read": true, "analytics:read:games": false, "chat:read": true}"#,
        )
        .unwrap();
        assert_eq!(scopes.joined(), "user:read:email+bits:read+chat:read");
    }

    #[test]
    fn set_overrides_in_place() {
        let scopes: Scopes = [("a", true), ("b", true), ("a", false)].into_iter().collect();
        assert_eq!(scopes.joined(), "b");
    }
}
