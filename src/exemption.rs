use axum::http::Method;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised while building or validating the exemption table at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExemptionError {
    #[error("malformed exemption rule '{0}', expected 'METHOD /path'")]
    Malformed(String),

    #[error("exemption rule {method} {path} does not match any registered route")]
    UnknownRoute { method: Method, path: String },
}

/// ExemptionTable
///
/// Exact `(method, path template)` pairs for which identity resolution is skipped.
/// Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemptionTable {
    rules: HashMap<Method, HashSet<String>>,
}

impl Default for ExemptionTable {
    /// `POST /users`: first-time account creation, where the caller has no internal
    /// record yet.
    fn default() -> Self {
        Self::new([(Method::POST, "/users")])
    }
}

impl ExemptionTable {
    pub fn new<I, P>(rules: I) -> Self
    where
        I: IntoIterator<Item = (Method, P)>,
        P: Into<String>,
    {
        let mut table = Self {
            rules: HashMap::new(),
        };
        for (method, path) in rules {
            table.insert(method, path.into());
        }
        table
    }

    fn insert(&mut self, method: Method, path: String) {
        self.rules.entry(method).or_default().insert(path);
    }

    /// Parses the configuration form `"POST /users, PUT /users/{id}"`.
    pub fn parse(raw: &str) -> Result<Self, ExemptionError> {
        let mut table = Self {
            rules: HashMap::new(),
        };

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.split_whitespace();
            let (Some(method), Some(path), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(ExemptionError::Malformed(entry.to_string()));
            };
            if !path.starts_with('/') {
                return Err(ExemptionError::Malformed(entry.to_string()));
            }
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| ExemptionError::Malformed(entry.to_string()))?;
            table.insert(method, path.to_string());
        }

        Ok(table)
    }

    pub fn is_exempt(&self, method: &Method, path: &str) -> bool {
        self.rules
            .get(method)
            .is_some_and(|paths| paths.contains(path))
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks every rule against the registered route table so a renamed route cannot
    /// silently stop matching.
    pub fn validate_against(&self, routes: &[(Method, &str)]) -> Result<(), ExemptionError> {
        let rules = self
            .rules
            .iter()
            .flat_map(|(method, paths)| paths.iter().map(move |path| (method, path)));

        for (method, path) in rules {
            let registered = routes
                .iter()
                .any(|(route_method, route_path)| route_method == method && route_path == path);
            if !registered {
                return Err(ExemptionError::UnknownRoute {
                    method: method.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exempts_account_creation_only() {
        let table = ExemptionTable::default();
        assert!(table.is_exempt(&Method::POST, "/users"));
        assert!(!table.is_exempt(&Method::GET, "/users"));
        assert!(!table.is_exempt(&Method::POST, "/users/"));
        assert!(!table.is_exempt(&Method::POST, "/users/{id}"));
    }

    #[test]
    fn test_parse() {
        let table = ExemptionTable::parse("post /users,  PUT /users/{id} ,").unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.is_exempt(&Method::POST, "/users"));
        assert!(table.is_exempt(&Method::PUT, "/users/{id}"));
        assert!(!table.is_exempt(&Method::PUT, "/users"));
    }

    #[test]
    fn test_same_method_multiple_paths() {
        let table = ExemptionTable::parse("POST /users, POST /users/{id}, POST /users").unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.is_exempt(&Method::POST, "/users"));
        assert!(table.is_exempt(&Method::POST, "/users/{id}"));
        assert!(!table.is_exempt(&Method::GET, "/users/{id}"));
    }

    #[test]
    fn test_parse_empty_is_empty_table() {
        assert!(ExemptionTable::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(
            ExemptionTable::parse("POST"),
            Err(ExemptionError::Malformed("POST".to_string()))
        );
        assert_eq!(
            ExemptionTable::parse("POST users"),
            Err(ExemptionError::Malformed("POST users".to_string()))
        );
        assert_eq!(
            ExemptionTable::parse("POST /users extra"),
            Err(ExemptionError::Malformed("POST /users extra".to_string()))
        );
    }

    #[test]
    fn test_validate_against_routes() {
        let routes = [(Method::POST, "/users"), (Method::GET, "/users/{id}")];
        assert!(ExemptionTable::default().validate_against(&routes).is_ok());

        let stale = ExemptionTable::new([(Method::POST, "/accounts")]);
        assert_eq!(
            stale.validate_against(&routes),
            Err(ExemptionError::UnknownRoute {
                method: Method::POST,
                path: "/accounts".to_string()
            })
        );
    }
}
