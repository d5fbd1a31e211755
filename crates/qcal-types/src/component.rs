//! Qubit and coupler identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypesError, TypesResult};

/// Separator between the two qubits of a coupler label.
const COUPLER_SEPARATOR: char = '_';

/// Kind of a calibrated component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// A single transmon.
    Qubit,
    /// A tunable coupler between two qubits.
    Coupler,
}

/// A qubit (`"q16"`) or a coupler (`"q22_q23"`).
///
/// Components are identified by their label only. A coupler's qubits are
/// derived by splitting the label on `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Component(String);

impl Component {
    /// Parse and validate a component label.
    pub fn parse(label: &str) -> TypesResult<Self> {
        let invalid = |reason: &str| TypesError::InvalidComponent {
            label: label.to_string(),
            reason: reason.to_string(),
        };

        if label.is_empty() {
            return Err(invalid("label is empty"));
        }
        if label.chars().any(char::is_whitespace) {
            return Err(invalid("label contains whitespace"));
        }

        if label.contains(COUPLER_SEPARATOR) {
            let parts: Vec<&str> = label.split(COUPLER_SEPARATOR).collect();
            if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
                return Err(invalid("coupler must join exactly two qubit labels"));
            }
            if parts[0] == parts[1] {
                return Err(invalid("coupler qubits must differ"));
            }
        }

        Ok(Self(label.to_string()))
    }

    /// Create a qubit component without validation.
    pub fn qubit(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Create a coupler component from its two qubits.
    pub fn coupler(first: &Component, second: &Component) -> Self {
        Self(format!("{}{COUPLER_SEPARATOR}{}", first.0, second.0))
    }

    /// The component label.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a qubit or a coupler.
    pub fn kind(&self) -> ComponentKind {
        if self.0.contains(COUPLER_SEPARATOR) {
            ComponentKind::Coupler
        } else {
            ComponentKind::Qubit
        }
    }

    /// Check if this component is a coupler.
    pub fn is_coupler(&self) -> bool {
        self.kind() == ComponentKind::Coupler
    }

    /// Qubits making up this component.
    ///
    /// A qubit returns itself; a coupler returns its two qubits in label order.
    pub fn qubits(&self) -> Vec<Component> {
        self.0
            .split(COUPLER_SEPARATOR)
            .map(|q| Component(q.to_string()))
            .collect()
    }

    /// Check whether `qubit` is part of this component.
    pub fn involves(&self, qubit: &Component) -> bool {
        self.0
            .split(COUPLER_SEPARATOR)
            .any(|q| q == qubit.as_str())
    }

    /// Parse a list of labels, failing on the first invalid one.
    pub fn parse_all<I, S>(labels: I) -> TypesResult<Vec<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels.into_iter().map(|l| Self::parse(l.as_ref())).collect()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Component {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Component {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Component> for String {
    fn from(component: Component) -> Self {
        component.0
    }
}

impl AsRef<str> for Component {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qubit() {
        let q = Component::parse("q16").unwrap();
        assert_eq!(q.kind(), ComponentKind::Qubit);
        assert_eq!(q.qubits(), vec![Component::qubit("q16")]);
        assert_eq!(q.to_string(), "q16");
    }

    #[test]
    fn test_parse_coupler() {
        let c = Component::parse("q22_q23").unwrap();
        assert!(c.is_coupler());
        assert!(c.involves(&Component::qubit("q22")));
        assert!(c.involves(&Component::qubit("q23")));
        assert!(!c.involves(&Component::qubit("q2")));
    }

    #[test]
    fn test_coupler_constructor() {
        let c = Component::coupler(&Component::qubit("q1"), &Component::qubit("q2"));
        assert_eq!(c.as_str(), "q1_q2");
    }

    #[test]
    fn test_invalid_labels() {
        assert!(Component::parse("").is_err());
        assert!(Component::parse("q1_").is_err());
        assert!(Component::parse("q1_q2_q3").is_err());
        assert!(Component::parse("q1_q1").is_err());
        assert!(Component::parse("q 1").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let c: Component = serde_json::from_str("\"q1_q2\"").unwrap();
        assert!(c.is_coupler());
        assert!(serde_json::from_str::<Component>("\"q1__q2\"").is_err());
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"q1_q2\"");
    }
}
