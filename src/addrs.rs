//! Addresses for resources and resource instances.
//!
//! Every state and diff lookup is keyed by a [`ResourceInstanceAddress`].
//! Addresses render in the familiar dotted form, for example
//! `module.network["eu"].aws_subnet.private[0]` or `data.aws_ami.base`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Whether a resource is a managed object or a read-only lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    /// A real object whose lifecycle is managed by the plan.
    Managed,
    /// A read-only external lookup.
    Data,
}

/// Key distinguishing one instance of a multi-instance resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceKey {
    /// Numeric index (`count`).
    Int(i64),
    /// String key (`for_each`).
    Str(String),
}

/// One step of a module path, e.g. `module.network["eu"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleStep {
    /// Module call name.
    pub name: String,
    /// Instance key of the module call, if expanded.
    pub key: Option<InstanceKey>,
}

/// A resource within its module, without instance key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resource {
    /// Managed or data.
    pub mode: ResourceMode,
    /// Resource type, e.g. `aws_instance`.
    pub type_name: String,
    /// Local name, e.g. `web`.
    pub name: String,
}

/// Configuration-level address of a resource: module path without keys.
///
/// Used by `depends_on`, which cannot name individual instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigResourceAddress {
    /// Module call names from the root.
    pub module: Vec<String>,
    /// The resource.
    pub resource: Resource,
}

/// Globally unique address of one resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceInstanceAddress {
    /// Module instance path from the root.
    pub module: Vec<ModuleStep>,
    /// The resource.
    pub resource: Resource,
    /// Instance key, if the resource is expanded.
    pub key: Option<InstanceKey>,
}

/// Something a resource configuration refers to within its own module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    /// Referenced resource.
    pub resource: Resource,
    /// Referenced instance key, if the reference names one instance.
    pub key: Option<InstanceKey>,
}

impl Resource {
    /// Creates a managed resource.
    #[must_use]
    pub fn managed(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mode: ResourceMode::Managed,
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    /// Creates a data resource.
    #[must_use]
    pub fn data(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mode: ResourceMode::Data,
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    /// Returns the root-module instance address with no key.
    #[must_use]
    pub fn instance(self) -> ResourceInstanceAddress {
        ResourceInstanceAddress {
            module: Vec::new(),
            resource: self,
            key: None,
        }
    }
}

impl ResourceInstanceAddress {
    /// Returns the same address with the given instance key.
    #[must_use]
    pub fn with_key(mut self, key: InstanceKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Returns the resource mode.
    #[must_use]
    pub const fn mode(&self) -> ResourceMode {
        self.resource.mode
    }

    /// Returns the module call names from the root, without keys.
    #[must_use]
    pub fn module_path(&self) -> Vec<String> {
        self.module.iter().map(|s| s.name.clone()).collect()
    }

    /// Returns the configuration-level address of the containing resource.
    #[must_use]
    pub fn config_resource(&self) -> ConfigResourceAddress {
        ConfigResourceAddress {
            module: self.module_path(),
            resource: self.resource.clone(),
        }
    }
}

impl ConfigResourceAddress {
    /// Resolves an address written inside the module at `module` to its
    /// address from the root. `module.db.aws_db.main` written in
    /// `module.app` names `module.app.module.db.aws_db.main`.
    #[must_use]
    pub fn resolve_in(&self, module: &[String]) -> Self {
        Self {
            module: module.iter().chain(&self.module).cloned().collect(),
            resource: self.resource.clone(),
        }
    }
}

impl Reference {
    /// Returns true if this reference points at the given instance, either
    /// directly or through its containing resource.
    #[must_use]
    pub fn targets(&self, addr: &ResourceInstanceAddress) -> bool {
        if self.resource != addr.resource {
            return false;
        }
        match &self.key {
            None => true,
            Some(key) => addr.key.as_ref() == Some(key),
        }
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "[{i}]"),
            Self::Str(s) => write!(f, "[\"{s}\"]"),
        }
    }
}

impl fmt::Display for ResourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Managed => "managed",
            Self::Data => "data",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mode == ResourceMode::Data {
            write!(f, "data.")?;
        }
        write!(f, "{}.{}", self.type_name, self.name)
    }
}

impl fmt::Display for ConfigResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.module {
            write!(f, "module.{name}.")?;
        }
        write!(f, "{}", self.resource)
    }
}

impl fmt::Display for ResourceInstanceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.module {
            write!(f, "module.{}", step.name)?;
            if let Some(key) = &step.key {
                write!(f, "{key}")?;
            }
            write!(f, ".")?;
        }
        write!(f, "{}", self.resource)?;
        if let Some(key) = &self.key {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        if let Some(key) = &self.key {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Splits a dotted address into segments, keeping bracketed keys attached
/// to the segment before them. Dots inside quoted keys are not separators.
fn split_segments(input: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_brackets = false;
    let mut in_quotes = false;

    for (i, c) in input.char_indices() {
        match c {
            '"' if in_brackets => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            '.' if !in_brackets => {
                segments.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&input[start..]);
    segments
}

/// Parses `name` or `name[key]` into its parts.
fn parse_keyed(segment: &str, whole: &str) -> Result<(String, Option<InstanceKey>), ConfigError> {
    let Some(open) = segment.find('[') else {
        return Ok((segment.to_string(), None));
    };

    let name = &segment[..open];
    let rest = &segment[open + 1..];
    let Some(inner) = rest.strip_suffix(']') else {
        return Err(ConfigError::invalid_address(whole, "unterminated instance key"));
    };

    let key = if let Some(quoted) = inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        InstanceKey::Str(quoted.to_string())
    } else {
        inner
            .parse::<i64>()
            .map(InstanceKey::Int)
            .map_err(|_| ConfigError::invalid_address(whole, "instance key must be an integer or a quoted string"))?
    };

    Ok((name.to_string(), Some(key)))
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Parses the module prefix and the resource part of an address.
fn parse_parts(
    input: &str,
) -> Result<(Vec<ModuleStep>, Resource, Option<InstanceKey>), ConfigError> {
    let segments = split_segments(input);
    let mut idx = 0;
    let mut module = Vec::new();

    while segments.get(idx) == Some(&"module") {
        let Some(call) = segments.get(idx + 1) else {
            return Err(ConfigError::invalid_address(input, "module call name missing"));
        };
        let (name, key) = parse_keyed(call, input)?;
        if !is_valid_identifier(&name) {
            return Err(ConfigError::invalid_address(input, "invalid module name"));
        }
        module.push(ModuleStep { name, key });
        idx += 2;
    }

    let mode = if segments.get(idx) == Some(&"data") {
        idx += 1;
        ResourceMode::Data
    } else {
        ResourceMode::Managed
    };

    let remaining = &segments[idx.min(segments.len())..];
    let [type_name, name] = remaining else {
        return Err(ConfigError::invalid_address(input, "expected <type>.<name>"));
    };

    let (name, key) = parse_keyed(name, input)?;
    if !is_valid_identifier(type_name) || !is_valid_identifier(&name) {
        return Err(ConfigError::invalid_address(input, "invalid resource type or name"));
    }

    let resource = Resource {
        mode,
        type_name: (*type_name).to_string(),
        name,
    };

    Ok((module, resource, key))
}

impl FromStr for ResourceInstanceAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, resource, key) = parse_parts(s.trim())?;
        Ok(Self { module, resource, key })
    }
}

impl FromStr for ConfigResourceAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, resource, key) = parse_parts(s.trim())?;
        if key.is_some() || module.iter().any(|m| m.key.is_some()) {
            return Err(ConfigError::invalid_address(s, "resource addresses cannot carry instance keys"));
        }
        Ok(Self {
            module: module.into_iter().map(|m| m.name).collect(),
            resource,
        })
    }
}

impl FromStr for Reference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, resource, key) = parse_parts(s.trim())?;
        if !module.is_empty() {
            return Err(ConfigError::invalid_address(s, "references must be local to the module"));
        }
        Ok(Self { resource, key })
    }
}

macro_rules! string_conversions {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.to_string()
            }
        }
    };
}

string_conversions!(ResourceInstanceAddress);
string_conversions!(ConfigResourceAddress);
string_conversions!(Reference);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root_managed() {
        let addr: ResourceInstanceAddress = "aws_instance.web".parse().expect("parse");
        assert!(addr.module.is_empty());
        assert_eq!(addr.mode(), ResourceMode::Managed);
        assert_eq!(addr.resource.type_name, "aws_instance");
        assert_eq!(addr.resource.name, "web");
        assert_eq!(addr.key, None);
    }

    #[test]
    fn test_parse_module_and_keys() {
        let input = "module.net[\"eu.west\"].module.sub.aws_subnet.private[2]";
        let addr: ResourceInstanceAddress = input.parse().expect("parse");
        assert_eq!(addr.module.len(), 2);
        assert_eq!(addr.module[0].key, Some(InstanceKey::Str(String::from("eu.west"))));
        assert_eq!(addr.key, Some(InstanceKey::Int(2)));
        assert_eq!(addr.to_string(), input);
    }

    #[test]
    fn test_parse_data_resource() {
        let addr: ResourceInstanceAddress = "data.aws_ami.base".parse().expect("parse");
        assert_eq!(addr.mode(), ResourceMode::Data);
        assert_eq!(addr.to_string(), "data.aws_ami.base");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("aws_instance".parse::<ResourceInstanceAddress>().is_err());
        assert!("aws_instance.web[abc]".parse::<ResourceInstanceAddress>().is_err());
        assert!("module.aws_instance".parse::<ResourceInstanceAddress>().is_err());
        assert!("aws_instance.web[0".parse::<ResourceInstanceAddress>().is_err());
    }

    #[test]
    fn test_config_resource_rejects_keys() {
        assert!("aws_instance.web[0]".parse::<ConfigResourceAddress>().is_err());
        let cfg: ConfigResourceAddress = "module.a.aws_instance.web".parse().expect("parse");
        assert_eq!(cfg.module, vec![String::from("a")]);
    }

    #[test]
    fn test_config_resource_drops_module_keys() {
        let addr: ResourceInstanceAddress = "module.a[1].aws_instance.web[0]".parse().expect("parse");
        assert_eq!(addr.config_resource().to_string(), "module.a.aws_instance.web");
    }

    #[test]
    fn test_resolve_in_module() {
        let local: ConfigResourceAddress = "aws_subnet.main".parse().expect("parse");
        let child: ConfigResourceAddress = "module.db.aws_db.main".parse().expect("parse");
        let module = vec![String::from("app")];

        assert_eq!(local.resolve_in(&module).to_string(), "module.app.aws_subnet.main");
        assert_eq!(child.resolve_in(&module).to_string(), "module.app.module.db.aws_db.main");
        assert_eq!(local.resolve_in(&[]), local);
    }

    #[test]
    fn test_reference_targets() {
        let addr: ResourceInstanceAddress = "aws_instance.web[1]".parse().expect("parse");
        let whole: Reference = "aws_instance.web".parse().expect("parse");
        let same: Reference = "aws_instance.web[1]".parse().expect("parse");
        let other_key: Reference = "aws_instance.web[0]".parse().expect("parse");
        let other: Reference = "aws_instance.db".parse().expect("parse");

        assert!(whole.targets(&addr));
        assert!(same.targets(&addr));
        assert!(!other_key.targets(&addr));
        assert!(!other.targets(&addr));
    }

    #[test]
    fn test_serde_as_string() {
        let addr: ResourceInstanceAddress = "aws_instance.web[\"a\"]".parse().expect("parse");
        let json = serde_json::to_string(&addr).expect("serialize");
        assert_eq!(json, "\"aws_instance.web[\\\"a\\\"]\"");
        let back: ResourceInstanceAddress = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, addr);
    }
}
