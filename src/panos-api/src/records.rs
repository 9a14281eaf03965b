//! Flat records built from configuration entries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::xml::XmlElement;

/// Returned when `show system info` yields no fields.
pub const NO_SYSTEM_INFO: &str = "Connected to firewall, but no detailed system information available";

const ADDRESS_TYPES: [&str; 4] = ["ip-netmask", "ip-range", "fqdn", "ip-wildcard"];
const ZONE_MODES: [&str; 5] = ["layer3", "layer2", "virtual-wire", "tap", "external"];

/// A single field of a [`FirewallRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Ordered field name to value mapping. Insertion order is rendering order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FirewallRecord {
    fields: IndexMap<String, FieldValue>,
}

impl FirewallRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Scalar value of `name`, `None` for lists and missing fields.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::Scalar(value) => Some(value),
            FieldValue::List(_) => None,
        }
    }

    /// List value of `name`, `None` for scalars and missing fields.
    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.fields.get(name)? {
            FieldValue::List(values) => Some(values),
            FieldValue::Scalar(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.scalar("name")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Flatten an op-command `show system info` result.
///
/// `result` is the `<result>` element; fields come from its `system` child
/// when present.
pub fn parse_system_info(result: &XmlElement) -> FirewallRecord {
    let source = result.child("system").unwrap_or(result);
    let mut record = FirewallRecord::new();
    for child in &source.children {
        record.insert(&child.name, child.text.as_str());
    }
    if record.is_empty() {
        record.insert("status", NO_SYSTEM_INFO);
    }
    record
}

/// Build an address record from an `<entry>`.
pub fn parse_address_entry(entry: &XmlElement) -> FirewallRecord {
    let (kind, value) = ADDRESS_TYPES
        .iter()
        .find_map(|kind| entry.child(kind).map(|node| (*kind, node.text.clone())))
        .unwrap_or(("unknown", String::new()));

    let mut record = FirewallRecord::new()
        .with("name", entry_name(entry))
        .with("type", kind)
        .with("value", value);
    if let Some(description) = entry.child("description").and_then(XmlElement::text_opt) {
        record.insert("description", description);
    }
    let tags = members_of(entry, "tag");
    if !tags.is_empty() {
        record.insert("tags", tags);
    }
    record
}

/// Build a zone record from an `<entry>`.
pub fn parse_zone_entry(entry: &XmlElement) -> FirewallRecord {
    let network = entry.child("network");
    let mode = network.and_then(|network| {
        ZONE_MODES
            .iter()
            .find_map(|mode| network.child(mode).map(|node| (*mode, node)))
    });
    let (kind, interfaces) = match mode {
        Some(("external", _)) => ("external", Vec::new()),
        Some((kind, node)) => (kind, node.members()),
        None => ("unknown", Vec::new()),
    };
    FirewallRecord::new()
        .with("name", entry_name(entry))
        .with("type", kind)
        .with("interfaces", interfaces)
}

/// Build a security rule record from an `<entry>`.
pub fn parse_policy_entry(entry: &XmlElement) -> FirewallRecord {
    let action = entry
        .child("action")
        .map(|node| node.text.clone())
        .unwrap_or_default();
    let disabled = entry.child("disabled").and_then(XmlElement::text_opt) == Some("yes");

    let mut record = FirewallRecord::new()
        .with("name", entry_name(entry))
        .with("source_zones", members_of(entry, "from"))
        .with("destination_zones", members_of(entry, "to"))
        .with("source_addresses", members_of(entry, "source"))
        .with("destination_addresses", members_of(entry, "destination"))
        .with("applications", members_of(entry, "application"))
        .with("services", members_of(entry, "service"))
        .with("action", action)
        .with("enabled", if disabled { "no" } else { "yes" })
        .with("tags", members_of(entry, "tag"));
    if let Some(description) = entry.child("description").and_then(XmlElement::text_opt) {
        record.insert("description", description);
    }
    record
}

fn entry_name(entry: &XmlElement) -> String {
    entry.attr("name").unwrap_or_default().to_string()
}

fn members_of(entry: &XmlElement, child: &str) -> Vec<String> {
    entry.child(child).map(XmlElement::members).unwrap_or_default()
}
