//! Configuration scopes and the XPaths that address them.

use std::str::FromStr;

use crate::{PanosError, Result};

/// The single device entry every PAN-OS configuration tree hangs off.
pub const DEVICE_ENTRY_XPATH: &str = "/config/devices/entry[@name='localhost.localdomain']";

/// The `location` argument of the retrieval tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The virtual system named by the separate `vsys` argument.
    Vsys,
    Shared,
    DeviceGroup(String),
    /// Anything else, typically the firewall hostname.
    Auto,
}

impl Location {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("vsys") {
            return Self::Vsys;
        }
        if value.eq_ignore_ascii_case("shared") {
            return Self::Shared;
        }
        match value.split_once(':') {
            Some((prefix, name)) if prefix.eq_ignore_ascii_case("device-group") => {
                Self::DeviceGroup(name.trim().to_string())
            }
            _ => Self::Auto,
        }
    }

    /// Fixed scope for this location, or `None` when the caller has to
    /// detect the target kind first.
    pub fn resolve(&self, vsys: &str) -> Result<Option<Scope>> {
        match self {
            Self::Vsys => Scope::vsys(vsys).map(Some),
            Self::Shared => Ok(Some(Scope::Shared)),
            Self::DeviceGroup(name) => Scope::device_group(name).map(Some),
            Self::Auto => Ok(None),
        }
    }
}

impl FromStr for Location {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// A resolved place in the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Shared,
    Vsys(String),
    DeviceGroup(String),
}

impl Scope {
    pub fn vsys(name: &str) -> Result<Self> {
        Ok(Self::Vsys(checked_name("vsys", name)?))
    }

    pub fn device_group(name: &str) -> Result<Self> {
        Ok(Self::DeviceGroup(checked_name("location", name)?))
    }

    /// XPath of `leaf` (e.g. `address`) inside this scope.
    pub fn xpath(&self, leaf: &str) -> String {
        match self {
            Self::Shared => format!("/config/shared/{leaf}"),
            Self::Vsys(name) => format!("{DEVICE_ENTRY_XPATH}/vsys/entry[@name='{name}']/{leaf}"),
            Self::DeviceGroup(name) => {
                format!("{DEVICE_ENTRY_XPATH}/device-group/entry[@name='{name}']/{leaf}")
            }
        }
    }

    /// XPath of the security rules. Shared and device-group scopes read the
    /// Panorama pre-rulebase.
    pub fn security_rules_xpath(&self) -> String {
        match self {
            Self::Vsys(_) => self.xpath("rulebase/security/rules"),
            Self::Shared | Self::DeviceGroup(_) => self.xpath("pre-rulebase/security/rules"),
        }
    }

    /// Value of the `location` field on records fetched through this scope.
    pub fn label(&self) -> String {
        match self {
            Self::Shared => "shared".to_string(),
            Self::Vsys(name) => format!("vsys:{name}"),
            Self::DeviceGroup(name) => format!("device-group:{name}"),
        }
    }
}

/// XPath listing the Panorama device groups.
pub(crate) fn device_groups_xpath() -> String {
    format!("{DEVICE_ENTRY_XPATH}/device-group")
}

fn checked_name(param: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PanosError::invalid(param, "empty name"));
    }
    if name.contains('\'') {
        return Err(PanosError::invalid(param, "name must not contain a single quote"));
    }
    Ok(name.to_string())
}
