//! The PAN-OS tools.

mod address_objects;
mod security_policies;
mod security_zones;
mod system_info;

use std::sync::Arc;

use panos_api::{DEFAULT_VSYS, Location, PanosClient};

use crate::error::ToolError;
use crate::handlers::{ToolHandler, ToolInvocation};
use crate::params::ParamSpec;

pub use address_objects::AddressObjectsTool;
pub use security_policies::SecurityPoliciesTool;
pub use security_zones::SecurityZonesTool;
pub use system_info::SystemInfoTool;

/// All tools, in the order `tools/list` reports them.
pub fn panos_tools(client: &PanosClient) -> Vec<Arc<dyn ToolHandler>> {
    vec![
        Arc::new(SystemInfoTool::new(client.clone())),
        Arc::new(AddressObjectsTool::new(client.clone())),
        Arc::new(SecurityZonesTool::new(client.clone())),
        Arc::new(SecurityPoliciesTool::new(client.clone())),
    ]
}

fn location_param() -> ParamSpec {
    ParamSpec::string("location")
        .required()
        .description(
            "Configuration scope: 'vsys', 'shared', 'device-group:<name>', \
             or the firewall hostname to detect Panorama automatically",
        )
}

fn vsys_param() -> ParamSpec {
    ParamSpec::string("vsys")
        .default_value(DEFAULT_VSYS)
        .description("Virtual system identifier")
}

/// `(location, vsys)` of a validated invocation.
fn location_and_vsys(invocation: &ToolInvocation) -> Result<(Location, &str), ToolError> {
    let location = Location::parse(invocation.params.require("location")?);
    let vsys = invocation.params.get("vsys").unwrap_or(DEFAULT_VSYS);
    Ok((location, vsys))
}
