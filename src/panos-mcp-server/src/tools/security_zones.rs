use panos_api::{Location, PanosClient};

use super::{location_and_vsys, location_param, vsys_param};
use crate::error::ToolError;
use crate::handlers::{ToolDescriptor, ToolHandler, ToolInvocation, ToolOutput};

/// `retrieve_security_zones`
pub struct SecurityZonesTool {
    client: PanosClient,
}

impl SecurityZonesTool {
    pub fn new(client: PanosClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ToolHandler for SecurityZonesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "retrieve_security_zones",
            "Retrieve security zones from a Palo Alto Networks firewall",
            "security zones",
        )
        .param(location_param())
        .param(vsys_param())
    }

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let (location, vsys) = location_and_vsys(invocation)?;
        // Zones only exist inside a virtual system.
        if matches!(location, Location::Shared | Location::DeviceGroup(_)) {
            return Err(ToolError::invalid(
                "location",
                "security zones are only defined per vsys",
            ));
        }
        let records = self.client.get_security_zones(vsys).await?;
        Ok(ToolOutput::Records(records))
    }
}
