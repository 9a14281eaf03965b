use panos_api::PanosClient;

use super::{location_and_vsys, location_param, vsys_param};
use crate::error::ToolError;
use crate::handlers::{ToolDescriptor, ToolHandler, ToolInvocation, ToolOutput};

/// `retrieve_address_objects`
///
/// With an automatic location, a Panorama is swept scope by scope (shared
/// first, then every device group); a firewall is read at the given vsys.
pub struct AddressObjectsTool {
    client: PanosClient,
}

impl AddressObjectsTool {
    pub fn new(client: PanosClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ToolHandler for AddressObjectsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "retrieve_address_objects",
            "Retrieve address objects from a Palo Alto Networks firewall or Panorama",
            "address objects",
        )
        .param(location_param())
        .param(vsys_param())
    }

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let (location, vsys) = location_and_vsys(invocation)?;
        let records = self.client.get_address_objects(&location, vsys).await?;
        Ok(ToolOutput::Records(records))
    }
}
