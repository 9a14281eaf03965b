use panos_api::PanosClient;

use super::{location_and_vsys, location_param, vsys_param};
use crate::error::ToolError;
use crate::handlers::{ToolDescriptor, ToolHandler, ToolInvocation, ToolOutput};

/// `retrieve_security_policies`
///
/// Shared and device-group locations read the Panorama pre-rulebase.
pub struct SecurityPoliciesTool {
    client: PanosClient,
}

impl SecurityPoliciesTool {
    pub fn new(client: PanosClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ToolHandler for SecurityPoliciesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "retrieve_security_policies",
            "Retrieve security policies from a Palo Alto Networks firewall or Panorama",
            "security policies",
        )
        .param(location_param())
        .param(vsys_param())
    }

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let (location, vsys) = location_and_vsys(invocation)?;
        let records = self.client.get_security_policies(&location, vsys).await?;
        Ok(ToolOutput::Records(records))
    }
}
