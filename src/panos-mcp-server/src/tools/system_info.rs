use panos_api::PanosClient;

use crate::error::ToolError;
use crate::handlers::{ToolDescriptor, ToolHandler, ToolInvocation, ToolOutput};

/// `show_system_info`
pub struct SystemInfoTool {
    client: PanosClient,
}

impl SystemInfoTool {
    pub fn new(client: PanosClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ToolHandler for SystemInfoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "show_system_info",
            "Get system information from the Palo Alto Networks firewall",
            "system information",
        )
    }

    async fn execute(&self, _invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let record = self.client.get_system_info().await?;
        Ok(ToolOutput::Record(record))
    }
}
