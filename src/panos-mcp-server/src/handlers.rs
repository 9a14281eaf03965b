//! Tool handler trait and the values that flow through it.

use panos_api::FirewallRecord;
use panos_mcp_types::{Tool, ToolInputSchema};
use uuid::Uuid;

use crate::error::ToolError;
use crate::params::{ParamSpec, Params};

/// Static description of a tool: name, human text and parameter schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// What the tool retrieves, e.g. `address objects`. Used in headings and
    /// failure messages.
    pub subject: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            subject: subject.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// MCP `Tool` with a JSON-Schema input schema in declaration order.
    pub fn to_tool(&self) -> Tool {
        let mut schema = ToolInputSchema::object();
        for spec in &self.params {
            schema = schema.property(&spec.name, spec.to_property());
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|s| s.required)
            .map(|s| s.name.as_str())
            .collect();
        Tool::new(&self.name, &self.description).with_schema(schema.required(required))
    }
}

/// A validated call, created per invocation.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: String,
    pub params: Params,
    pub correlation_id: Uuid,
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Record(FirewallRecord),
    Records(Vec<FirewallRecord>),
}

/// A registered tool.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}
