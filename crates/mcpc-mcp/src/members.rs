//! Member descriptors: the tools, prompts and resources a server advertises.

use rmcp::model::{Prompt, Resource, Tool};

/// The three kinds of server members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Tool,
    Prompt,
    Resource,
}

impl MemberKind {
    /// All kinds in listing order.
    pub const ALL: [MemberKind; 3] = [MemberKind::Tool, MemberKind::Prompt, MemberKind::Resource];

    /// Plural section label, e.g. `"tools"`.
    pub fn plural(self) -> &'static str {
        match self {
            MemberKind::Tool => "tools",
            MemberKind::Prompt => "prompts",
            MemberKind::Resource => "resources",
        }
    }
}

/// One advertised member. Read-only to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDescriptor {
    pub kind: MemberKind,
    pub name: String,
    /// Empty when the server gave no description.
    pub description: String,
    /// Tool input schema; for prompts, a schema built from the declared
    /// arguments; `null` for resources.
    pub input_schema: serde_json::Value,
    /// Resource URI (resources only).
    pub uri: Option<String>,
    /// Resource MIME type, when declared.
    pub mime_type: Option<String>,
}

/// Everything a server advertises, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerMembers {
    pub tools: Vec<MemberDescriptor>,
    pub prompts: Vec<MemberDescriptor>,
    pub resources: Vec<MemberDescriptor>,
}

impl ServerMembers {
    /// Members of one kind.
    pub fn of_kind(&self, kind: MemberKind) -> &[MemberDescriptor] {
        match kind {
            MemberKind::Tool => &self.tools,
            MemberKind::Prompt => &self.prompts,
            MemberKind::Resource => &self.resources,
        }
    }

    /// Total number of members across all kinds.
    pub fn len(&self) -> usize {
        self.tools.len() + self.prompts.len() + self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Tool> for MemberDescriptor {
    fn from(tool: Tool) -> Self {
        Self {
            kind: MemberKind::Tool,
            name: tool.name.to_string(),
            description: tool.description.as_deref().unwrap_or_default().to_string(),
            input_schema: serde_json::Value::Object(tool.input_schema.as_ref().clone()),
            uri: None,
            mime_type: None,
        }
    }
}

impl From<Prompt> for MemberDescriptor {
    /// Prompt arguments are all strings; they become an object schema.
    fn from(prompt: Prompt) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for arg in prompt.arguments.unwrap_or_default() {
            let mut prop = serde_json::json!({"type": "string"});
            if let Some(desc) = arg.description {
                prop["description"] = serde_json::Value::String(desc);
            }
            if arg.required.unwrap_or(false) {
                required.push(serde_json::Value::String(arg.name.clone()));
            }
            properties.insert(arg.name, prop);
        }
        Self {
            kind: MemberKind::Prompt,
            name: prompt.name,
            description: prompt.description.unwrap_or_default(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
            uri: None,
            mime_type: None,
        }
    }
}

impl From<Resource> for MemberDescriptor {
    fn from(resource: Resource) -> Self {
        let raw = resource.raw;
        let name = if raw.name.is_empty() {
            raw.uri.clone()
        } else {
            raw.name
        };
        Self {
            kind: MemberKind::Resource,
            name,
            description: raw.description.unwrap_or_default(),
            input_schema: serde_json::Value::Null,
            uri: Some(raw.uri),
            mime_type: raw.mime_type,
        }
    }
}
