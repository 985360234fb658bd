//! Template types and error definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notification::Channel;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid template ID: {0}")]
    InvalidId(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Missing template variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Failed to load templates: {0}")]
    Seed(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// How rendering treats variables absent from the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Missing variables render as empty strings and are reported
    #[default]
    Lenient,
    /// Missing variables fail the render
    Strict,
}

/// A message template for one event type on one or more channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Unique template identifier (alphanumeric, dash, underscore)
    pub id: String,

    /// Human-readable template name
    pub name: String,

    /// Event type this template renders
    pub event_type: String,

    /// Channels this template serves
    pub channels: Vec<Channel>,

    /// Subject / title with {{variable}} placeholders
    pub subject: String,

    /// Body with {{variable}} placeholders
    pub body: String,

    /// Variables the template expects in the event payload
    #[serde(default)]
    pub variables: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Validate the template
    pub fn validate(&self) -> TemplateResult<()> {
        if self.id.is_empty() || self.id.len() > 64 {
            return Err(TemplateError::InvalidId(
                "ID must be 1-64 characters".to_string(),
            ));
        }

        if !self
            .id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TemplateError::InvalidId(
                "ID must contain only alphanumeric, dash, or underscore".to_string(),
            ));
        }

        if self.name.is_empty() || self.name.len() > 256 {
            return Err(TemplateError::InvalidTemplate(
                "Name must be 1-256 characters".to_string(),
            ));
        }

        if self.event_type.is_empty() || self.event_type.len() > 128 {
            return Err(TemplateError::InvalidTemplate(
                "Event type must be 1-128 characters".to_string(),
            ));
        }

        if self.channels.is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "At least one channel is required".to_string(),
            ));
        }

        if self.subject.trim().is_empty() && self.body.trim().is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "Subject and body cannot both be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether this template serves `event_type` on `channel`
    pub fn serves(&self, event_type: &str, channel: Channel) -> bool {
        self.event_type == event_type && self.channels.contains(&channel)
    }
}

/// Request to create a new template
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub id: String,
    pub name: String,
    pub event_type: String,
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
    pub description: Option<String>,
}

impl From<CreateTemplateRequest> for Template {
    fn from(req: CreateTemplateRequest) -> Self {
        let now = Utc::now();
        Template {
            id: req.id,
            name: req.name,
            event_type: req.event_type,
            channels: req.channels,
            subject: req.subject,
            body: req.body,
            variables: req.variables,
            description: req.description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to update an existing template
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub event_type: Option<String>,
    pub channels: Option<Vec<Channel>>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub variables: Option<Vec<String>>,
    /// Use null to clear
    pub description: Option<Option<String>>,
}

/// Response for listing templates
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<Template>,
    pub total: usize,
}

/// Final subject and body for one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
    /// Variables absent from the payload, in first-seen order
    pub missing_variables: Vec<String>,
}
