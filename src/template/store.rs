use std::path::Path;

use chrono::Utc;
use dashmap::DashMap;

use super::substitution::render_template;
use super::types::{
    RenderMode, RenderedMessage, Template, TemplateError, TemplateResult, UpdateTemplateRequest,
};
use crate::notification::Channel;

/// In-memory template storage
pub struct TemplateStore {
    templates: DashMap<String, Template>,
    mode: RenderMode,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    /// Create a new, lenient template store
    pub fn new() -> Self {
        Self::with_mode(RenderMode::Lenient)
    }

    pub fn with_mode(mode: RenderMode) -> Self {
        Self {
            templates: DashMap::new(),
            mode,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Create a new template
    pub fn create(&self, template: Template) -> TemplateResult<Template> {
        template.validate()?;

        match self.templates.entry(template.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(TemplateError::AlreadyExists(template.id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(template.clone());
                Ok(template)
            }
        }
    }

    /// Get a template by ID
    pub fn get(&self, id: &str) -> TemplateResult<Template> {
        self.templates
            .get(id)
            .map(|t| t.clone())
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    /// List all templates, ordered by id
    pub fn list(&self) -> Vec<Template> {
        let mut templates: Vec<Template> = self
            .templates
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    /// Update an existing template
    pub fn update(&self, id: &str, updates: UpdateTemplateRequest) -> TemplateResult<Template> {
        let mut template = self.get(id)?;

        if let Some(name) = updates.name {
            template.name = name;
        }
        if let Some(event_type) = updates.event_type {
            template.event_type = event_type;
        }
        if let Some(channels) = updates.channels {
            template.channels = channels;
        }
        if let Some(subject) = updates.subject {
            template.subject = subject;
        }
        if let Some(body) = updates.body {
            template.body = body;
        }
        if let Some(variables) = updates.variables {
            template.variables = variables;
        }
        if let Some(description) = updates.description {
            template.description = description;
        }

        template.updated_at = Utc::now();
        template.validate()?;

        self.templates.insert(id.to_string(), template.clone());

        Ok(template)
    }

    /// Delete a template by ID
    pub fn delete(&self, id: &str) -> TemplateResult<()> {
        self.templates
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    pub fn count(&self) -> usize {
        self.templates.len()
    }

    /// Find the template for an event type on a channel.
    ///
    /// When several templates match, the one with the lowest id wins so the
    /// choice does not depend on map iteration order.
    pub fn resolve(&self, event_type: &str, channel: Channel) -> TemplateResult<Template> {
        self.templates
            .iter()
            .filter(|entry| entry.value().serves(event_type, channel))
            .min_by(|a, b| a.key().cmp(b.key()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TemplateError::NotFound(format!("{}/{}", event_type, channel)))
    }

    /// Render a template against an event payload according to the store's mode.
    pub fn render(
        &self,
        template: &Template,
        payload: &serde_json::Value,
    ) -> TemplateResult<RenderedMessage> {
        let rendered = render_template(template, payload);

        if rendered.missing_variables.is_empty() {
            return Ok(rendered);
        }

        match self.mode {
            RenderMode::Strict => Err(TemplateError::MissingVariables(rendered.missing_variables)),
            RenderMode::Lenient => {
                tracing::warn!(
                    template_id = %template.id,
                    event_type = %template.event_type,
                    missing = ?rendered.missing_variables,
                    "Template rendered with missing variables"
                );
                Ok(rendered)
            }
        }
    }

    /// Load templates from a JSON file holding an array of templates.
    ///
    /// Returns the number of templates added.
    pub fn load_seed(&self, path: impl AsRef<Path>) -> TemplateResult<usize> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TemplateError::Seed(format!("{}: {}", path.display(), e)))?;
        let templates: Vec<Template> = serde_json::from_str(&raw)
            .map_err(|e| TemplateError::Seed(format!("{}: {}", path.display(), e)))?;

        let mut loaded = 0;
        for template in templates {
            self.create(template)?;
            loaded += 1;
        }

        tracing::info!(path = %path.display(), count = loaded, "Loaded seed templates");
        Ok(loaded)
    }
}
