//! Notification template system.
//!
//! This module provides:
//! - Template definition keyed by event type and channel, with `{{variable}}`
//!   placeholders in subject and body
//! - In-memory template storage with CRUD operations and channel resolution
//! - Variable substitution engine with lenient and strict rendering
//!
//! # Example
//!
//! ```ignore
//! let store = TemplateStore::new();
//! store.create(Template {
//!     id: "invoice-overdue-email".to_string(),
//!     name: "Invoice overdue".to_string(),
//!     event_type: "invoices.overdue".to_string(),
//!     channels: vec![Channel::Email],
//!     subject: "Invoice {{invoice_number}} is overdue".to_string(),
//!     body: "{{amount}} was due on {{due_date}}".to_string(),
//!     ..
//! })?;
//!
//! let template = store.resolve("invoices.overdue", Channel::Email)?;
//! let message = store.render(&template, &event.payload)?;
//! ```

mod store;
mod substitution;
mod types;

use std::sync::Arc;

use crate::config::TemplateConfig;

pub use store::TemplateStore;
pub use substitution::{render_template, substitute};
pub use types::{
    CreateTemplateRequest, RenderMode, RenderedMessage, Template, TemplateError,
    TemplateListResponse, TemplateResult, UpdateTemplateRequest,
};

/// Create the template store from configuration, loading the seed file if set.
pub fn create_template_store(config: &TemplateConfig) -> TemplateResult<Arc<TemplateStore>> {
    let mode = if config.strict {
        RenderMode::Strict
    } else {
        RenderMode::Lenient
    };
    let store = TemplateStore::with_mode(mode);

    if let Some(path) = &config.seed_file {
        store.load_seed(path)?;
    }

    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_template_store_mode() {
        let lenient = create_template_store(&TemplateConfig::default()).unwrap();
        assert_eq!(lenient.mode(), RenderMode::Lenient);

        let strict = create_template_store(&TemplateConfig {
            strict: true,
            seed_file: None,
        })
        .unwrap();
        assert_eq!(strict.mode(), RenderMode::Strict);
    }

    #[test]
    fn test_missing_seed_file_fails() {
        let result = create_template_store(&TemplateConfig {
            strict: false,
            seed_file: Some("/nonexistent/templates.json".to_string()),
        });
        assert!(matches!(result, Err(TemplateError::Seed(_))));
    }
}
