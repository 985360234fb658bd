//! Variable substitution engine for templates

use super::types::{RenderedMessage, Template};

/// Render a template's subject and body against an event payload.
///
/// `{{name}}` placeholders are replaced by the payload value at `name`;
/// dotted names walk nested objects (`{{customer.name}}`). Anything missing
/// renders as an empty string and is listed in `missing_variables`, together
/// with declared `variables` the payload does not carry.
pub fn render_template(template: &Template, payload: &serde_json::Value) -> RenderedMessage {
    let mut missing = Vec::new();

    for declared in &template.variables {
        if lookup(payload, declared).is_none() {
            note_missing(&mut missing, declared);
        }
    }

    let subject = substitute(&template.subject, payload, &mut missing);
    let body = substitute(&template.body, payload, &mut missing);

    RenderedMessage {
        subject,
        body,
        missing_variables: missing,
    }
}

/// Replace every `{{variable}}` in `text`, collecting unknown names.
pub fn substitute(text: &str, payload: &serde_json::Value, missing: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        let Some(close) = after_open.find("}}") else {
            // Unterminated placeholder is kept verbatim
            out.push_str(&rest[open..]);
            return out;
        };

        let name = after_open[..close].trim();
        if name.is_empty() {
            out.push_str(&rest[open..open + 2 + close + 2]);
        } else {
            match lookup(payload, name) {
                Some(value) => out.push_str(&value_to_string(value)),
                None => note_missing(missing, name),
            }
        }

        rest = &after_open[close + 2..];
    }

    out.push_str(rest);
    out
}

fn lookup<'a>(payload: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .try_fold(payload, |current, segment| match current {
            serde_json::Value::Object(map) => map.get(segment),
            serde_json::Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        })
}

fn note_missing(missing: &mut Vec<String>, name: &str) {
    if !missing.iter().any(|m| m == name) {
        missing.push(name.to_string());
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        // For arrays and objects, use JSON representation
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Channel;
    use chrono::Utc;
    use serde_json::json;

    fn template(subject: &str, body: &str, variables: &[&str]) -> Template {
        Template {
            id: "t".to_string(),
            name: "T".to_string(),
            event_type: "invoices.overdue".to_string(),
            channels: vec![Channel::Email],
            subject: subject.to_string(),
            body: body.to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_substitute_simple() {
        let mut missing = Vec::new();
        let out = substitute("Hello, {{name}}!", &json!({"name": "World"}), &mut missing);
        assert_eq!(out, "Hello, World!");
        assert!(missing.is_empty());
    }

    #[test]
    fn test_substitute_trims_and_repeats() {
        let mut missing = Vec::new();
        let out = substitute(
            "Invoice {{ number }} ({{number}}) is {{days}} days late",
            &json!({"number": "INV-1", "days": 12}),
            &mut missing,
        );
        assert_eq!(out, "Invoice INV-1 (INV-1) is 12 days late");
    }

    #[test]
    fn test_substitute_nested_path() {
        let mut missing = Vec::new();
        let out = substitute(
            "{{customer.name}} owes {{amounts.0}}",
            &json!({"customer": {"name": "Acme"}, "amounts": [120.5]}),
            &mut missing,
        );
        assert_eq!(out, "Acme owes 120.5");
    }

    #[test]
    fn test_missing_renders_empty_and_is_reported() {
        let mut missing = Vec::new();
        let out = substitute("Dear {{name}}, ref {{ref}}", &json!({"ref": "R1"}), &mut missing);
        assert_eq!(out, "Dear , ref R1");
        assert_eq!(missing, vec!["name".to_string()]);
    }

    #[test]
    fn test_null_value_is_present() {
        let mut missing = Vec::new();
        let out = substitute("[{{note}}]", &json!({"note": null}), &mut missing);
        assert_eq!(out, "[]");
        assert!(missing.is_empty());
    }

    #[test]
    fn test_unterminated_and_empty_placeholders_kept() {
        let mut missing = Vec::new();
        assert_eq!(substitute("a {{}} b", &json!({}), &mut missing), "a {{}} b");
        assert_eq!(substitute("a {{open", &json!({}), &mut missing), "a {{open");
        assert!(missing.is_empty());
    }

    #[test]
    fn test_render_reports_declared_and_referenced() {
        let t = template(
            "Invoice {{invoice_number}} overdue",
            "Amount due: {{amount}} for {{customer}}",
            &["invoice_number", "due_date"],
        );
        let rendered = render_template(&t, &json!({"invoice_number": "INV-9", "amount": 300}));

        assert_eq!(rendered.subject, "Invoice INV-9 overdue");
        assert_eq!(rendered.body, "Amount due: 300 for ");
        assert_eq!(
            rendered.missing_variables,
            vec!["due_date".to_string(), "customer".to_string()]
        );
    }
}
