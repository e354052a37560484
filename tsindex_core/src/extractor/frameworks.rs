//! Framework metadata plugin pass (spec §4.1 "Framework metadata", §9
//! "Plugin registry"). A small `Vec<Box<dyn FrameworkPlugin>>` inspects
//! decorators and call expressions the core visitor already found and
//! contributes entries into a symbol's `metadata` map — no dynamic class
//! loading, plugins are compiled in.

use oxc_ast::ast::{CallExpression, Decorator, Expression};
use serde_json::{Map, Value, json};

pub trait FrameworkPlugin {
    /// Inspect a class/property/method's decorator list, contributing to
    /// `metadata` under this plugin's namespace key.
    fn on_decorators(&self, decorators: &[Decorator], metadata: &mut Map<String, Value>) {
        let _ = (decorators, metadata);
    }

    /// Inspect a call expression, returning a description of a synthesized
    /// symbol (e.g. one `createActionGroup` event becomes a method-kind
    /// symbol) when the call matches this plugin's pattern.
    fn on_call(&self, call: &CallExpression) -> Option<SynthesizedMembers> {
        let _ = call;
        None
    }
}

pub struct SynthesizedMembers {
    pub container_metadata_key: &'static str,
    pub events: Vec<String>,
}

pub struct AngularPlugin;

const ANGULAR_DECORATORS: &[&str] = &["Component", "Directive", "Injectable", "Pipe", "Input", "Output"];

impl FrameworkPlugin for AngularPlugin {
    fn on_decorators(&self, decorators: &[Decorator], metadata: &mut Map<String, Value>) {
        let mut matched = Vec::new();
        for dec in decorators {
            if let Some(name) = decorator_name(dec) {
                if ANGULAR_DECORATORS.contains(&name.as_str()) {
                    matched.push(name);
                }
            }
        }
        if !matched.is_empty() {
            metadata.insert("angular".to_string(), json!({ "decorators": matched }));
        }
    }
}

pub struct NgRxPlugin;

impl FrameworkPlugin for NgRxPlugin {
    fn on_decorators(&self, decorators: &[Decorator], metadata: &mut Map<String, Value>) {
        if decorators.iter().any(|d| decorator_name(d).as_deref() == Some("Effect")) {
            metadata.insert("ngrx".to_string(), json!({ "isEffect": true }));
        }
    }

    fn on_call(&self, call: &CallExpression) -> Option<SynthesizedMembers> {
        let callee_name = callee_identifier(call)?;
        match callee_name.as_str() {
            "createActionGroup" => {
                let events = extract_event_names(call);
                if events.is_empty() {
                    return None;
                }
                Some(SynthesizedMembers {
                    container_metadata_key: "ngrx",
                    events,
                })
            }
            _ => None,
        }
    }
}

fn decorator_name(dec: &Decorator) -> Option<String> {
    match &dec.expression {
        Expression::Identifier(id) => Some(id.name.to_string()),
        Expression::CallExpression(call) => callee_identifier(call),
        _ => None,
    }
}

fn callee_identifier(call: &CallExpression) -> Option<String> {
    match &call.callee {
        Expression::Identifier(id) => Some(id.name.to_string()),
        _ => None,
    }
}

/// Pull event names out of `createActionGroup({ source, events: { 'load': props<...>() } })`'s
/// second config-object argument. Event keys are camel-cased per spec §4.1.
fn extract_event_names(call: &CallExpression) -> Vec<String> {
    let Some(Expression::ObjectExpression(obj)) = call.arguments.first().and_then(|a| a.as_expression())
    else {
        return Vec::new();
    };

    for prop in &obj.properties {
        if let oxc_ast::ast::ObjectPropertyKind::ObjectProperty(p) = prop {
            let is_events_key = matches!(
                &p.key,
                oxc_ast::ast::PropertyKey::StaticIdentifier(id) if id.name == "events"
            );
            if is_events_key {
                if let Expression::ObjectExpression(events_obj) = &p.value {
                    return events_obj
                        .properties
                        .iter()
                        .filter_map(|ep| match ep {
                            oxc_ast::ast::ObjectPropertyKind::ObjectProperty(ev) => {
                                property_key_name(&ev.key).map(|n| camel_case_event(&n))
                            }
                            _ => None,
                        })
                        .collect();
                }
            }
        }
    }
    Vec::new()
}

fn property_key_name(key: &oxc_ast::ast::PropertyKey) -> Option<String> {
    match key {
        oxc_ast::ast::PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
        oxc_ast::ast::PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
        _ => None,
    }
}

/// `"[Cart] Add Item"` -> `addItem` — the camelCase virtual-method name
/// `createActionGroup` generates for each event.
fn camel_case_event(raw: &str) -> String {
    let trimmed = raw
        .rsplit(']')
        .next()
        .unwrap_or(raw)
        .trim();
    let mut words = trimmed.split_whitespace();
    let mut out = String::new();
    if let Some(first) = words.next() {
        out.push_str(&first.to_lowercase());
    }
    for word in words {
        let mut chars = word.chars();
        if let Some(c) = chars.next() {
            out.extend(c.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

pub fn default_plugins() -> Vec<Box<dyn FrameworkPlugin>> {
    vec![Box::new(AngularPlugin), Box::new(NgRxPlugin)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_cases_bracketed_event_descriptions() {
        assert_eq!(camel_case_event("[Cart] Add Item"), "addItem");
        assert_eq!(camel_case_event("Load Users"), "loadUsers");
    }
}
