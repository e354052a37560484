//! Core AST visitor: walks one parsed program, emitting symbol declarations,
//! imports, re-exports and pending (member-access) references. Usage-site
//! `Reference`s are filled in afterwards from `oxc_semantic` (see
//! `extractor::mod`) — this visitor only has to get declarations and the
//! import/export surface right.
//!
//! Each overridden `visit_*` method calls the matching `walk::walk_*` so the
//! traversal keeps going into nested scopes, the same delegation style the
//! rest of this crate's AST handling uses.

use super::frameworks::FrameworkPlugin;
use crate::line_index::LineIndex;
use crate::model::{Import, Location, Metadata, PendingReference, Position, Range, ReExport, Symbol, SymbolKind, symbol_id};
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_span::Span;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Class,
    Interface,
    Enum,
    /// An object-literal binding (`const Config = { ... }`) or a call
    /// expression assigned to one (`const Actions = createActionGroup(...)`)
    /// — keys/synthesized members nested under it record it as their
    /// container (spec §4.1 recursive object-literal symbols).
    Object,
}

struct Container {
    name: String,
    kind: ContainerKind,
}

pub(crate) struct JsVisitor<'a> {
    pub file_path: String,
    pub lines: &'a LineIndex,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<Import>,
    pub re_exports: Vec<ReExport>,
    pub pending_references: Vec<PendingReference>,
    pub exported_names: std::collections::HashSet<String>,
    /// alias -> module specifier, for `import * as NS from "m"`.
    pub namespace_imports: HashMap<String, String>,
    container_stack: Vec<Container>,
    /// `is_const` per currently-open `VariableDeclaration`, stacked to
    /// survive re-entrancy when a declarator's initializer itself contains
    /// nested variable declarations (e.g. inside a function body).
    decl_kind_stack: Vec<bool>,
    plugins: Vec<Box<dyn FrameworkPlugin>>,
}

impl<'a> JsVisitor<'a> {
    pub fn new(file_path: String, lines: &'a LineIndex) -> Self {
        Self {
            file_path,
            lines,
            symbols: Vec::new(),
            imports: Vec::new(),
            re_exports: Vec::new(),
            pending_references: Vec::new(),
            exported_names: std::collections::HashSet::new(),
            namespace_imports: HashMap::new(),
            container_stack: Vec::new(),
            decl_kind_stack: Vec::new(),
            plugins: super::frameworks::default_plugins(),
        }
    }

    fn range_of(&self, span: Span) -> Range {
        Range::new(self.lines.position_at(span.start), self.lines.position_at(span.end))
    }

    fn location_of(&self, span: Span) -> (Location, Position) {
        let pos = self.lines.position_at(span.start);
        (
            Location {
                file: self.file_path.clone(),
                position: pos,
            },
            pos,
        )
    }

    fn container_path(&self) -> Option<String> {
        if self.container_stack.is_empty() {
            None
        } else {
            Some(self.container_stack.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join("."))
        }
    }

    fn immediate_container(&self) -> (Option<String>, Option<SymbolKind>) {
        match self.container_stack.last() {
            Some(c) => (
                Some(c.name.clone()),
                Some(match c.kind {
                    ContainerKind::Class => SymbolKind::Class,
                    ContainerKind::Interface => SymbolKind::Interface,
                    ContainerKind::Enum => SymbolKind::Enum,
                    ContainerKind::Object => SymbolKind::Variable,
                }),
            ),
            None => (None, None),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_symbol(
        &mut self,
        name: &str,
        kind: SymbolKind,
        span: Span,
        is_static: Option<bool>,
        params: Option<usize>,
        is_exported: bool,
        metadata: Metadata,
    ) {
        if name.is_empty() {
            return;
        }
        let (location, pos) = self.location_of(span);
        let (container_name, container_kind) = self.immediate_container();
        let full_path = self.container_path();
        let id = symbol_id(
            &self.file_path,
            full_path.as_deref().unwrap_or(""),
            name,
            kind,
            is_static.unwrap_or(false),
            params.unwrap_or(0),
            pos.line,
            pos.column,
        );
        let is_exported = is_exported || self.exported_names.contains(name);
        self.symbols.push(Symbol {
            id,
            name: name.to_string(),
            kind,
            location,
            range: self.range_of(span),
            container_name,
            container_kind,
            full_container_path: full_path,
            is_static,
            parameters_count: params,
            is_definition: true,
            is_exported,
            metadata,
            file_path: self.file_path.clone(),
        });
    }

    fn binding_name(pat: &BindingPattern) -> Option<String> {
        match &pat.kind {
            BindingPatternKind::BindingIdentifier(id) => Some(id.name.to_string()),
            _ => None,
        }
    }

    fn module_export_name(name: &ModuleExportName) -> String {
        match name {
            ModuleExportName::IdentifierName(id) => id.name.to_string(),
            ModuleExportName::IdentifierReference(id) => id.name.to_string(),
            ModuleExportName::StringLiteral(s) => s.value.to_string(),
        }
    }

    fn decorator_metadata(&self, decorators: &[Decorator]) -> Metadata {
        let mut metadata = serde_json::Map::new();
        for plugin in &self.plugins {
            plugin.on_decorators(decorators, &mut metadata);
        }
        metadata.into_iter().collect()
    }

    fn property_key_name(key: &PropertyKey) -> Option<String> {
        match key {
            PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
            PropertyKey::PrivateIdentifier(id) => Some(id.name.to_string()),
            PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
            _ => None,
        }
    }

    fn param_count(params: &FormalParameters) -> usize {
        params.items.len()
    }

    fn enter_class(&mut self, class: &Class<'a>, is_exported: bool) {
        let name = class.id.as_ref().map(|id| id.name.to_string()).unwrap_or_default();
        if !name.is_empty() {
            let metadata = self.decorator_metadata(&class.decorators);
            self.push_symbol(&name, SymbolKind::Class, class.span, None, None, is_exported, metadata);
        }
        self.container_stack.push(Container {
            name,
            kind: ContainerKind::Class,
        });
        for member in &class.body.body {
            self.visit_class_member(member);
        }
        self.container_stack.pop();
    }

    fn visit_class_member(&mut self, member: &ClassElement<'a>) {
        match member {
            ClassElement::MethodDefinition(m) => {
                if let Some(name) = Self::property_key_name(&m.key) {
                    let params = Self::param_count(&m.value.params);
                    self.push_symbol(&name, SymbolKind::Method, m.span, Some(m.r#static), Some(params), false, Metadata::new());
                }
                if let Some(body) = &m.value.body {
                    walk::walk_function_body(self, body);
                }
            }
            ClassElement::PropertyDefinition(p) => {
                if let Some(name) = Self::property_key_name(&p.key) {
                    self.push_symbol(&name, SymbolKind::Property, p.span, Some(p.r#static), None, false, Metadata::new());
                }
                if let Some(value) = &p.value {
                    walk::walk_expression(self, value);
                }
            }
            _ => {}
        }
    }

    fn enter_interface(&mut self, decl: &TSInterfaceDeclaration<'a>, is_exported: bool) {
        let name = decl.id.name.to_string();
        self.push_symbol(&name, SymbolKind::Interface, decl.span, None, None, is_exported, Metadata::new());
        self.container_stack.push(Container {
            name,
            kind: ContainerKind::Interface,
        });
        for member in &decl.body.body {
            match member {
                TSSignature::TSPropertySignature(p) => {
                    if let Some(name) = Self::property_key_name(&p.key) {
                        self.push_symbol(&name, SymbolKind::Property, p.span, None, None, false, Metadata::new());
                    }
                }
                TSSignature::TSMethodSignature(m) => {
                    if let Some(name) = Self::property_key_name(&m.key) {
                        let params = Self::param_count(&m.params);
                        self.push_symbol(&name, SymbolKind::Method, m.span, None, Some(params), false, Metadata::new());
                    }
                }
                _ => {}
            }
        }
        self.container_stack.pop();
    }

    fn enter_enum(&mut self, decl: &TSEnumDeclaration<'a>, is_exported: bool) {
        let name = decl.id.name.to_string();
        self.push_symbol(&name, SymbolKind::Enum, decl.span, None, None, is_exported, Metadata::new());
        self.container_stack.push(Container {
            name,
            kind: ContainerKind::Enum,
        });
        for member in &decl.body.members {
            let member_name = match &member.id {
                TSEnumMemberName::Identifier(id) => id.name.to_string(),
                TSEnumMemberName::String(s) => s.value.to_string(),
            };
            self.push_symbol(&member_name, SymbolKind::EnumMember, member.span, None, None, false, Metadata::new());
        }
        self.container_stack.pop();
    }

    fn handle_variable_declarator(&mut self, d: &VariableDeclarator<'a>) {
        let is_const = *self.decl_kind_stack.last().unwrap_or(&false);
        let Some(name) = Self::binding_name(&d.id) else {
            if let Some(init) = &d.init {
                self.visit_expression(init);
            }
            return;
        };
        let (kind, params) = match &d.init {
            Some(Expression::ArrowFunctionExpression(f)) => (SymbolKind::Function, Some(Self::param_count(&f.params))),
            Some(Expression::FunctionExpression(f)) => (SymbolKind::Function, Some(Self::param_count(&f.params))),
            _ if is_const => (SymbolKind::Constant, None),
            _ => (SymbolKind::Variable, None),
        };
        self.push_symbol(&name, kind, d.span, None, params, false, Metadata::new());

        match &d.init {
            // Recursively emit identifier keys of an object-literal
            // initializer as nested symbols under this binding (spec §4.1),
            // so a member chain like `Config.someKey` resolves.
            Some(Expression::ObjectExpression(obj)) => {
                self.container_stack.push(Container {
                    name,
                    kind: ContainerKind::Object,
                });
                self.visit_object_literal_keys(obj);
                self.container_stack.pop();
            }
            // `const Actions = createActionGroup({ ... })` — push the
            // binding as a container before visiting the call so any
            // synthesized event-method symbols record it as theirs.
            Some(init @ Expression::CallExpression(_)) => {
                self.container_stack.push(Container {
                    name,
                    kind: ContainerKind::Object,
                });
                self.visit_expression(init);
                self.container_stack.pop();
            }
            Some(init) => self.visit_expression(init),
            None => {}
        }
    }

    fn visit_object_literal_keys(&mut self, obj: &ObjectExpression<'a>) {
        for prop in &obj.properties {
            match prop {
                ObjectPropertyKind::ObjectProperty(p) => {
                    let Some(key) = Self::property_key_name(&p.key) else {
                        self.visit_expression(&p.value);
                        continue;
                    };
                    self.push_symbol(&key, SymbolKind::Property, p.span, None, None, false, Metadata::new());
                    match &p.value {
                        Expression::ObjectExpression(nested) => {
                            self.container_stack.push(Container {
                                name: key,
                                kind: ContainerKind::Object,
                            });
                            self.visit_object_literal_keys(nested);
                            self.container_stack.pop();
                        }
                        other => self.visit_expression(other),
                    }
                }
                ObjectPropertyKind::SpreadProperty(s) => self.visit_expression(&s.argument),
            }
        }
    }

    fn handle_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        let specifier = decl.source.value.to_string();
        let (location, _) = self.location_of(decl.span);
        let Some(specifiers) = &decl.specifiers else {
            return;
        };
        for spec in specifiers {
            match spec {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    self.imports.push(Import {
                        local_name: s.local.name.to_string(),
                        module_specifier: specifier.clone(),
                        is_default: true,
                        is_namespace: false,
                        exported_name: None,
                        location: location.clone(),
                    });
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    let alias = s.local.name.to_string();
                    self.namespace_imports.insert(alias.clone(), specifier.clone());
                    self.imports.push(Import {
                        local_name: alias,
                        module_specifier: specifier.clone(),
                        is_default: false,
                        is_namespace: true,
                        exported_name: None,
                        location: location.clone(),
                    });
                }
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    let imported = Self::module_export_name(&s.imported);
                    let local = s.local.name.to_string();
                    let exported_name = if imported != local { Some(imported) } else { None };
                    self.imports.push(Import {
                        local_name: local,
                        module_specifier: specifier.clone(),
                        is_default: false,
                        is_namespace: false,
                        exported_name,
                        location: location.clone(),
                    });
                }
            }
        }
    }

    fn handle_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source {
            let module_specifier = source.value.to_string();
            let names: Vec<String> = decl.specifiers.iter().map(|s| Self::module_export_name(&s.exported)).collect();
            for name in &names {
                self.exported_names.insert(name.clone());
            }
            self.re_exports.push(ReExport {
                module_specifier,
                is_all: false,
                exported_names: Some(names),
            });
            return;
        }

        for spec in &decl.specifiers {
            self.exported_names.insert(Self::module_export_name(&spec.exported));
        }

        if let Some(declaration) = &decl.declaration {
            if let Some(name) = Self::declaration_name(declaration) {
                self.exported_names.insert(name);
            }
        }
    }

    fn declaration_name(decl: &Declaration<'a>) -> Option<String> {
        match decl {
            Declaration::FunctionDeclaration(f) => f.id.as_ref().map(|id| id.name.to_string()),
            Declaration::ClassDeclaration(c) => c.id.as_ref().map(|id| id.name.to_string()),
            Declaration::TSInterfaceDeclaration(i) => Some(i.id.name.to_string()),
            Declaration::TSTypeAliasDeclaration(t) => Some(t.id.name.to_string()),
            Declaration::TSEnumDeclaration(e) => Some(e.id.name.to_string()),
            Declaration::VariableDeclaration(v) => {
                v.declarations.first().and_then(|d| Self::binding_name(&d.id))
            }
            _ => None,
        }
    }

    fn handle_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        self.re_exports.push(ReExport {
            module_specifier: decl.source.value.to_string(),
            is_all: true,
            exported_names: None,
        });
    }

    fn handle_member_expression(&mut self, member: &MemberExpression<'a>) {
        let MemberExpression::StaticMemberExpression(m) = member else {
            return;
        };
        let Expression::Identifier(obj) = &m.object else {
            return;
        };
        let object_name = obj.name.to_string();
        if !self.namespace_imports.contains_key(&object_name) {
            return;
        }
        let property_name = m.property.name.to_string();
        self.pending_references.push(PendingReference {
            container: object_name,
            member: property_name,
            location: self.location_of(m.span).0,
            range: self.range_of(m.span),
        });
    }

    fn handle_call_expression(&mut self, call: &CallExpression<'a>) {
        for plugin in &self.plugins {
            if let Some(synth) = plugin.on_call(call) {
                for event in synth.events {
                    self.push_symbol(&event, SymbolKind::Method, call.span, None, None, false, Metadata::new());
                }
            }
        }
    }
}

impl<'a> Visit<'a> for JsVisitor<'a> {
    fn visit_class(&mut self, class: &Class<'a>) {
        self.enter_class(class, false);
    }

    fn visit_ts_interface_declaration(&mut self, decl: &TSInterfaceDeclaration<'a>) {
        self.enter_interface(decl, false);
    }

    fn visit_ts_enum_declaration(&mut self, decl: &TSEnumDeclaration<'a>) {
        self.enter_enum(decl, false);
    }

    fn visit_ts_type_alias_declaration(&mut self, decl: &TSTypeAliasDeclaration<'a>) {
        let name = decl.id.name.to_string();
        self.push_symbol(&name, SymbolKind::Type, decl.span, None, None, false, Metadata::new());
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: oxc_semantic::ScopeFlags) {
        if let Some(id) = &func.id {
            let name = id.name.to_string();
            let params = Self::param_count(&func.params);
            self.push_symbol(&name, SymbolKind::Function, func.span, None, Some(params), false, Metadata::new());
        }
        walk::walk_function(self, func, flags);
    }

    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        self.decl_kind_stack.push(decl.kind.is_const());
        for d in &decl.declarations {
            self.handle_variable_declarator(d);
        }
        self.decl_kind_stack.pop();
    }

    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        self.handle_import_declaration(decl);
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        self.handle_export_named_declaration(decl);
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        self.handle_export_all_declaration(decl);
    }

    fn visit_export_default_declaration(&mut self, decl: &ExportDefaultDeclaration<'a>) {
        let name = match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(f) => f.id.as_ref().map(|id| id.name.to_string()),
            ExportDefaultDeclarationKind::ClassDeclaration(c) => c.id.as_ref().map(|id| id.name.to_string()),
            _ => None,
        };
        if let Some(name) = name.or_else(|| Some("default".to_string())) {
            self.exported_names.insert(name);
        }
        walk::walk_export_default_declaration(self, decl);
    }

    fn visit_member_expression(&mut self, member: &MemberExpression<'a>) {
        self.handle_member_expression(member);
        walk::walk_member_expression(self, member);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        self.handle_call_expression(call);
        walk::walk_call_expression(self, call);
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(s) = &expr.source {
            self.imports.push(Import {
                local_name: String::new(),
                module_specifier: s.value.to_string(),
                is_default: false,
                is_namespace: true,
                exported_name: None,
                location: self.location_of(expr.span).0,
            });
        }
        walk::walk_import_expression(self, expr);
    }
}
