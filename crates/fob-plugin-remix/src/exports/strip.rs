//! Export removal with dead code elimination.
//!
//! Removal works on source spans, so everything that is not removed keeps its
//! exact text. After the exports are gone, top-level bindings that were
//! referenced before and are unreferenced now are deleted, repeating until
//! nothing changes. That takes imports of server-only modules out along with
//! the loader that used them.

use super::lexer::{self, collect_binding_names, declaration_names, module_export_name};
use crate::error::Result;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, BindingPatternKind, Declaration, ImportDeclarationSpecifier, ModuleDeclaration,
    Program, Statement, VariableDeclaration, VariableDeclarator,
};
use oxc_semantic::SemanticBuilder;
use oxc_span::{GetSpan, Span};
use rustc_hash::FxHashSet;
use std::path::Path;

struct Edit {
    span: Span,
    text: String,
}

impl Edit {
    fn remove(span: Span) -> Self {
        Self {
            span,
            text: String::new(),
        }
    }

    fn replace(span: Span, text: String) -> Self {
        Self { span, text }
    }
}

fn slice(source: &str, span: Span) -> &str {
    &source[span.start as usize..span.end as usize]
}

fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| std::cmp::Reverse(edit.span.start));
    let mut out = source.to_string();
    for edit in edits {
        out.replace_range(edit.span.start as usize..edit.span.end as usize, &edit.text);
    }
    out
}

/// Remove the exports named in `names` from `source`, then eliminate the code
/// only they used.
///
/// Returns the source unchanged when none of `names` is exported.
pub fn remove_exports(source: &str, path: &Path, names: &[&str]) -> Result<String> {
    let (referenced, edits) = {
        let allocator = Allocator::default();
        let program = lexer::parse(&allocator, source, path)?;
        (referenced_top_level(&program), export_edits(source, &program, names))
    };

    if edits.is_empty() {
        return Ok(source.to_string());
    }

    let mut code = apply_edits(source, edits);
    loop {
        let edits = {
            let allocator = Allocator::default();
            let program = lexer::parse(&allocator, &code, path)?;
            dead_code_edits(&code, &program, &referenced)
        };
        if edits.is_empty() {
            break;
        }
        code = apply_edits(&code, edits);
    }

    tracing::debug!(path = %path.display(), removed = ?names, "stripped route exports");
    Ok(code)
}

/// Top-level binding names with at least one reference.
fn referenced_top_level(program: &Program<'_>) -> FxHashSet<String> {
    top_level_bindings(program)
        .into_iter()
        .filter_map(|(name, referenced)| referenced.then_some(name))
        .collect()
}

fn unreferenced_top_level(program: &Program<'_>) -> FxHashSet<String> {
    top_level_bindings(program)
        .into_iter()
        .filter_map(|(name, referenced)| (!referenced).then_some(name))
        .collect()
}

fn top_level_bindings(program: &Program<'_>) -> Vec<(String, bool)> {
    let semantic = SemanticBuilder::new().build(program).semantic;
    let scoping = semantic.scoping();
    let nodes = semantic.nodes();
    let root = scoping.root_scope_id();

    scoping
        .symbol_ids()
        .filter(|&symbol_id| scoping.symbol_scope_id(symbol_id) == root)
        .map(|symbol_id| {
            // references inside the binding's own declaration keep nothing alive
            let declaration = nodes.get_node(scoping.symbol_declaration(symbol_id)).kind().span();
            let referenced = scoping.get_resolved_reference_ids(symbol_id).iter().any(|&id| {
                let span = nodes.get_node(scoping.get_reference(id).node_id()).kind().span();
                !(declaration.start <= span.start && span.end <= declaration.end)
            });
            (scoping.symbol_name(symbol_id).to_string(), referenced)
        })
        .collect()
}

fn export_edits(source: &str, program: &Program<'_>, names: &[&str]) -> Vec<Edit> {
    let removed = |name: &str| names.contains(&name);
    let mut edits = Vec::new();

    for stmt in program.body.iter() {
        let Some(module_decl) = stmt.as_module_declaration() else {
            continue;
        };
        match module_decl {
            ModuleDeclaration::ExportDefaultDeclaration(decl) if removed("default") => {
                edits.push(Edit::remove(decl.span));
            }
            ModuleDeclaration::ExportAllDeclaration(all) => {
                if all
                    .exported
                    .as_ref()
                    .is_some_and(|exported| removed(module_export_name(exported).as_str()))
                {
                    edits.push(Edit::remove(all.span));
                }
            }
            ModuleDeclaration::ExportNamedDeclaration(named) if !named.export_kind.is_type() => {
                if let Some(decl) = &named.declaration {
                    if let Declaration::VariableDeclaration(var) = decl {
                        let rewritten: Vec<_> = var
                            .declarations
                            .iter()
                            .map(|d| rewrite_declarator(source, d, &removed))
                            .collect();
                        if rewritten.iter().all(|d| matches!(d, Rewrite::Unchanged(_))) {
                            continue;
                        }
                        let kept: Vec<_> = rewritten.into_iter().filter_map(Rewrite::kept).collect();
                        if kept.is_empty() {
                            edits.push(Edit::remove(named.span));
                        } else {
                            edits.push(Edit::replace(
                                named.span,
                                format!("export {}", rebuild_variable(source, var, &kept)),
                            ));
                        }
                    } else if declaration_names(decl).iter().any(|name| removed(name.as_str())) {
                        edits.push(Edit::remove(named.span));
                    }
                    continue;
                }

                let kept: Vec<_> = named
                    .specifiers
                    .iter()
                    .filter(|spec| !removed(module_export_name(&spec.exported).as_str()))
                    .collect();
                if kept.len() == named.specifiers.len() {
                    continue;
                }
                if kept.is_empty() {
                    edits.push(Edit::remove(named.span));
                    continue;
                }
                let list = kept
                    .iter()
                    .map(|spec| slice(source, spec.span))
                    .collect::<Vec<_>>()
                    .join(", ");
                let from = named
                    .source
                    .as_ref()
                    .map(|src| format!(" from {}", slice(source, src.span)))
                    .unwrap_or_default();
                edits.push(Edit::replace(named.span, format!("export {{ {} }}{};", list, from)));
            }
            _ => {}
        }
    }

    edits
}

fn binding_name<'a>(declarator: &'a VariableDeclarator<'_>) -> Option<&'a str> {
    match &declarator.id.kind {
        BindingPatternKind::BindingIdentifier(ident) => Some(ident.name.as_str()),
        _ => None,
    }
}

enum Rewrite {
    Unchanged(String),
    Changed(String),
    Dropped,
}

impl Rewrite {
    fn kept(self) -> Option<String> {
        match self {
            Rewrite::Unchanged(text) | Rewrite::Changed(text) => Some(text),
            Rewrite::Dropped => None,
        }
    }
}

fn binds_any(pattern: &BindingPattern<'_>, removed: &impl Fn(&str) -> bool) -> bool {
    let mut names = Vec::new();
    collect_binding_names(pattern, &mut names);
    names.iter().any(|name| removed(name.as_str()))
}

/// Declarator text without the bindings `removed` matches.
fn rewrite_declarator(
    source: &str,
    declarator: &VariableDeclarator<'_>,
    removed: &impl Fn(&str) -> bool,
) -> Rewrite {
    if !binds_any(&declarator.id, removed) {
        return Rewrite::Unchanged(slice(source, declarator.span).to_string());
    }
    match (rewrite_pattern(source, &declarator.id, removed), &declarator.init) {
        (None, _) => Rewrite::Dropped,
        (Some(pattern), Some(init)) => {
            Rewrite::Changed(format!("{} = {}", pattern, slice(source, init.span())))
        }
        (Some(pattern), None) => Rewrite::Changed(pattern),
    }
}

/// `None` when nothing of the pattern is left.
fn rewrite_pattern(
    source: &str,
    pattern: &BindingPattern<'_>,
    removed: &impl Fn(&str) -> bool,
) -> Option<String> {
    if !binds_any(pattern, removed) {
        return Some(slice(source, pattern.span()).to_string());
    }
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(_) => None,
        BindingPatternKind::AssignmentPattern(assign) => {
            let left = rewrite_pattern(source, &assign.left, removed)?;
            Some(format!("{} = {}", left, slice(source, assign.right.span())))
        }
        BindingPatternKind::ObjectPattern(object) => {
            let mut parts = Vec::new();
            for property in &object.properties {
                let Some(value) = rewrite_pattern(source, &property.value, removed) else {
                    continue;
                };
                if !binds_any(&property.value, removed) {
                    parts.push(slice(source, property.span).to_string());
                    continue;
                }
                let key = slice(source, property.key.span());
                if property.computed {
                    parts.push(format!("[{}]: {}", key, value));
                } else {
                    parts.push(format!("{}: {}", key, value));
                }
            }
            if let Some(rest) = &object.rest {
                if !binds_any(&rest.argument, removed) {
                    parts.push(slice(source, rest.span).to_string());
                }
            }
            (!parts.is_empty()).then(|| format!("{{ {} }}", parts.join(", ")))
        }
        BindingPatternKind::ArrayPattern(array) => {
            // holes keep the remaining elements at their positions
            let mut parts: Vec<String> = array
                .elements
                .iter()
                .map(|element| {
                    element
                        .as_ref()
                        .and_then(|element| rewrite_pattern(source, element, removed))
                        .unwrap_or_default()
                })
                .collect();
            if let Some(rest) = &array.rest {
                if !binds_any(&rest.argument, removed) {
                    parts.push(slice(source, rest.span).to_string());
                }
            }
            while parts.last().is_some_and(String::is_empty) {
                parts.pop();
            }
            if parts.is_empty() {
                return None;
            }
            Some(format!("[{}]", parts.join(", ")))
        }
    }
}

/// `const a = 1, c = 3;` from the kept declarator texts.
fn rebuild_variable(source: &str, var: &VariableDeclaration<'_>, kept: &[String]) -> String {
    // "const " / "let " up to the first declarator
    let keyword = &source[var.span.start as usize..var.declarations[0].span.start as usize];
    format!("{}{};", keyword, kept.join(", "))
}

fn dead_code_edits(
    source: &str,
    program: &Program<'_>,
    referenced_before: &FxHashSet<String>,
) -> Vec<Edit> {
    let unreferenced = unreferenced_top_level(program);
    let is_dead = |name: &str| referenced_before.contains(name) && unreferenced.contains(name);
    let mut edits = Vec::new();

    for stmt in program.body.iter() {
        match stmt {
            Statement::FunctionDeclaration(func) => {
                if func.id.as_ref().is_some_and(|id| is_dead(id.name.as_str())) {
                    edits.push(Edit::remove(func.span));
                }
            }
            Statement::ClassDeclaration(class) => {
                if class.id.as_ref().is_some_and(|id| is_dead(id.name.as_str())) {
                    edits.push(Edit::remove(class.span));
                }
            }
            Statement::VariableDeclaration(var) => {
                let kept: Vec<_> = var
                    .declarations
                    .iter()
                    .filter(|d| !binding_name(d).is_some_and(|name| is_dead(name)))
                    .map(|d| slice(source, d.span).to_string())
                    .collect();
                if kept.len() == var.declarations.len() {
                    continue;
                }
                if kept.is_empty() {
                    edits.push(Edit::remove(var.span));
                } else {
                    edits.push(Edit::replace(var.span, rebuild_variable(source, var, &kept)));
                }
            }
            Statement::ImportDeclaration(import) if !import.import_kind.is_type() => {
                // bare `import "./side-effect"` stays
                let Some(specifiers) = import.specifiers.as_ref().filter(|s| !s.is_empty()) else {
                    continue;
                };
                let kept: Vec<_> = specifiers
                    .iter()
                    .filter(|spec| !import_specifier_is_dead(spec, &is_dead))
                    .collect();
                if kept.len() == specifiers.len() {
                    continue;
                }
                if kept.is_empty() {
                    edits.push(Edit::remove(import.span));
                    continue;
                }

                let mut clauses = Vec::new();
                let mut named = Vec::new();
                for spec in kept {
                    match spec {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => {
                            named.push(slice(source, s.span))
                        }
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            clauses.push(slice(source, s.span).to_string())
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            clauses.push(slice(source, s.span).to_string())
                        }
                    }
                }
                if !named.is_empty() {
                    clauses.push(format!("{{ {} }}", named.join(", ")));
                }
                edits.push(Edit::replace(
                    import.span,
                    format!(
                        "import {} from {};",
                        clauses.join(", "),
                        slice(source, import.source.span)
                    ),
                ));
            }
            _ => {}
        }
    }

    edits
}

fn import_specifier_is_dead(
    spec: &ImportDeclarationSpecifier<'_>,
    is_dead: &impl Fn(&str) -> bool,
) -> bool {
    match spec {
        ImportDeclarationSpecifier::ImportSpecifier(s) => {
            !s.import_kind.is_type() && is_dead(s.local.name.as_str())
        }
        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => is_dead(s.local.name.as_str()),
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => is_dead(s.local.name.as_str()),
    }
}
