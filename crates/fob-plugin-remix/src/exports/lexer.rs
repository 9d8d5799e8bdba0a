//! Lexical export extraction with oxc.

use crate::error::{Error, Result};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, BindingPatternKind, Declaration, ModuleDeclaration, ModuleExportName, Program,
};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::Path;

/// Source type for a module path. Unknown extensions parse as TSX so route
/// files with JSX or types are accepted either way.
pub fn source_type_for(path: &Path) -> SourceType {
    SourceType::from_path(path).unwrap_or_else(|_| SourceType::tsx())
}

/// Parse `source`, turning parser errors into [`Error::Compilation`].
pub fn parse<'a>(allocator: &'a Allocator, source: &'a str, path: &Path) -> Result<Program<'a>> {
    let ret = Parser::new(allocator, source, source_type_for(path)).parse();
    if !ret.errors.is_empty() {
        return Err(Error::Compilation {
            file: path.to_path_buf(),
            diagnostics: ret.errors.iter().map(|e| e.to_string()).collect(),
        });
    }
    Ok(ret.program)
}

/// Exported value names of a module, in source order without duplicates.
///
/// Type-only exports are skipped. `export * from` contributes nothing since
/// its names are not known without resolving the target.
pub fn export_names(source: &str, path: &Path) -> Result<Vec<String>> {
    let allocator = Allocator::default();
    let program = parse(&allocator, source, path)?;
    Ok(program_export_names(&program))
}

pub(crate) fn program_export_names(program: &Program<'_>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !names.contains(&name) {
            names.push(name);
        }
    };

    for stmt in program.body.iter() {
        let Some(module_decl) = stmt.as_module_declaration() else {
            continue;
        };
        match module_decl {
            ModuleDeclaration::ExportDefaultDeclaration(_) => push("default".to_string()),
            ModuleDeclaration::ExportNamedDeclaration(named) => {
                if named.export_kind.is_type() {
                    continue;
                }
                if let Some(decl) = &named.declaration {
                    for name in declaration_names(decl) {
                        push(name);
                    }
                }
                for spec in &named.specifiers {
                    if !spec.export_kind.is_type() {
                        push(module_export_name(&spec.exported));
                    }
                }
            }
            ModuleDeclaration::ExportAllDeclaration(all) => {
                // export * as ns from "..."
                if let Some(exported) = &all.exported {
                    push(module_export_name(exported));
                }
            }
            _ => {}
        }
    }

    names
}

pub(crate) fn module_export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

/// Value bindings introduced by an exported declaration.
pub(crate) fn declaration_names(decl: &Declaration<'_>) -> Vec<String> {
    match decl {
        Declaration::FunctionDeclaration(func) if !func.declare => func
            .id
            .as_ref()
            .map(|id| vec![id.name.to_string()])
            .unwrap_or_default(),
        Declaration::ClassDeclaration(class) if !class.declare => class
            .id
            .as_ref()
            .map(|id| vec![id.name.to_string()])
            .unwrap_or_default(),
        Declaration::VariableDeclaration(var) if !var.declare => {
            let mut names = Vec::new();
            for declarator in &var.declarations {
                collect_binding_names(&declarator.id, &mut names);
            }
            names
        }
        Declaration::TSEnumDeclaration(decl) if !decl.declare => vec![decl.id.name.to_string()],
        _ => Vec::new(),
    }
}

pub(crate) fn collect_binding_names(pattern: &BindingPattern<'_>, names: &mut Vec<String>) {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(ident) => names.push(ident.name.to_string()),
        BindingPatternKind::ObjectPattern(object) => {
            for property in &object.properties {
                collect_binding_names(&property.value, names);
            }
            if let Some(rest) = &object.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                collect_binding_names(element, names);
            }
            if let Some(rest) = &array.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPatternKind::AssignmentPattern(assign) => collect_binding_names(&assign.left, names),
    }
}
