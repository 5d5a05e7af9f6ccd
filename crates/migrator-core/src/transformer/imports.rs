//! Using directive edits, applied after every record.

use anyhow::Context;
use tracing::{debug, info};

use super::TransformResult;
use crate::plan::{Failure, ImportDelta, Phase};
use crate::syntax::token::indentation;
use crate::syntax::{
    parse_name, NodePath, RemoveOptions, SyntaxKind, SyntaxNode, SyntaxRef, SyntaxToken, SyntaxTree, Trivia,
};

/// Namespace a using directive imports, without `static` or alias.
fn imported_namespace(directive: &SyntaxNode) -> Option<String> {
    directive.child_nodes().next().map(SyntaxNode::text)
}

fn usings(tree: &SyntaxTree) -> Vec<SyntaxRef<'_>> {
    tree.descendants()
        .into_iter()
        .filter(|n| n.kind() == SyntaxKind::UsingDirective)
        .collect()
}

/// Applies `delta`; each namespace that cannot be added becomes a failure.
pub fn apply_imports(tree: SyntaxTree, delta: &ImportDelta) -> (SyntaxTree, Vec<Failure>) {
    if delta.is_empty() {
        return (tree, Vec::new());
    }
    let mut tree = remove_usings(tree, delta);
    let mut failures = Vec::new();

    for namespace in &delta.add {
        let present = usings(&tree)
            .iter()
            .any(|u| imported_namespace(u).as_deref() == Some(namespace.as_str()));
        if present {
            debug!(%namespace, "using already present");
            continue;
        }
        match add_using(&tree, namespace) {
            Ok(next) => {
                debug!(%namespace, "using added");
                tree = next;
            }
            Err(err) => failures.push(Failure::from_error(Phase::ImportTransformation, err, namespace.clone())),
        }
    }
    (tree, failures)
}

fn remove_usings(mut tree: SyntaxTree, delta: &ImportDelta) -> SyntaxTree {
    let mut removed = 0usize;
    loop {
        let target = usings(&tree)
            .into_iter()
            .find(|u| imported_namespace(u).is_some_and(|ns| delta.removes(&ns)))
            .map(|u| {
                // comments above the directive stay, bare indentation goes
                let options = if u.leading_trivia().iter().any(Trivia::is_comment) {
                    RemoveOptions::KeepLeadingTrivia
                } else {
                    RemoveOptions::KeepNoTrivia
                };
                (u.path().clone(), options)
            });
        let Some((path, options)) = target else { break };
        match tree.remove_node(&path, options) {
            Ok(next) => {
                tree = next;
                removed += 1;
            }
            Err(err) => {
                debug!(%path, error = %err, "using could not be removed");
                break;
            }
        }
    }
    if removed > 0 {
        info!(removed, "usings removed");
    }
    tree
}

fn using_directive(namespace: &str) -> TransformResult<SyntaxNode> {
    let name = parse_name(namespace).with_context(|| format!("`{}` is not a namespace name", namespace))?;
    Ok(SyntaxNode::new(
        SyntaxKind::UsingDirective,
        vec![
            SyntaxToken::keyword("using").with_trailing(vec![Trivia::space()]).into(),
            name.into(),
            SyntaxToken::punct(";").with_trailing(vec![Trivia::newline()]).into(),
        ],
    ))
}

/// Container and index of the last using directive, preferring the file
/// level over namespaces.
fn last_using_slot(tree: &SyntaxTree) -> Option<(NodePath, usize)> {
    let all = usings(tree);
    let at_root = all.iter().filter(|u| u.path().len() == 1).last();
    let last = at_root.or_else(|| {
        let first_container = all.first()?.path().parent()?;
        all.iter()
            .filter(|u| u.path().parent().as_ref() == Some(&first_container))
            .last()
    })?;
    Some((last.path().parent()?, last.path().last_index()?))
}

fn add_using(tree: &SyntaxTree, namespace: &str) -> TransformResult<SyntaxTree> {
    let directive = using_directive(namespace)?;

    if let Some((container, index)) = last_using_slot(tree) {
        let indent = tree
            .node_at(&container.child(index))
            .map(|u| indentation(u.leading_trivia()))
            .unwrap_or_default();
        return Ok(tree.insert_children(&container, index + 1, vec![directive.with_leading_trivia(indent).into()])?);
    }

    // no usings yet: the file header stays on top, followed by a blank line
    let mut root = tree.root().clone();
    let mut header = Vec::new();
    if let Some(first) = root.first_token_mut() {
        if first.leading.iter().any(Trivia::is_comment) {
            if let Some(last_line) = first.leading.iter().rposition(Trivia::is_end_of_line) {
                header = first.leading.drain(..=last_line).collect();
            }
        }
        if !first.leading.first().is_some_and(Trivia::is_end_of_line) {
            first.leading.insert(0, Trivia::newline());
        }
    }
    let tree = SyntaxTree::new(root);
    Ok(tree.insert_children(&NodePath::root(), 0, vec![directive.with_leading_trivia(header).into()])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_compilation_unit, ToSource};
    use pretty_assertions::assert_eq;

    fn apply(source: &str, delta: &ImportDelta) -> (String, Vec<Failure>) {
        let tree = parse_compilation_unit(source).unwrap();
        let (tree, failures) = apply_imports(tree, delta);
        (tree.to_source(), failures)
    }

    fn delta(add: &[&str], remove: &[&str]) -> ImportDelta {
        let mut delta = ImportDelta::default();
        add.iter().for_each(|a| delta.add(*a));
        remove.iter().for_each(|r| delta.remove_prefix(*r));
        delta
    }

    #[test]
    fn test_swap_usings() {
        let source = "using System;\nusing Xunit;\nusing Xunit.Abstractions;\n\nclass T { }\n";
        let (out, failures) = apply(source, &delta(&["TUnit.Core"], &["Xunit"]));
        assert!(failures.is_empty());
        assert_eq!(out, "using System;\nusing TUnit.Core;\n\nclass T { }\n");
    }

    #[test]
    fn test_existing_using_not_duplicated() {
        let source = "using System.Threading.Tasks;\nclass T { }\n";
        let (out, _) = apply(source, &delta(&["System.Threading.Tasks"], &[]));
        assert_eq!(out, source);
    }

    #[test]
    fn test_prefix_match_is_per_segment() {
        let source = "using XunitExtras;\nusing Xunit.Sdk;\nclass T { }\n";
        let (out, _) = apply(source, &delta(&[], &["Xunit"]));
        assert_eq!(out, "using XunitExtras;\nclass T { }\n");
    }

    #[test]
    fn test_add_to_file_without_usings() {
        let source = "namespace N;\n\nclass T { }\n";
        let (out, _) = apply(source, &delta(&["TUnit.Core"], &[]));
        assert_eq!(out, "using TUnit.Core;\n\nnamespace N;\n\nclass T { }\n");
    }

    #[test]
    fn test_header_comment_stays_first() {
        let source = "// Copyright\nclass T { }\n";
        let (out, _) = apply(source, &delta(&["TUnit.Core"], &[]));
        assert_eq!(out, "// Copyright\nusing TUnit.Core;\n\nclass T { }\n");
    }

    #[test]
    fn test_usings_inside_namespace() {
        let source = "namespace N\n{\n    using Xunit;\n\n    class T { }\n}\n";
        let (out, _) = apply(source, &delta(&["TUnit.Core"], &["Xunit"]));
        // the only using went away, so the addition lands at file level
        assert_eq!(out, "using TUnit.Core;\n\nnamespace N\n{\n\n    class T { }\n}\n");
        let (out, _) = apply(
            "namespace N\n{\n    using System;\n\n    class T { }\n}\n",
            &delta(&["TUnit.Core"], &[]),
        );
        assert_eq!(out, "namespace N\n{\n    using System;\n    using TUnit.Core;\n\n    class T { }\n}\n");
    }

    #[test]
    fn test_bad_namespace_is_failure() {
        let (out, failures) = apply("class T { }\n", &delta(&["Not A Name"], &[]));
        assert_eq!(out, "class T { }\n");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].phase, Phase::ImportTransformation);
        assert_eq!(failures[0].original_text, "Not A Name");
    }
}
