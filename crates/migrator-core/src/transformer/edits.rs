//! Syntax-only edits, one per record kind.
//!
//! Each edit receives the current tree and the node carrying the record's
//! token, and returns the next tree. Replacement text is parsed with the
//! fragment parsers, so a record with unparsable text fails on its own.

use anyhow::{anyhow, bail, Context};

use super::TransformResult;
use crate::config::MigrationConfig;
use crate::plan::{
    ArgumentEdit, AssertionConversion, BaseTypeAddition, BaseTypeRemoval, ClassMarkerAddition,
    ConstructorParameterRemoval, ExceptionCaptureConversion, GenericContainerConversion, InvocationReplacement,
    MarkerConversion, MarkerRemoval, MemberRemoval, MethodMarkerAddition, MethodSignatureChange,
    ParameterMarkerConversion, ReturnTypeChange,
};
use crate::syntax::ast::Attribute;
use crate::syntax::token::{contains_newline, indentation, indentation_text};
use crate::syntax::{
    parse_attribute, parse_attribute_list, parse_expression, parse_statements, parse_type, NodePath, RemoveOptions,
    SyntaxElement, SyntaxKind, SyntaxNode, SyntaxRef, SyntaxToken, SyntaxTree, TokenKind, Trivia,
};

const ACCESS_MODIFIERS: &[&str] = &["public", "private", "protected", "internal"];

fn expect_kind(node: &SyntaxRef<'_>, accept: impl Fn(SyntaxKind) -> bool, expected: &str) -> TransformResult<()> {
    if accept(node.kind()) {
        Ok(())
    } else {
        bail!("expected {}, found {:?}", expected, node.kind())
    }
}

/// `replacement` with the outer trivia of `original`.
fn with_trivia_of(replacement: SyntaxNode, original: &SyntaxNode) -> SyntaxNode {
    replacement
        .with_leading_trivia(original.leading_trivia().to_vec())
        .with_trailing_trivia(original.trailing_trivia().to_vec())
}

fn parent_of(node: &SyntaxRef<'_>, kind: SyntaxKind) -> TransformResult<NodePath> {
    node.parent()
        .filter(|parent| parent.kind() == kind)
        .map(|parent| parent.path().clone())
        .ok_or_else(|| anyhow!("{:?} is not inside a {:?}", node.kind(), kind))
}

fn slot(path: &NodePath) -> TransformResult<(NodePath, usize)> {
    match (path.parent(), path.last_index()) {
        (Some(parent), Some(index)) => Ok((parent, index)),
        _ => bail!("the root cannot be edited in place"),
    }
}

/// Indentation of the member or statement that contains `node`.
fn line_indentation(node: &SyntaxRef<'_>, config: &MigrationConfig) -> Vec<Trivia> {
    node.ancestors()
        .find(|a| a.kind().is_member() || a.kind().is_statement() || a.kind().is_type_declaration())
        .map(|owner| indentation(owner.leading_trivia()))
        .filter(|indent| !indent.is_empty())
        .unwrap_or_else(|| vec![Trivia::whitespace(config.indent.clone())])
}

pub(super) fn exception_capture(
    tree: &SyntaxTree,
    statement: &SyntaxRef<'_>,
    record: &ExceptionCaptureConversion,
    config: &MigrationConfig,
) -> TransformResult<SyntaxTree> {
    expect_kind(statement, |k| k == SyntaxKind::LocalDeclarationStatement, "a local declaration")?;

    let leading = statement.leading_trivia().to_vec();
    let indent = indentation_text(&leading);
    let inner = format!("{}{}", indent, config.indent);
    let body = record.body.trim();
    let try_block = if body.starts_with('{') {
        body.to_string()
    } else {
        let terminator = if body.ends_with(';') || body.ends_with('}') { "" } else { ";" };
        format!("{{\n{inner}{body}{terminator}\n{indent}}}")
    };
    let source = format!(
        "{ty}? {var} = null;\n\
         {indent}try\n\
         {indent}{try_block}\n\
         {indent}catch ({ty} {caught})\n\
         {indent}{{\n\
         {inner}{var} = {caught};\n\
         {indent}}}",
        ty = config.exception_type,
        var = record.variable_name,
        caught = config.catch_variable,
    );

    let mut statements =
        parse_statements(&source).with_context(|| format!("building the capture of `{}`", record.variable_name))?;
    let last = statements.len().checked_sub(1).ok_or_else(|| anyhow!("capture produced no statements"))?;
    statements[last] = statements[last]
        .clone()
        .with_trailing_trivia(statement.trailing_trivia().to_vec());
    statements[0] = statements[0].clone().with_leading_trivia(leading);

    Ok(tree.replace_node_with_many(statement.path(), statements)?)
}

pub(super) fn invocation_replacement(
    tree: &SyntaxTree,
    invocation: &SyntaxRef<'_>,
    record: &InvocationReplacement,
) -> TransformResult<SyntaxTree> {
    let replacement = parse_expression(record.replacement.trim())
        .with_context(|| format!("parsing replacement `{}`", record.replacement))?;
    Ok(tree.replace_node(invocation.path(), with_trivia_of(replacement, invocation))?)
}

pub(super) fn generic_container(
    tree: &SyntaxTree,
    record: &GenericContainerConversion,
    config: &MigrationConfig,
) -> TransformResult<SyntaxTree> {
    let mut tree = tree.clone();

    if let Some(token) = record.creation_token {
        let edit = match tree.find_annotated(token) {
            Some(creation) => Some((creation.path().clone(), array_creation(&creation, &record.element_type, config)?)),
            None => None,
        };
        if let Some((path, array)) = edit {
            tree = tree.replace_node(&path, array)?;
        }
    }

    if let Some(token) = record.type_token {
        let edit = match tree.find_annotated(token) {
            Some(generic) => {
                let text = format!("{}<{}>", record.target_container, record.element_type);
                let ty = parse_type(&text).with_context(|| format!("parsing container type `{}`", text))?;
                Some((generic.path().clone(), with_trivia_of(ty, &generic)))
            }
            None => None,
        };
        if let Some((path, ty)) = edit {
            tree = tree.replace_node(&path, ty)?;
        }
    }

    Ok(tree)
}

/// `new Container<..> { rows }` as `new Element[] { rows }`, with
/// brace-delimited rows turned into tuples.
fn array_creation(creation: &SyntaxRef<'_>, element_type: &str, config: &MigrationConfig) -> TransformResult<SyntaxNode> {
    let initializer = creation
        .child_node(SyntaxKind::InitializerExpression)
        .ok_or_else(|| anyhow!("creation has no initializer"))?;
    let mut rows = tuple_rows(initializer)?;

    let mut array = parse_expression(&format!("new {}[] {{ }}", element_type))
        .with_context(|| format!("building an array of `{}`", element_type))?;
    let at = array
        .position_of(SyntaxKind::InitializerExpression)
        .ok_or_else(|| anyhow!("array creation without initializer"))?;

    if !contains_newline(rows.leading_trivia()) {
        let mut leading = vec![Trivia::newline()];
        leading.extend(line_indentation(creation, config));
        rows = rows.with_leading_trivia(leading);
        if let Some(token) = at.checked_sub(1).and_then(|i| array.children_mut()[i].last_token_mut()) {
            token.trailing.clear();
        }
    }
    array.children_mut()[at] = rows.into();

    Ok(array
        .with_leading_trivia(creation.leading_trivia().to_vec())
        .with_trailing_trivia(creation.trailing_trivia().to_vec()))
}

fn tuple_rows(initializer: &SyntaxNode) -> TransformResult<SyntaxNode> {
    let mut out = initializer.clone();
    for child in out.children_mut().iter_mut() {
        let tuple = match child.as_node() {
            Some(row) if row.kind() == SyntaxKind::InitializerExpression => {
                let items: Vec<String> = row.child_nodes().map(SyntaxNode::text).collect();
                let tuple = parse_expression(&format!("({})", items.join(", ")))
                    .with_context(|| format!("converting row `{}`", row.text()))?;
                with_trivia_of(tuple, row)
            }
            _ => continue,
        };
        *child = tuple.into();
    }
    Ok(out)
}

pub(super) fn assertion(
    tree: &SyntaxTree,
    invocation: &SyntaxRef<'_>,
    record: &AssertionConversion,
) -> TransformResult<SyntaxTree> {
    let replacement = parse_expression(record.replacement.trim())
        .with_context(|| format!("parsing replacement `{}`", record.replacement))?;
    let statement = invocation
        .first_ancestor_where(|k| k.is_statement() || k.is_member())
        .map(|s| s.path().clone());

    let mut tree = tree.replace_node(invocation.path(), with_trivia_of(replacement, invocation))?;

    if let (Some(comment), Some(path)) = (&record.todo_comment, statement) {
        let comment = if comment.starts_with("//") {
            comment.clone()
        } else {
            format!("// {}", comment)
        };
        tree = tree.update(&path, |statement| {
            let mut leading = indentation(statement.leading_trivia());
            leading.push(Trivia::comment(comment));
            leading.push(Trivia::newline());
            leading.extend(statement.leading_trivia().iter().cloned());
            if let Some(first) = statement.first_token_mut() {
                first.leading = leading;
            }
        })?;
    }
    Ok(tree)
}

pub(super) fn method_signature(
    tree: &SyntaxTree,
    method: &SyntaxRef<'_>,
    record: &MethodSignatureChange,
    config: &MigrationConfig,
) -> TransformResult<SyntaxTree> {
    expect_kind(method, |k| k == SyntaxKind::MethodDeclaration, "a method")?;
    if record.is_noop() {
        return Ok(tree.clone());
    }
    tree.try_update(method.path(), |method| -> TransformResult<()> {
        let modifiers_at = method
            .position_of(SyntaxKind::Modifiers)
            .ok_or_else(|| anyhow!("method has no modifier list"))?;
        rewrite_modifiers(method, modifiers_at, record, config)?;
        rewrite_return_type(method, modifiers_at + 1, &record.return_type, config)
    })
}

fn rewrite_modifiers(
    method: &mut SyntaxNode,
    modifiers_at: usize,
    record: &MethodSignatureChange,
    config: &MigrationConfig,
) -> TransformResult<()> {
    let mut tokens: Vec<SyntaxToken> = method.children()[modifiers_at]
        .as_node()
        .map(|m| m.child_tokens().cloned().collect())
        .unwrap_or_default();
    let was_empty = tokens.is_empty();
    let lead = tokens.first().map(|t| t.leading.clone());

    if record.make_public && !tokens.iter().any(|t| t.is("public")) {
        tokens.retain(|t| !ACCESS_MODIFIERS.contains(&t.text.as_str()));
        tokens.insert(0, SyntaxToken::keyword("public").with_trailing(vec![Trivia::space()]));
        tokens.iter_mut().skip(1).for_each(|t| t.leading.clear());
        if let Some(lead) = lead {
            tokens[0].leading = lead;
        }
    }
    if record.add_async && !tokens.iter().any(|t| t.is(&config.async_keyword)) {
        tokens.push(SyntaxToken::keyword(config.async_keyword.clone()).with_trailing(vec![Trivia::space()]));
    }

    if was_empty && !tokens.is_empty() {
        // the method's indentation sat on its return type
        let moved = method
            .children_mut()
            .get_mut(modifiers_at + 1)
            .and_then(SyntaxElement::as_node_mut)
            .and_then(SyntaxNode::first_token_mut)
            .map(|t| std::mem::take(&mut t.leading))
            .unwrap_or_default();
        tokens[0].leading = moved;
    }

    let elements = tokens.into_iter().map(SyntaxElement::from).collect();
    method.children_mut()[modifiers_at] = SyntaxNode::new(SyntaxKind::Modifiers, elements).into();
    Ok(())
}

fn rewrite_return_type(
    method: &mut SyntaxNode,
    at: usize,
    change: &ReturnTypeChange,
    config: &MigrationConfig,
) -> TransformResult<()> {
    let current = method
        .children()
        .get(at)
        .and_then(SyntaxElement::as_node)
        .cloned()
        .ok_or_else(|| anyhow!("method has no return type"))?;
    let text = current.text();
    let replacement = match change {
        ReturnTypeChange::Keep => None,
        ReturnTypeChange::VoidToWrapper => (text == "void").then(|| config.wrapper.clone()),
        ReturnTypeChange::Wrap { .. } => {
            (!config.is_wrapped(&text) && text != "void").then(|| format!("{}<{}>", config.wrapper, text))
        }
        ReturnTypeChange::ValueWrapperToWrapper => text
            .strip_prefix(config.value_wrapper.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('<'))
            .map(|rest| format!("{}{}", config.wrapper, rest)),
    };
    if let Some(replacement) = replacement {
        let ty = parse_type(&replacement).with_context(|| format!("parsing return type `{}`", replacement))?;
        method.children_mut()[at] = with_trivia_of(ty, &current).into();
    }
    Ok(())
}

pub(super) fn method_marker_addition(
    tree: &SyntaxTree,
    method: &SyntaxRef<'_>,
    record: &MethodMarkerAddition,
) -> TransformResult<SyntaxTree> {
    expect_kind(method, |k| k == SyntaxKind::MethodDeclaration, "a method")?;
    let list = parse_attribute_list(&format!("[{}]", record.marker))
        .with_context(|| format!("parsing marker `{}`", record.marker))?;
    let return_type = match &record.new_return_type {
        Some(text) => Some(parse_type(text).with_context(|| format!("parsing return type `{}`", text))?),
        None => None,
    };

    tree.try_update(method.path(), |method| -> TransformResult<()> {
        let lead = method.leading_trivia().to_vec();
        let indent = indentation(&lead);
        let has_markers = method
            .children()
            .first()
            .and_then(SyntaxElement::as_node)
            .is_some_and(|n| n.kind() == SyntaxKind::AttributeList);

        let new_list = if has_markers {
            let first = method
                .children_mut()
                .first_mut()
                .and_then(SyntaxElement::as_node_mut)
                .and_then(SyntaxNode::first_token_mut);
            if let Some(first) = first {
                let mut leading = vec![Trivia::newline()];
                leading.extend(indent);
                first.leading = leading;
            }
            list.with_leading_trivia(lead).with_trailing_trivia(Vec::new())
        } else {
            if let Some(first) = method.first_token_mut() {
                first.leading = indent;
            }
            list.with_leading_trivia(lead).with_trailing_trivia(vec![Trivia::newline()])
        };
        method.children_mut().insert(0, new_list.into());

        if let Some(ty) = return_type {
            let at = method
                .position_of(SyntaxKind::Modifiers)
                .map(|m| m + 1)
                .ok_or_else(|| anyhow!("method has no modifier list"))?;
            let current = method
                .children()
                .get(at)
                .and_then(SyntaxElement::as_node)
                .cloned()
                .ok_or_else(|| anyhow!("method has no return type"))?;
            method.children_mut()[at] = with_trivia_of(ty, &current).into();
        }
        Ok(())
    })
}

/// The marker at `node` renamed, with its arguments edited.
fn renamed_marker(node: &SyntaxRef<'_>, name: &str, arguments: &ArgumentEdit) -> TransformResult<SyntaxNode> {
    let view = Attribute::cast(node.node()).ok_or_else(|| anyhow!("expected a marker, found {:?}", node.kind()))?;
    let arguments = match arguments {
        ArgumentEdit::Keep => view.argument_list().map(SyntaxNode::text).unwrap_or_default(),
        ArgumentEdit::Remove => String::new(),
        ArgumentEdit::Replace(text) => text.clone(),
    };
    let code = format!("{}{}", name, arguments);
    let marker = parse_attribute(&code).with_context(|| format!("parsing marker `{}`", code))?;
    Ok(with_trivia_of(marker, node))
}

pub(super) fn marker(tree: &SyntaxTree, node: &SyntaxRef<'_>, record: &MarkerConversion) -> TransformResult<SyntaxTree> {
    let replacement = renamed_marker(node, &record.new_name, &record.arguments)?;
    if record.additional.is_empty() {
        return Ok(tree.replace_node(node.path(), replacement)?);
    }

    let list_path = parent_of(node, SyntaxKind::AttributeList)?;
    let (owner, index) = slot(&list_path)?;
    let list = node.parent().ok_or_else(|| anyhow!("marker has no list"))?;
    let ends_line = contains_newline(list.trailing_trivia());
    let indent = indentation(list.leading_trivia());

    let mut extra = Vec::with_capacity(record.additional.len());
    for additional in &record.additional {
        let code = format!("[{}{}]", additional.name, additional.arguments.as_deref().unwrap_or_default());
        let parsed = parse_attribute_list(&code).with_context(|| format!("parsing marker `{}`", code))?;
        let parsed = if ends_line {
            parsed
                .with_leading_trivia(indent.clone())
                .with_trailing_trivia(vec![Trivia::newline()])
        } else {
            parsed.with_trailing_trivia(vec![Trivia::space()])
        };
        extra.push(SyntaxElement::from(parsed));
    }

    let tree = tree.replace_node(node.path(), replacement)?;
    Ok(tree.insert_children(&owner, index + 1, extra)?)
}

pub(super) fn parameter_marker(
    tree: &SyntaxTree,
    node: &SyntaxRef<'_>,
    record: &ParameterMarkerConversion,
) -> TransformResult<SyntaxTree> {
    let replacement = renamed_marker(node, &record.new_name, &record.arguments)?;
    Ok(tree.replace_node(node.path(), replacement)?)
}

pub(super) fn marker_removal(tree: &SyntaxTree, node: &SyntaxRef<'_>, _record: &MarkerRemoval) -> TransformResult<SyntaxTree> {
    expect_kind(node, |k| k == SyntaxKind::Attribute, "a marker")?;
    let list_path = parent_of(node, SyntaxKind::AttributeList)?;
    let list = node.parent().ok_or_else(|| anyhow!("marker has no list"))?;

    if list.child_nodes_of(SyntaxKind::Attribute).count() > 1 {
        return Ok(tree.remove_list_item(node.path())?);
    }
    // a list sharing its line with the declaration hands its indentation on
    let options = if contains_newline(list.trailing_trivia()) {
        RemoveOptions::KeepNoTrivia
    } else {
        RemoveOptions::KeepLeadingTrivia
    };
    Ok(tree.remove_node(&list_path, options)?)
}

pub(super) fn base_type_removal(
    tree: &SyntaxTree,
    node: &SyntaxRef<'_>,
    _record: &BaseTypeRemoval,
) -> TransformResult<SyntaxTree> {
    expect_kind(node, |k| k == SyntaxKind::BaseType, "a base type")?;
    let list_path = parent_of(node, SyntaxKind::BaseList)?;
    let list = node.parent().ok_or_else(|| anyhow!("base type has no list"))?;

    if list.child_nodes_of(SyntaxKind::BaseType).count() > 1 {
        return Ok(tree.remove_list_item(node.path())?);
    }
    let trailing = list.trailing_trivia().to_vec();
    let tree = tree.update_token_before(&list_path, move |token| token.trailing = trailing)?;
    Ok(tree.remove_node(&list_path, RemoveOptions::KeepNoTrivia)?)
}

pub(super) fn base_type_addition(
    tree: &SyntaxTree,
    class: &SyntaxRef<'_>,
    record: &BaseTypeAddition,
) -> TransformResult<SyntaxTree> {
    expect_kind(class, SyntaxKind::is_type_declaration, "a type declaration")?;
    let ty = parse_type(&record.type_name).with_context(|| format!("parsing base type `{}`", record.type_name))?;
    let base = SyntaxNode::new(SyntaxKind::BaseType, vec![ty.into()]);

    if let Some(list) = class.child(SyntaxKind::BaseList) {
        let exists = list
            .child_nodes_of(SyntaxKind::BaseType)
            .any(|b| b.text() == record.type_name);
        if exists {
            return Ok(tree.clone());
        }
        return Ok(tree.update(list.path(), |list| {
            let trailing = list.trailing_trivia().to_vec();
            if let Some(last) = list.last_token_mut() {
                last.trailing.clear();
            }
            let base = base.with_trailing_trivia(trailing);
            list.children_mut().push(SyntaxToken::punct(",").with_trailing(vec![Trivia::space()]).into());
            list.children_mut().push(base.into());
        })?);
    }

    tree.try_update(class.path(), |class| -> TransformResult<()> {
        // after the name, type parameters and primary constructor
        let mut at = class
            .children()
            .iter()
            .position(|c| c.as_token().is_some_and(|t| t.kind == TokenKind::Identifier))
            .ok_or_else(|| anyhow!("type declaration has no name"))?;
        while class
            .children()
            .get(at + 1)
            .and_then(SyntaxElement::as_node)
            .is_some_and(|n| matches!(n.kind(), SyntaxKind::TypeParameterList | SyntaxKind::ParameterList))
        {
            at += 1;
        }
        let previous = class.children_mut()[at]
            .last_token_mut()
            .ok_or_else(|| anyhow!("type declaration has an empty part"))?;
        let trailing = std::mem::replace(&mut previous.trailing, vec![Trivia::space()]);
        let colon = SyntaxToken::punct(":").with_trailing(vec![Trivia::space()]);
        let list = SyntaxNode::new(SyntaxKind::BaseList, vec![colon.into(), base.into()]).with_trailing_trivia(trailing);
        class.children_mut().insert(at + 1, list.into());
        Ok(())
    })
}

pub(super) fn class_marker_addition(
    tree: &SyntaxTree,
    class: &SyntaxRef<'_>,
    record: &ClassMarkerAddition,
) -> TransformResult<SyntaxTree> {
    expect_kind(class, SyntaxKind::is_type_declaration, "a type declaration")?;
    let list = parse_attribute_list(&format!("[{}]", record.marker))
        .with_context(|| format!("parsing marker `{}`", record.marker))?;

    tree.try_update(class.path(), |class| -> TransformResult<()> {
        let lead = class.leading_trivia().to_vec();
        let indent = indentation(&lead);
        let at = class
            .children()
            .iter()
            .position(|c| c.as_node().map_or(true, |n| n.kind() != SyntaxKind::AttributeList))
            .unwrap_or(0);
        let list = if at == 0 {
            if let Some(first) = class.first_token_mut() {
                first.leading = indent;
            }
            list.with_leading_trivia(lead)
        } else {
            list.with_leading_trivia(indent)
        };
        class
            .children_mut()
            .insert(at, list.with_trailing_trivia(vec![Trivia::newline()]).into());
        Ok(())
    })
}

pub(super) fn member_removal(tree: &SyntaxTree, member: &SyntaxRef<'_>, _record: &MemberRemoval) -> TransformResult<SyntaxTree> {
    expect_kind(member, SyntaxKind::is_member, "a member")?;
    Ok(tree.remove_node(member.path(), RemoveOptions::KeepTrailingTrivia)?)
}

pub(super) fn constructor_parameter_removal(
    tree: &SyntaxTree,
    parameter: &SyntaxRef<'_>,
    _record: &ConstructorParameterRemoval,
) -> TransformResult<SyntaxTree> {
    expect_kind(parameter, |k| k == SyntaxKind::Parameter, "a parameter")?;
    parent_of(parameter, SyntaxKind::ParameterList)?;
    Ok(tree.remove_list_item(parameter.path())?)
}
