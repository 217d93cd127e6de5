//! Evaluation of parsed files into a single node.
//!
//! All files of an instance contribute to one root struct. Fields with the same label
//! are unified: equal values merge, types narrow, structs merge field by field.

use indexmap::IndexMap;

use super::lexer::Span;
use super::parser::{Expr, ExprKind, Field, File};
use crate::engine::Diagnostic;
use crate::value::{Kind, Node};

/// A unification failure below some field.
#[derive(Debug, Clone, PartialEq)]
struct Conflict {
    /// Labels from the point of failure up to where it was detected, innermost first
    path: Vec<String>,
    message: String,
}

impl Conflict {
    fn new(message: String) -> Self {
        Self { path: Vec::new(), message }
    }

    fn under(mut self, label: &str) -> Self {
        self.path.push(label.to_string());
        self
    }

    fn dotted(&self, prefix: &[String]) -> String {
        prefix.iter().chain(self.path.iter().rev()).cloned().collect::<Vec<_>>().join(".")
    }
}

fn describe(node: &Node) -> String {
    match node {
        Node::List(_) | Node::Struct(_) => format!("({})", node.kind_name()),
        other => other.to_string(),
    }
}

/// Unify two evaluated nodes.
fn unify(a: Node, b: Node) -> Result<Node, Conflict> {
    match (a, b) {
        (Node::Type(x), Node::Type(y)) => x.meet(y).map(Node::Type).ok_or_else(|| {
            Conflict::new(format!("conflicting values {} and {} (mismatched types)", x, y))
        }),
        (Node::Type(k), other) | (other, Node::Type(k)) => {
            let admitted = match &other {
                Node::List(_) | Node::Struct(_) => k == Kind::Top,
                concrete => k.admits(concrete),
            };
            if admitted {
                Ok(other)
            } else {
                Err(Conflict::new(format!(
                    "conflicting values {} and {} (mismatched types {} and {})",
                    k,
                    describe(&other),
                    k,
                    other.kind_name()
                )))
            }
        }
        (Node::Struct(mut left), Node::Struct(right)) => {
            for (label, node) in right {
                merge_into(&mut left, label, node)?;
            }
            Ok(Node::Struct(left))
        }
        (Node::List(left), Node::List(right)) => {
            if left.len() != right.len() {
                return Err(Conflict::new(format!(
                    "incompatible list lengths ({} and {})",
                    left.len(),
                    right.len()
                )));
            }
            left.into_iter()
                .zip(right)
                .enumerate()
                .map(|(i, (l, r))| unify(l, r).map_err(|c| c.under(&i.to_string())))
                .collect::<Result<Vec<_>, _>>()
                .map(Node::List)
        }
        (a, b) if a == b => Ok(a),
        (a, b) => {
            let message = if a.kind_name() == b.kind_name() {
                format!("conflicting values {} and {}", describe(&a), describe(&b))
            } else {
                format!(
                    "conflicting values {} and {} (mismatched types {} and {})",
                    describe(&a),
                    describe(&b),
                    a.kind_name(),
                    b.kind_name()
                )
            };
            Err(Conflict::new(message))
        }
    }
}

/// Unify `node` into the field `label` of `fields`.
fn merge_into(fields: &mut IndexMap<String, Node>, label: String, node: Node) -> Result<(), Conflict> {
    match fields.get_mut(&label) {
        Some(existing) => {
            let current = std::mem::replace(existing, Node::Null);
            *existing = unify(current, node).map_err(|c| c.under(&label))?;
        }
        None => {
            fields.insert(label, node);
        }
    }
    Ok(())
}

/// Evaluate an expression, reporting the span of the failing sub-expression.
fn eval_expr(expr: &Expr) -> Result<Node, (Conflict, Span)> {
    Ok(match &expr.kind {
        ExprKind::Null => Node::Null,
        ExprKind::Bool(b) => Node::Bool(*b),
        ExprKind::Int(i) => Node::Int(*i),
        ExprKind::Float(f) => Node::Float(*f),
        ExprKind::Str(s) => Node::String(s.clone()),
        ExprKind::Type(k) => Node::Type(*k),
        ExprKind::Reference(name) => {
            return Err((Conflict::new(format!("reference \"{}\" not supported", name)), expr.span))
        }
        ExprKind::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(eval_expr(item).map_err(|(c, p)| (c.under(&i.to_string()), p))?);
            }
            Node::List(out)
        }
        ExprKind::Struct(fields) => {
            let mut out = IndexMap::new();
            eval_fields(&mut out, fields)?;
            Node::Struct(out)
        }
        ExprKind::Unify(operands) => {
            let mut result = Node::Type(Kind::Top);
            for operand in operands {
                let node = eval_expr(operand)?;
                result = unify(result, node).map_err(|c| (c, operand.span))?;
            }
            result
        }
    })
}

fn eval_fields(out: &mut IndexMap<String, Node>, fields: &[Field]) -> Result<(), (Conflict, Span)> {
    for field in fields {
        let node = eval_expr(&field.value).map_err(|(c, p)| (c.under(&field.label), p))?;
        merge_into(out, field.label.clone(), node).map_err(|c| (c, field.span))?;
    }
    Ok(())
}

/// Evaluate all files of one instance into a root struct.
///
/// Every top-level field is evaluated even after a failure so that all conflicts are
/// reported at once.
pub fn evaluate(files: &[File]) -> Result<Node, Vec<Diagnostic>> {
    let mut root = IndexMap::new();
    let mut diagnostics = Vec::new();

    for file in files {
        for field in &file.fields {
            let result = eval_expr(&field.value)
                .map_err(|(c, p)| (c.under(&field.label), p))
                .and_then(|node| {
                    merge_into(&mut root, field.label.clone(), node).map_err(|c| (c, field.span))
                });
            if let Err((conflict, span)) = result {
                diagnostics.push(
                    Diagnostic::new(format!("{}: {}", conflict.dotted(&[]), conflict.message))
                        .with_path(&file.path)
                        .with_position(file.position(span)),
                );
            }
        }
    }

    if diagnostics.is_empty() {
        Ok(Node::Struct(root))
    } else {
        Err(diagnostics)
    }
}
