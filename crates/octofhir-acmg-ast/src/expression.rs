//! Expression AST nodes

use crate::{BinaryOp, BoxExpr, Identifier, Literal, Spanned, UnaryOp};
use std::fmt;

/// A condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    /// `[a, b, c]` or `(a, b, c)`
    List(Vec<Spanned<Expression>>),
    /// Variable or dotted attribute reference
    Variable(VariableRef),
    Binary(BinaryOpExpr),
    Unary(UnaryOpExpr),
    /// `name(...)`, `@name(...)`
    Call(FunctionCall),
    /// A node followed by a parenthesised human-readable label, e.g.
    /// `@history_count(...) (same codon)`. The label never takes part in evaluation.
    Annotated(AnnotatedExpr),
}

/// Variable reference such as `maf`, `$maf`, `PVS1.strong` or `annotations.max_ent_scan.diff_score`
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    /// Dotted path segments, at least one
    pub path: Vec<Identifier>,
    /// Written with a leading `$`
    pub sigil: bool,
    /// Value shown in front of the name when the reference was written in rendered
    /// form, e.g. `0.0004 (maf)`. Display-only; the reference always resolves `path`.
    pub rendered: Option<Literal>,
}

impl VariableRef {
    pub fn new(path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            path: path.into_iter().map(|s| Identifier::new(s)).collect(),
            sigil: false,
            rendered: None,
        }
    }

    /// Parse a dotted name like `PVS1.strong`
    pub fn dotted(name: &str) -> Self {
        Self::new(name.split('.'))
    }

    pub fn head(&self) -> &str {
        self.path.first().map_or("", Identifier::as_str)
    }

    /// Full dotted name
    pub fn name(&self) -> String {
        self.path
            .iter()
            .map(Identifier::as_str)
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn is_dotted(&self) -> bool {
        self.path.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOpExpr {
    pub left: BoxExpr,
    pub op: BinaryOp,
    pub right: BoxExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOpExpr {
    pub op: UnaryOp,
    pub operand: BoxExpr,
}

/// Function call with positional and keyword arguments
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: Identifier,
    /// Written as `@name(...)`
    pub at_sigil: bool,
    pub args: Vec<Spanned<Expression>>,
    pub kwargs: Vec<KeywordArg>,
}

impl FunctionCall {
    pub fn kwarg(&self, name: &str) -> Option<&Spanned<Expression>> {
        self.kwargs
            .iter()
            .find(|k| k.name.as_str() == name)
            .map(|k| &k.value)
    }
}

/// `name=value` argument; names may carry operator suffixes such as `impact__contains`
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordArg {
    pub name: Identifier,
    pub value: Spanned<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedExpr {
    pub expr: BoxExpr,
    pub label: String,
}

impl Expression {
    pub fn variable(name: &str) -> Self {
        Self::Variable(VariableRef::dotted(name))
    }

    /// Strip annotation wrappers
    pub fn unannotated(&self) -> &Expression {
        match self {
            Expression::Annotated(a) => a.expr.inner.unannotated(),
            other => other,
        }
    }

    /// Pre-order traversal over this expression and every sub-expression
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expression)) {
        visit(self);
        match self {
            Expression::Literal(_) | Expression::Variable(_) => {}
            Expression::List(items) => {
                for item in items {
                    item.inner.walk(visit);
                }
            }
            Expression::Binary(b) => {
                b.left.inner.walk(visit);
                b.right.inner.walk(visit);
            }
            Expression::Unary(u) => u.operand.inner.walk(visit),
            Expression::Call(call) => {
                for arg in &call.args {
                    arg.inner.walk(visit);
                }
                for kwarg in &call.kwargs {
                    kwarg.value.inner.walk(visit);
                }
            }
            Expression::Annotated(a) => a.expr.inner.walk(visit),
        }
    }

    /// Every variable referenced anywhere in this expression
    pub fn variables(&self) -> Vec<&VariableRef> {
        let mut out = Vec::new();
        self.walk(&mut |expr| {
            if let Expression::Variable(var) = expr {
                out.push(var);
            }
        });
        out
    }

    /// Every function call anywhere in this expression
    pub fn calls(&self) -> Vec<&FunctionCall> {
        let mut out = Vec::new();
        self.walk(&mut |expr| {
            if let Expression::Call(call) = expr {
                out.push(call);
            }
        });
        out
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Binary(b) => b.op.precedence(),
            Expression::Unary(u) => u.op.precedence(),
            _ => u8::MAX,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{lit}"),
            Expression::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item.inner)?;
                }
                f.write_str("]")
            }
            Expression::Variable(var) => {
                if var.sigil {
                    f.write_str("$")?;
                }
                f.write_str(&var.name())
            }
            Expression::Binary(b) => {
                let prec = b.op.precedence();
                b.left.inner.fmt_operand(f, prec)?;
                write!(f, " {} ", b.op)?;
                // Left-associative: a right operand of equal precedence needs parens
                b.right.inner.fmt_operand(f, prec + 1)
            }
            Expression::Unary(u) => {
                write!(f, "{}", u.op)?;
                u.operand.inner.fmt_operand(f, u.op.precedence())
            }
            Expression::Call(call) => {
                if call.at_sigil {
                    f.write_str("@")?;
                }
                write!(f, "{}(", call.name)?;
                let mut first = true;
                for arg in &call.args {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{}", arg.inner)?;
                }
                for kwarg in &call.kwargs {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{}={}", kwarg.name, kwarg.value.inner)?;
                }
                f.write_str(")")
            }
            Expression::Annotated(a) => write!(f, "{} ({})", a.expr.inner, a.label),
        }
    }
}
