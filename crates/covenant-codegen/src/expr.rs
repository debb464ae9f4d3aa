use crate::types::type_tag;
use crate::{CodegenError, Result};
use covenant_ast::{ArithOp, Assignable, DataType, Expression, LogicOp, TimeUnit, Variable};

/// Reserved DSL identifiers and their fixed Solidity renderings. Part of the
/// contract with the front end; unrecognized names pass through unchanged.
fn reserved(name: &str) -> Option<&'static str> {
    match name {
        "balance" => Some("address(this).balance"),
        "time" => Some("block.timestamp"),
        "sender" => Some("msg.sender"),
        "value" => Some("msg.value"),
        _ => None,
    }
}

fn unit_suffix(unit: TimeUnit) -> &'static str {
    match unit {
        TimeUnit::Second => "seconds",
        TimeUnit::Minute => "minutes",
        TimeUnit::Hour => "hours",
        TimeUnit::Day => "days",
        TimeUnit::Week => "weeks",
    }
}

/// Comparison and connective symbols for the generic binary-logical renderer.
/// In/NotIn are handled by a dedicated case; reaching them here means the
/// dispatch above is broken, which is fatal.
fn logic_symbol(op: LogicOp, context: &str) -> Result<&'static str> {
    match op {
        LogicOp::Less => Ok("<"),
        LogicOp::LessEq => Ok("<="),
        LogicOp::Eq => Ok("=="),
        LogicOp::NotEq => Ok("!="),
        LogicOp::GreaterEq => Ok(">="),
        LogicOp::Greater => Ok(">"),
        LogicOp::And => Ok("&&"),
        LogicOp::Or => Ok("||"),
        LogicOp::In | LogicOp::NotIn => {
            Err(CodegenError::MembershipInBinaryArm(context.to_string()))
        }
    }
}

/// Name resolution environment for one transition: the machine's fields plus
/// the transition's parameters.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub fields: &'a [Variable],
    pub params: &'a [Variable],
}

impl<'a> Scope<'a> {
    pub fn new(fields: &'a [Variable], params: &'a [Variable]) -> Self {
        Self { fields, params }
    }

    pub fn type_of(&self, name: &str) -> Option<&'a DataType> {
        self.params
            .iter()
            .chain(self.fields.iter())
            .find(|v| v.name == name)
            .map(|v| &v.ty)
    }

    fn resolve(&self, expr: &Expression) -> Option<&'a DataType> {
        match expr {
            Expression::Variable(name) => self.type_of(name),
            Expression::Lookup { map, .. } => match self.resolve(map)? {
                DataType::Mapping(_, value) => Some(value.as_ref()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Element type of a sequence-valued expression, for membership helpers.
    pub fn sequence_element(&self, expr: &Expression) -> Result<&'a DataType> {
        let described = expr
            .root_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", expr));
        match self.resolve(expr) {
            Some(DataType::Sequence(elem)) => Ok(elem.as_ref()),
            Some(_) => Err(CodegenError::NotASequence(described)),
            None => Err(CodegenError::UnknownSequence(described)),
        }
    }
}

/// Purely structural expression renderer; no side effects, no shared state.
#[derive(Debug, Clone, Copy)]
pub struct ExprRenderer<'a> {
    pub scope: Scope<'a>,
}

impl<'a> ExprRenderer<'a> {
    pub fn new(scope: Scope<'a>) -> Self {
        Self { scope }
    }

    pub fn render(&self, expr: &Expression) -> Result<String> {
        match expr {
            Expression::Variable(name) => Ok(reserved(name).unwrap_or(name.as_str()).to_string()),
            Expression::Lookup { map, key } => {
                Ok(format!("{}[{}]", self.render(map)?, self.render(key)?))
            }
            Expression::IntLiteral(value) => Ok(value.to_string()),
            Expression::StringLiteral(value) => Ok(format!(
                "\"{}\"",
                value.replace('\\', "\\\\").replace('"', "\\\"")
            )),
            Expression::BoolLiteral(value) => Ok(value.to_string()),
            Expression::TimeLiteral(unit) => Ok(format!("1 {}", unit_suffix(*unit))),
            Expression::Arithmetic { left, op, right } => {
                // Multiplication by a unit literal uses duration-literal sugar.
                if *op == ArithOp::Mul {
                    if let Expression::TimeLiteral(unit) = right.as_ref() {
                        return Ok(format!("{} {}", self.child(left)?, unit_suffix(*unit)));
                    }
                }
                Ok(format!(
                    "{} {} {}",
                    self.child(left)?,
                    op,
                    self.child(right)?
                ))
            }
            Expression::Logical { left, op, right } => match op {
                LogicOp::In | LogicOp::NotIn => {
                    let elem = self.scope.sequence_element(right)?;
                    let call = format!(
                        "contains_{}({}, {})",
                        type_tag(elem),
                        self.render(right)?,
                        self.render(left)?
                    );
                    if *op == LogicOp::In {
                        Ok(call)
                    } else {
                        Ok(format!("!{}", call))
                    }
                }
                _ => {
                    let symbol = logic_symbol(*op, "logical expression")?;
                    Ok(format!(
                        "{} {} {}",
                        self.child(left)?,
                        symbol,
                        self.child(right)?
                    ))
                }
            },
            Expression::SizeOf(seq) => Ok(format!("{}.length", self.render(seq)?)),
        }
    }

    /// Render an operand of a binary operation or a member-access base.
    /// Parenthesized only when the child is itself an operation; literals,
    /// references, and size-of never are.
    pub fn child(&self, expr: &Expression) -> Result<String> {
        let rendered = self.render(expr)?;
        if expr.is_operation() {
            Ok(format!("({})", rendered))
        } else {
            Ok(rendered)
        }
    }

    /// Assignment targets bypass the reserved-identifier table: they are
    /// always field or parameter references.
    pub fn assignable(&self, target: &Assignable) -> Result<String> {
        match target {
            Assignable::Variable(name) => Ok(name.clone()),
            Assignable::Lookup { map, key } => {
                Ok(format!("{}[{}]", self.assignable(map)?, self.render(key)?))
            }
        }
    }
}
