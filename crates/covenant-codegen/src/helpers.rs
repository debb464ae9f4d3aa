use crate::emitter::{EmitContext, EmitHelper};
use crate::expr::Scope;
use crate::types::{lower, needs_memory_location, type_tag};
use crate::Result;
use covenant_ast::{
    AuthTerm, DataType, Expression, LogicOp, StateMachine, Statement, Transition,
};
use indexmap::{IndexMap, IndexSet};

/// What the specification actually exercises, collected in one deterministic
/// pass. Helpers and payable annotations are emitted iff listed here.
#[derive(Debug, Default)]
pub struct Usage {
    /// Membership-helper instantiations: tag → element type, in first-use order.
    pub membership: IndexMap<String, DataType>,
    pub needs_all_approved: bool,
    pub needs_all_approved_scoped: bool,
    /// Fields used as a send destination anywhere in the machine.
    pub payable_fields: IndexSet<String>,
}

pub fn analyze(machine: &StateMachine) -> Result<Usage> {
    let mut usage = Usage::default();
    for transition in &machine.transitions {
        let scope = Scope::new(&machine.fields, &transition.parameters);

        if let Some(guard) = &transition.guard {
            walk_expr(guard, &scope, &mut usage)?;
        }

        if let Some(auth) = &transition.authorization {
            for term in auth.flatten() {
                match term {
                    AuthTerm::Identity(expr) => walk_expr(expr, &scope, &mut usage)?,
                    AuthTerm::AnyOf(_) => {
                        record_membership(&DataType::Identity, &mut usage);
                    }
                    AuthTerm::AllOf(_) => {
                        record_membership(&DataType::Identity, &mut usage);
                        if transition.has_parameters() {
                            usage.needs_all_approved_scoped = true;
                        } else {
                            usage.needs_all_approved = true;
                        }
                    }
                }
            }
        }

        for stmt in &transition.body {
            walk_statement(stmt, transition, &scope, &mut usage)?;
        }
    }
    Ok(usage)
}

fn record_membership(elem: &DataType, usage: &mut Usage) {
    usage
        .membership
        .entry(type_tag(elem))
        .or_insert_with(|| elem.clone());
}

fn walk_expr(expr: &Expression, scope: &Scope<'_>, usage: &mut Usage) -> Result<()> {
    match expr {
        Expression::Variable(_)
        | Expression::IntLiteral(_)
        | Expression::StringLiteral(_)
        | Expression::BoolLiteral(_)
        | Expression::TimeLiteral(_) => Ok(()),
        Expression::Lookup { map, key } => {
            walk_expr(map, scope, usage)?;
            walk_expr(key, scope, usage)
        }
        Expression::Arithmetic { left, right, .. } => {
            walk_expr(left, scope, usage)?;
            walk_expr(right, scope, usage)
        }
        Expression::Logical { left, op, right } => {
            if matches!(op, LogicOp::In | LogicOp::NotIn) {
                let elem = scope.sequence_element(right)?;
                record_membership(elem, usage);
            }
            walk_expr(left, scope, usage)?;
            walk_expr(right, scope, usage)
        }
        Expression::SizeOf(seq) => walk_expr(seq, scope, usage),
    }
}

fn walk_statement(
    stmt: &Statement,
    transition: &Transition,
    scope: &Scope<'_>,
    usage: &mut Usage,
) -> Result<()> {
    match stmt {
        Statement::Assign { value, .. } => walk_expr(value, scope, usage),
        Statement::Send {
            destination,
            amount,
            ..
        } => {
            if let Some(root) = destination.root_name() {
                let is_param = transition.parameters.iter().any(|p| p.name == root);
                if !is_param && scope.fields.iter().any(|f| f.name == root) {
                    usage.payable_fields.insert(root.to_string());
                }
            }
            walk_expr(destination, scope, usage)?;
            walk_expr(amount, scope, usage)
        }
        Statement::Append { element, .. } => walk_expr(element, scope, usage),
        Statement::Clear { .. } => Ok(()),
    }
}

/// Identity-typed parameters of one transition used as a send destination,
/// annotated payable in the generated signature.
pub fn payable_params(transition: &Transition) -> IndexSet<String> {
    let mut names = IndexSet::new();
    for stmt in &transition.body {
        if let Statement::Send { destination, .. } = stmt {
            if let Some(root) = destination.root_name() {
                if transition.parameters.iter().any(|p| p.name == root) {
                    names.insert(root.to_string());
                }
            }
        }
    }
    names
}

const MEMBERSHIP_TEMPLATE: &str = "\
function contains_{tag}({seq_param}, {value_param}) internal pure returns (bool) {
    for (uint i = 0; i < seq.length; i++) {
        if ({compare}) {
            return true;
        }
    }
    return false;
}";

const ALL_APPROVED_TEMPLATE: &str = "\
function allApproved(address[] memory members, mapping(address => bool) storage approvals) internal view returns (bool) {
    for (uint i = 0; i < members.length; i++) {
        if (!approvals[members[i]]) {
            return false;
        }
    }
    return true;
}";

const ALL_APPROVED_SCOPED_TEMPLATE: &str = "\
function allApprovedScoped(address[] memory members, mapping(bytes32 => mapping(address => bool)) storage approvals, bytes32 scope) internal view returns (bool) {
    for (uint i = 0; i < members.length; i++) {
        if (!approvals[scope][members[i]]) {
            return false;
        }
    }
    return true;
}";

fn emit_template(out: &mut String, ctx: &EmitContext, template: &str) {
    for line in template.lines() {
        if line.is_empty() {
            EmitHelper::blank_line(out);
        } else {
            EmitHelper::write_line(out, ctx, line);
        }
    }
}

/// Linear-scan membership test for one element type. String elements compare
/// by hash, since the target language has no string equality operator.
pub fn emit_membership_helper(
    out: &mut String,
    ctx: &EmitContext,
    tag: &str,
    elem: &DataType,
) {
    let elem_ty = lower(elem, false);
    let value_param = if needs_memory_location(elem) {
        format!("{} memory value", elem_ty)
    } else {
        format!("{} value", elem_ty)
    };
    let compare = if matches!(elem, DataType::String) {
        "keccak256(bytes(seq[i])) == keccak256(bytes(value))"
    } else {
        "seq[i] == value"
    };
    let body = MEMBERSHIP_TEMPLATE
        .replace("{tag}", tag)
        .replace("{seq_param}", &format!("{}[] memory seq", elem_ty))
        .replace("{value_param}", &value_param)
        .replace("{compare}", compare);
    emit_template(out, ctx, &body);
}

pub fn emit_all_approved(out: &mut String, ctx: &EmitContext) {
    emit_template(out, ctx, ALL_APPROVED_TEMPLATE);
}

pub fn emit_all_approved_scoped(out: &mut String, ctx: &EmitContext) {
    emit_template(out, ctx, ALL_APPROVED_SCOPED_TEMPLATE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_ast::{AuthExpression, Variable};
    use pretty_assertions::assert_eq;

    fn machine(fields: Vec<Variable>, transitions: Vec<Transition>) -> StateMachine {
        StateMachine {
            states: ["Open", "Closed"].into_iter().map(String::from).collect(),
            fields,
            transitions,
        }
    }

    fn bare_transition(name: &str) -> Transition {
        Transition {
            name: name.into(),
            origin: Some("Open".into()),
            destination: "Closed".into(),
            parameters: Vec::new(),
            guard: None,
            authorization: None,
            body: Vec::new(),
            auto: false,
        }
    }

    #[test]
    fn test_no_usage_no_helpers() {
        let usage = analyze(&machine(Vec::new(), vec![bare_transition("close")])).unwrap();
        assert!(usage.membership.is_empty());
        assert!(!usage.needs_all_approved);
        assert!(!usage.needs_all_approved_scoped);
        assert!(usage.payable_fields.is_empty());
    }

    #[test]
    fn test_membership_instantiated_per_element_type() {
        let fields = vec![
            Variable::new("bidders", DataType::Sequence(Box::new(DataType::Identity))),
            Variable::new("lots", DataType::Sequence(Box::new(DataType::Int))),
        ];
        let mut t = bare_transition("bid");
        t.guard = Some(Expression::Logical {
            left: Box::new(Expression::Variable("sender".into())),
            op: LogicOp::In,
            right: Box::new(Expression::Variable("bidders".into())),
        });
        t.body = vec![Statement::Assign {
            target: covenant_ast::Assignable::Variable("won".into()),
            value: Expression::Logical {
                left: Box::new(Expression::IntLiteral(7)),
                op: LogicOp::NotIn,
                right: Box::new(Expression::Variable("lots".into())),
            },
        }];

        let usage = analyze(&machine(fields, vec![t])).unwrap();
        let tags: Vec<&str> = usage.membership.keys().map(String::as_str).collect();
        assert_eq!(tags, vec!["address", "uint"]);
    }

    #[test]
    fn test_auth_terms_force_identity_membership() {
        let mut t = bare_transition("approve");
        t.authorization = Some(AuthExpression::Term(AuthTerm::AnyOf("signers".into())));
        let usage = analyze(&machine(Vec::new(), vec![t])).unwrap();
        assert!(usage.membership.contains_key("address"));
        assert!(!usage.needs_all_approved);
    }

    #[test]
    fn test_all_of_selects_scoped_variant_by_parameters() {
        let mut plain = bare_transition("ratify");
        plain.authorization = Some(AuthExpression::Term(AuthTerm::AllOf("board".into())));

        let mut scoped = bare_transition("amend");
        scoped.parameters = vec![Variable::new("clause", DataType::Int)];
        scoped.authorization = Some(AuthExpression::Term(AuthTerm::AllOf("board".into())));

        let usage = analyze(&machine(Vec::new(), vec![plain, scoped])).unwrap();
        assert!(usage.needs_all_approved);
        assert!(usage.needs_all_approved_scoped);
    }

    #[test]
    fn test_send_destinations_mark_fields_payable() {
        let fields = vec![
            Variable::new("seller", DataType::Identity),
            Variable::new("buyer", DataType::Identity),
        ];
        let mut t = bare_transition("settle");
        t.body = vec![Statement::Send {
            destination: Expression::Variable("seller".into()),
            amount: Expression::IntLiteral(1),
            source: None,
        }];
        let usage = analyze(&machine(fields, vec![t])).unwrap();
        assert!(usage.payable_fields.contains("seller"));
        assert!(!usage.payable_fields.contains("buyer"));
    }

    #[test]
    fn test_payable_params_tracked_per_transition() {
        let mut t = bare_transition("refund");
        t.parameters = vec![Variable::new("target", DataType::Identity)];
        t.body = vec![Statement::Send {
            destination: Expression::Variable("target".into()),
            amount: Expression::Variable("value".into()),
            source: None,
        }];
        let names = payable_params(&t);
        assert!(names.contains("target"));

        let usage = analyze(&machine(Vec::new(), vec![t])).unwrap();
        assert!(usage.payable_fields.is_empty());
    }

    #[test]
    fn test_membership_helper_text() {
        let mut out = String::new();
        let ctx = EmitContext::new();
        emit_membership_helper(&mut out, &ctx, "address", &DataType::Identity);
        assert!(out.starts_with(
            "function contains_address(address[] memory seq, address value) internal pure returns (bool) {"
        ));
        assert!(out.contains("if (seq[i] == value) {"));
    }

    #[test]
    fn test_string_membership_compares_by_hash() {
        let mut out = String::new();
        let ctx = EmitContext::new();
        emit_membership_helper(&mut out, &ctx, "string", &DataType::String);
        assert!(out.contains("string memory value"));
        assert!(out.contains("keccak256(bytes(seq[i])) == keccak256(bytes(value))"));
    }
}
