use crate::emitter::{EmitContext, EmitHelper};
use crate::expr::ExprRenderer;
use crate::Result;
use covenant_ast::{AuthExpression, AuthOp, AuthTerm, Transition};
use indexmap::IndexSet;

/// Name of the parameter-tuple hash binding. Scopes every approval lookup of a
/// parameterized transition so in-flight calls with different arguments never
/// share approval state.
const SCOPE_VAR: &str = "_scope";

fn flag_name(transition: &Transition, term: &AuthTerm) -> String {
    format!("{}_{}Approved", transition.name, term.referenced_name())
}

fn map_name(transition: &Transition, term: &AuthTerm) -> String {
    format!("{}_{}Approvals", transition.name, term.referenced_name())
}

fn scoped_access(name: &str, scoped: bool) -> String {
    if scoped {
        format!("{}[{}]", name, SCOPE_VAR)
    } else {
        name.to_string()
    }
}

/// Whether compiling this clause synthesizes persistent approval fields.
/// Single identity and any-of leaves check the caller directly and need none.
fn has_fields(auth: &AuthExpression) -> bool {
    let terms = auth.flatten();
    terms.len() > 1 || matches!(terms[0], AuthTerm::AllOf(_))
}

/// Leaf terms that own a bookkeeping field, in clause order.
fn field_terms<'a>(auth: &'a AuthExpression) -> Vec<&'a AuthTerm> {
    let terms = auth.flatten();
    if terms.len() == 1 && !matches!(terms[0], AuthTerm::AllOf(_)) {
        Vec::new()
    } else {
        terms
    }
}

/// Approval-field declarations for one transition, in term order.
///
/// The field shape follows two axes: parameterized transitions key every
/// lookup by the parameter-tuple hash, and all-of terms need a per-identity
/// map where the other kinds need a single flag.
pub fn bookkeeping_fields(transition: &Transition) -> Vec<String> {
    let Some(auth) = &transition.authorization else {
        return Vec::new();
    };
    let scoped = transition.has_parameters();
    let mut declarations = IndexSet::new();
    for term in field_terms(auth) {
        let declaration = match term {
            AuthTerm::Identity(_) | AuthTerm::AnyOf(_) => {
                let ty = if scoped { "mapping(bytes32 => bool)" } else { "bool" };
                format!("{} private {};", ty, flag_name(transition, term))
            }
            AuthTerm::AllOf(_) => {
                let ty = if scoped {
                    "mapping(bytes32 => mapping(address => bool))"
                } else {
                    "mapping(address => bool)"
                };
                format!("{} private {};", ty, map_name(transition, term))
            }
        };
        declarations.insert(declaration);
    }
    declarations.into_iter().collect()
}

fn auth_symbol(op: AuthOp) -> &'static str {
    match op {
        AuthOp::And => "&&",
        AuthOp::Or => "||",
    }
}

/// Boolean gate over the bookkeeping fields, rendered by walking the clause
/// tree. Sub-combinations below the root are parenthesized.
fn render_guard(
    auth: &AuthExpression,
    transition: &Transition,
    scoped: bool,
    depth: usize,
) -> String {
    match auth {
        AuthExpression::Term(term) => match term {
            AuthTerm::Identity(_) | AuthTerm::AnyOf(_) => {
                scoped_access(&flag_name(transition, term), scoped)
            }
            AuthTerm::AllOf(collection) => {
                if scoped {
                    format!(
                        "allApprovedScoped({}, {}, {})",
                        collection,
                        map_name(transition, term),
                        SCOPE_VAR
                    )
                } else {
                    format!("allApproved({}, {})", collection, map_name(transition, term))
                }
            }
        },
        AuthExpression::Combined { left, op, right } => {
            let rendered = format!(
                "{} {} {}",
                render_guard(left, transition, scoped, depth + 1),
                auth_symbol(*op),
                render_guard(right, transition, scoped, depth + 1)
            );
            if depth > 0 {
                format!("({})", rendered)
            } else {
                rendered
            }
        }
    }
}

/// Compile the authorization clause of a transition: the parameter-scope
/// binding, approval recording, and the rejection gate. Rejection is a plain
/// return, never a revert, so approvals recorded in the same call persist.
pub fn emit_checks(
    out: &mut String,
    ctx: &mut EmitContext,
    transition: &Transition,
    renderer: &ExprRenderer<'_>,
) -> Result<()> {
    let Some(auth) = &transition.authorization else {
        return Ok(());
    };
    let scoped = transition.has_parameters() && has_fields(auth);

    if scoped {
        let packed = transition
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        EmitHelper::write_line(
            out,
            ctx,
            &format!(
                "bytes32 {} = keccak256(abi.encodePacked({}));",
                SCOPE_VAR, packed
            ),
        );
    }

    let terms = auth.flatten();
    if terms.len() == 1 {
        let term = terms[0];
        match term {
            AuthTerm::Identity(expr) => {
                let identity = renderer.child(expr)?;
                EmitHelper::write_early_return(out, ctx, &format!("msg.sender != {}", identity))?;
            }
            AuthTerm::AnyOf(collection) => {
                EmitHelper::write_early_return(
                    out,
                    ctx,
                    &format!("!contains_address({}, msg.sender)", collection),
                )?;
            }
            AuthTerm::AllOf(_) => {
                let access = scoped_access(&map_name(transition, term), scoped);
                EmitHelper::write_line(out, ctx, &format!("{}[msg.sender] = true;", access));
                let gate = render_guard(auth, transition, scoped, 0);
                EmitHelper::write_early_return(out, ctx, &format!("!{}", gate))?;
            }
        }
        return Ok(());
    }

    for &term in &terms {
        let condition = match term {
            AuthTerm::Identity(expr) => format!("msg.sender == {}", renderer.child(expr)?),
            AuthTerm::AnyOf(collection) | AuthTerm::AllOf(collection) => {
                format!("contains_address({}, msg.sender)", collection)
            }
        };
        let record = match term {
            AuthTerm::Identity(_) | AuthTerm::AnyOf(_) => {
                format!(
                    "{} = true;",
                    scoped_access(&flag_name(transition, term), scoped)
                )
            }
            AuthTerm::AllOf(_) => format!(
                "{}[msg.sender] = true;",
                scoped_access(&map_name(transition, term), scoped)
            ),
        };
        EmitHelper::write_block(out, ctx, &format!("if ({})", condition), |out, ctx| {
            EmitHelper::write_line(out, ctx, &record);
            Ok(())
        })?;
    }

    let combined = render_guard(auth, transition, scoped, 0);
    EmitHelper::write_early_return(out, ctx, &format!("!({})", combined))
}

/// Reset every approval field of a self-looping transition to its empty
/// state. A stale approval would otherwise satisfy the next consensus round.
pub fn emit_reset(out: &mut String, ctx: &mut EmitContext, transition: &Transition) -> Result<()> {
    let Some(auth) = &transition.authorization else {
        return Ok(());
    };
    let scoped = transition.has_parameters();
    let mut seen = IndexSet::new();
    for term in field_terms(auth) {
        match term {
            AuthTerm::Identity(_) | AuthTerm::AnyOf(_) => {
                let access = scoped_access(&flag_name(transition, term), scoped);
                if seen.insert(access.clone()) {
                    EmitHelper::write_line(out, ctx, &format!("{} = false;", access));
                }
            }
            AuthTerm::AllOf(collection) => {
                let access = scoped_access(&map_name(transition, term), scoped);
                if !seen.insert(access.clone()) {
                    continue;
                }
                EmitHelper::write_block(
                    out,
                    ctx,
                    &format!("for (uint i = 0; i < {}.length; i++)", collection),
                    |out, ctx| {
                        EmitHelper::write_line(
                            out,
                            ctx,
                            &format!("{}[{}[i]] = false;", access, collection),
                        );
                        Ok(())
                    },
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Scope;
    use covenant_ast::{DataType, Expression, Variable};
    use pretty_assertions::assert_eq;

    fn identity(name: &str) -> AuthTerm {
        AuthTerm::Identity(Expression::Variable(name.into()))
    }

    fn term(t: AuthTerm) -> AuthExpression {
        AuthExpression::Term(t)
    }

    fn combined(left: AuthExpression, op: AuthOp, right: AuthExpression) -> AuthExpression {
        AuthExpression::Combined {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    fn transition_with(auth: AuthExpression, params: Vec<Variable>) -> Transition {
        Transition {
            name: "seal".into(),
            origin: Some("Open".into()),
            destination: "Sealed".into(),
            parameters: params,
            guard: None,
            authorization: Some(auth),
            body: Vec::new(),
            auto: false,
        }
    }

    fn checks_for(t: &Transition) -> String {
        let mut out = String::new();
        let mut ctx = EmitContext::new();
        let renderer = ExprRenderer::new(Scope::new(&[], &[]));
        emit_checks(&mut out, &mut ctx, t, &renderer).unwrap();
        out
    }

    #[test]
    fn test_single_identity_needs_no_fields() {
        let t = transition_with(term(identity("owner")), Vec::new());
        assert!(bookkeeping_fields(&t).is_empty());
        let out = checks_for(&t);
        assert_eq!(out, "if (msg.sender != owner) {\n    return;\n}\n");
    }

    #[test]
    fn test_single_any_of_needs_no_fields() {
        let t = transition_with(term(AuthTerm::AnyOf("signers".into())), Vec::new());
        assert!(bookkeeping_fields(&t).is_empty());
        let out = checks_for(&t);
        assert_eq!(
            out,
            "if (!contains_address(signers, msg.sender)) {\n    return;\n}\n"
        );
    }

    #[test]
    fn test_single_all_of_records_then_gates() {
        let t = transition_with(term(AuthTerm::AllOf("board".into())), Vec::new());
        assert_eq!(
            bookkeeping_fields(&t),
            vec!["mapping(address => bool) private seal_boardApprovals;"]
        );
        let out = checks_for(&t);
        assert_eq!(
            out,
            "seal_boardApprovals[msg.sender] = true;\n\
             if (!allApproved(board, seal_boardApprovals)) {\n    return;\n}\n"
        );
    }

    #[test]
    fn test_parameterized_all_of_is_scope_keyed() {
        let t = transition_with(
            term(AuthTerm::AllOf("board".into())),
            vec![Variable::new("round", DataType::Int)],
        );
        assert_eq!(
            bookkeeping_fields(&t),
            vec!["mapping(bytes32 => mapping(address => bool)) private seal_boardApprovals;"]
        );
        let out = checks_for(&t);
        assert!(out.starts_with("bytes32 _scope = keccak256(abi.encodePacked(round));\n"));
        assert!(out.contains("seal_boardApprovals[_scope][msg.sender] = true;"));
        assert!(out.contains("if (!allApprovedScoped(board, seal_boardApprovals, _scope)) {"));
    }

    #[test]
    fn test_multi_term_records_every_leaf() {
        let auth = combined(
            term(identity("owner")),
            AuthOp::And,
            combined(
                term(AuthTerm::AnyOf("signers".into())),
                AuthOp::Or,
                term(AuthTerm::AllOf("board".into())),
            ),
        );
        let t = transition_with(auth, Vec::new());
        assert_eq!(
            bookkeeping_fields(&t),
            vec![
                "bool private seal_ownerApproved;",
                "bool private seal_signersApproved;",
                "mapping(address => bool) private seal_boardApprovals;",
            ]
        );

        let out = checks_for(&t);
        assert!(out.contains("if (msg.sender == owner) {\n    seal_ownerApproved = true;\n}"));
        assert!(out.contains(
            "if (contains_address(signers, msg.sender)) {\n    seal_signersApproved = true;\n}"
        ));
        assert!(out.contains(
            "if (contains_address(board, msg.sender)) {\n    seal_boardApprovals[msg.sender] = true;\n}"
        ));
        // root combination unparenthesized, nested combination wrapped
        assert!(out.contains(
            "if (!(seal_ownerApproved && (seal_signersApproved || allApproved(board, seal_boardApprovals)))) {"
        ));
    }

    #[test]
    fn test_parameterized_flags_become_scope_mappings() {
        let auth = combined(
            term(identity("buyer")),
            AuthOp::And,
            term(identity("seller")),
        );
        let t = transition_with(auth, vec![Variable::new("lot", DataType::Int)]);
        assert_eq!(
            bookkeeping_fields(&t),
            vec![
                "mapping(bytes32 => bool) private seal_buyerApproved;",
                "mapping(bytes32 => bool) private seal_sellerApproved;",
            ]
        );
        let out = checks_for(&t);
        assert!(out.contains("seal_buyerApproved[_scope] = true;"));
        assert!(out.contains("if (!(seal_buyerApproved[_scope] && seal_sellerApproved[_scope])) {"));
    }

    #[test]
    fn test_reset_clears_flags_and_maps() {
        let auth = combined(
            term(identity("owner")),
            AuthOp::And,
            term(AuthTerm::AllOf("board".into())),
        );
        let t = transition_with(auth, Vec::new());
        let mut out = String::new();
        let mut ctx = EmitContext::new();
        emit_reset(&mut out, &mut ctx, &t).unwrap();
        assert_eq!(
            out,
            "seal_ownerApproved = false;\n\
             for (uint i = 0; i < board.length; i++) {\n\
             \x20   seal_boardApprovals[board[i]] = false;\n\
             }\n"
        );
    }

    #[test]
    fn test_reset_skips_fieldless_clauses() {
        let t = transition_with(term(identity("owner")), Vec::new());
        let mut out = String::new();
        let mut ctx = EmitContext::new();
        emit_reset(&mut out, &mut ctx, &t).unwrap();
        assert!(out.is_empty());
    }
}
