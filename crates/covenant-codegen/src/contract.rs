use crate::auth;
use crate::emitter::{EmitContext, EmitHelper};
use crate::helpers::{self, Usage};
use crate::transition;
use crate::types::lower;
use crate::{CodegenError, Result};
use covenant_ast::Specification;

const VERSION_HEADER: &str = "pragma solidity ^0.5.0;";

/// Assembles the full contract in fixed order: header, state enumeration,
/// public fields, current-state field, approval fields, one procedure per
/// transition, then the synthesized helpers.
pub struct ContractEmitter<'a> {
    spec: &'a Specification,
}

impl<'a> ContractEmitter<'a> {
    pub fn new(spec: &'a Specification) -> Self {
        Self { spec }
    }

    pub fn emit_to_string(&self) -> Result<String> {
        self.validate()?;

        let machine = &self.spec.machine;
        let usage = helpers::analyze(machine)?;

        let mut out = String::new();
        let mut ctx = EmitContext::new();

        EmitHelper::write_line(&mut out, &ctx, VERSION_HEADER);
        EmitHelper::blank_line(&mut out);

        let contract_header = format!("contract {}", self.spec.name);
        EmitHelper::write_block(&mut out, &mut ctx, &contract_header, |out, ctx| {
            let states = machine
                .states
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            EmitHelper::write_line(out, ctx, &format!("enum State {{ {} }}", states));
            EmitHelper::blank_line(out);

            for field in &machine.fields {
                let payable = usage.payable_fields.contains(field.name.as_str());
                EmitHelper::write_line(
                    out,
                    ctx,
                    &format!("{} public {};", lower(&field.ty, payable), field.name),
                );
            }
            EmitHelper::write_line(out, ctx, "State public currentState;");

            let approval_fields: Vec<String> = machine
                .transitions
                .iter()
                .flat_map(auth::bookkeeping_fields)
                .collect();
            if !approval_fields.is_empty() {
                EmitHelper::blank_line(out);
                for declaration in &approval_fields {
                    EmitHelper::write_line(out, ctx, declaration);
                }
            }

            for t in &machine.transitions {
                EmitHelper::blank_line(out);
                transition::emit(out, ctx, machine, t)?;
            }

            emit_helpers(out, ctx, &usage);
            Ok(())
        })?;

        Ok(out)
    }

    /// Upstream invariants the generator depends on. A violation is a defect
    /// in the validator, never user input, so generation aborts.
    fn validate(&self) -> Result<()> {
        let mut initial: Option<&str> = None;
        for t in &self.spec.machine.transitions {
            if t.auto && t.guard.is_none() {
                return Err(CodegenError::AutoWithoutGuard(t.name.clone()));
            }
            if t.origin.is_none() {
                if let Some(first) = initial {
                    return Err(CodegenError::DuplicateInitialTransition(
                        t.name.clone(),
                        first.to_string(),
                    ));
                }
                initial = Some(t.name.as_str());
            }
        }
        Ok(())
    }
}

fn emit_helpers(out: &mut String, ctx: &EmitContext, usage: &Usage) {
    for (tag, elem) in &usage.membership {
        EmitHelper::blank_line(out);
        helpers::emit_membership_helper(out, ctx, tag, elem);
    }
    if usage.needs_all_approved {
        EmitHelper::blank_line(out);
        helpers::emit_all_approved(out, ctx);
    }
    if usage.needs_all_approved_scoped {
        EmitHelper::blank_line(out);
        helpers::emit_all_approved_scoped(out, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_ast::{DataType, StateMachine, Transition, Variable};
    use pretty_assertions::assert_eq;

    fn spec(transitions: Vec<Transition>) -> Specification {
        Specification {
            name: "Escrow".into(),
            machine: StateMachine {
                states: ["Created", "Open"].into_iter().map(String::from).collect(),
                fields: vec![Variable::new("deadline", DataType::Timestamp)],
                transitions,
            },
            metadata: Default::default(),
        }
    }

    fn transition(name: &str, origin: Option<&str>) -> Transition {
        Transition {
            name: name.into(),
            origin: origin.map(String::from),
            destination: "Open".into(),
            parameters: Vec::new(),
            guard: None,
            authorization: None,
            body: Vec::new(),
            auto: false,
        }
    }

    #[test]
    fn test_fixed_section_order() {
        let s = spec(vec![transition("init", None), transition("reopen", Some("Open"))]);
        let out = ContractEmitter::new(&s).emit_to_string().unwrap();

        let pragma = out.find("pragma solidity ^0.5.0;").unwrap();
        let header = out.find("contract Escrow {").unwrap();
        let states = out.find("enum State { Created, Open }").unwrap();
        let field = out.find("uint public deadline;").unwrap();
        let current = out.find("State public currentState;").unwrap();
        let ctor = out.find("constructor() public payable {").unwrap();
        let reopen = out.find("function reopen() public payable {").unwrap();

        assert!(pragma < header);
        assert!(header < states);
        assert!(states < field);
        assert!(field < current);
        assert!(current < ctor);
        assert!(ctor < reopen);
        assert!(out.trim_end().ends_with('}'));
    }

    #[test]
    fn test_output_is_byte_stable() {
        let s = spec(vec![transition("init", None)]);
        let first = ContractEmitter::new(&s).emit_to_string().unwrap();
        let second = ContractEmitter::new(&s).emit_to_string().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_initial_transition_is_fatal() {
        let s = spec(vec![transition("init", None), transition("boot", None)]);
        let err = ContractEmitter::new(&s).emit_to_string().unwrap_err();
        assert!(matches!(
            err,
            CodegenError::DuplicateInitialTransition(second, first)
                if second == "boot" && first == "init"
        ));
    }

    #[test]
    fn test_auto_without_guard_is_fatal_before_any_output() {
        let mut broken = transition("expire", Some("Open"));
        broken.auto = true;
        let s = spec(vec![broken]);
        let err = ContractEmitter::new(&s).emit_to_string().unwrap_err();
        assert!(matches!(err, CodegenError::AutoWithoutGuard(name) if name == "expire"));
    }
}
