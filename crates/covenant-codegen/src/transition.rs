use crate::auth;
use crate::emitter::{EmitContext, EmitHelper};
use crate::expr::{ExprRenderer, Scope};
use crate::helpers::payable_params;
use crate::stmt::{self, TempAllocator};
use crate::types::{lower, needs_memory_location};
use crate::{CodegenError, Result};
use covenant_ast::{StateMachine, Transition};

/// Compile one transition into one callable procedure.
///
/// Assembly order: origin guard, auto-transition interposition, the
/// transition's own guard, authorization, destination-state update, body,
/// and approval reset on self-loops. Every check rejects by returning early
/// with state untouched.
pub fn emit(
    out: &mut String,
    ctx: &mut EmitContext,
    machine: &StateMachine,
    transition: &Transition,
) -> Result<()> {
    tracing::trace!(transition = %transition.name, "compiling transition");
    let renderer = ExprRenderer::new(Scope::new(&machine.fields, &transition.parameters));
    let mut temps = TempAllocator::new();

    EmitHelper::write_block(out, ctx, &header(transition), |out, ctx| {
        if let Some(origin) = &transition.origin {
            EmitHelper::write_early_return(
                out,
                ctx,
                &format!("currentState != State.{}", origin),
            )?;
            emit_auto_chain(out, ctx, machine, transition, origin, &mut temps)?;
        }

        if let Some(guard) = &transition.guard {
            EmitHelper::write_early_return(out, ctx, &format!("!({})", renderer.render(guard)?))?;
        }

        auth::emit_checks(out, ctx, transition, &renderer)?;

        if !transition.is_self_loop() {
            EmitHelper::write_line(
                out,
                ctx,
                &format!("currentState = State.{};", transition.destination),
            );
        }

        for statement in &transition.body {
            stmt::emit(out, ctx, statement, &renderer, &mut temps)?;
        }

        if transition.is_self_loop() {
            auth::emit_reset(out, ctx, transition)?;
        }

        Ok(())
    })
}

fn header(transition: &Transition) -> String {
    let payable = payable_params(transition);
    let params = transition
        .parameters
        .iter()
        .map(|p| {
            let lowered = lower(&p.ty, payable.contains(p.name.as_str()));
            let location = if needs_memory_location(&p.ty) {
                " memory"
            } else {
                ""
            };
            format!("{}{} {}", lowered, location, p.name)
        })
        .collect::<Vec<_>>()
        .join(", ");

    if transition.is_initial() {
        format!("constructor({}) public payable", params)
    } else {
        format!("function {}({}) public payable", transition.name, params)
    }
}

/// Opportunistic triggers run ahead of the requested transition: the first
/// auto sibling whose guard holds applies its own effects and ends the call.
fn emit_auto_chain(
    out: &mut String,
    ctx: &mut EmitContext,
    machine: &StateMachine,
    transition: &Transition,
    origin: &str,
    temps: &mut TempAllocator,
) -> Result<()> {
    let autos: Vec<&Transition> = machine
        .auto_transitions_from(origin, &transition.name)
        .collect();
    if autos.is_empty() {
        return Ok(());
    }

    for (i, auto_t) in autos.iter().enumerate() {
        let guard = auto_t
            .guard
            .as_ref()
            .ok_or_else(|| CodegenError::AutoWithoutGuard(auto_t.name.clone()))?;
        let auto_renderer = ExprRenderer::new(Scope::new(&machine.fields, &auto_t.parameters));
        let rendered_guard = auto_renderer.render(guard)?;
        if i == 0 {
            EmitHelper::write_line(out, ctx, &format!("if ({}) {{", rendered_guard));
        } else {
            EmitHelper::write_line(out, ctx, &format!("}} else if ({}) {{", rendered_guard));
        }
        ctx.indent();
        if !auto_t.is_self_loop() {
            EmitHelper::write_line(
                out,
                ctx,
                &format!("currentState = State.{};", auto_t.destination),
            );
        }
        for statement in &auto_t.body {
            stmt::emit(out, ctx, statement, &auto_renderer, temps)?;
        }
        EmitHelper::write_line(out, ctx, "return;");
        ctx.dedent();
    }
    EmitHelper::write_line(out, ctx, "}");
    Ok(())
}
