use crate::emitter::{EmitContext, EmitHelper};
use crate::expr::ExprRenderer;
use crate::Result;
use covenant_ast::Statement;

/// Fresh-temporary names for funded sends, counted per compiled procedure.
#[derive(Debug, Default)]
pub struct TempAllocator {
    next: u32,
}

impl TempAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> String {
        let name = format!("_amt{}", self.next);
        self.next += 1;
        name
    }
}

/// Render one statement at the current indentation depth.
///
/// Amount expressions are trusted non-negative (validated upstream). A send
/// with a funding source binds the amount once and decrements the source
/// before the transfer, so a reentrant callee never observes a pre-decrement
/// balance and a side-effecting amount expression is evaluated exactly once.
pub fn emit(
    out: &mut String,
    ctx: &EmitContext,
    stmt: &Statement,
    renderer: &ExprRenderer<'_>,
    temps: &mut TempAllocator,
) -> Result<()> {
    match stmt {
        Statement::Assign { target, value } => {
            EmitHelper::write_line(
                out,
                ctx,
                &format!("{} = {};", renderer.assignable(target)?, renderer.render(value)?),
            );
        }
        Statement::Send {
            destination,
            amount,
            source: None,
        } => {
            EmitHelper::write_line(
                out,
                ctx,
                &format!(
                    "{}.transfer({});",
                    renderer.child(destination)?,
                    renderer.render(amount)?
                ),
            );
        }
        Statement::Send {
            destination,
            amount,
            source: Some(source),
        } => {
            let tmp = temps.fresh();
            EmitHelper::write_line(
                out,
                ctx,
                &format!("uint {} = {};", tmp, renderer.render(amount)?),
            );
            EmitHelper::write_line(out, ctx, &format!("{} = {} - {};", source, source, tmp));
            EmitHelper::write_line(
                out,
                ctx,
                &format!("{}.transfer({});", renderer.child(destination)?, tmp),
            );
        }
        Statement::Append { sequence, element } => {
            EmitHelper::write_line(
                out,
                ctx,
                &format!(
                    "{}.push({});",
                    renderer.assignable(sequence)?,
                    renderer.render(element)?
                ),
            );
        }
        Statement::Clear { sequence } => {
            EmitHelper::write_line(
                out,
                ctx,
                &format!("delete {};", renderer.assignable(sequence)?),
            );
        }
    }
    Ok(())
}
