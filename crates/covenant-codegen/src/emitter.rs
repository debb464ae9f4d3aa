use crate::Result;

/// Rendering context threaded explicitly through every emit call.
///
/// Indentation depth is call-scoped state, never shared between invocations,
/// so concurrent generation of independent specifications stays correct.
#[derive(Debug, Clone)]
pub struct EmitContext {
    pub indent_level: usize,
    pub indent_chars: String,
}

impl EmitContext {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_chars: "    ".to_string(),
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    pub fn get_indent(&self) -> String {
        self.indent_chars.repeat(self.indent_level)
    }

    pub fn nested(&self) -> Self {
        let mut ctx = self.clone();
        ctx.indent();
        ctx
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EmitHelper;

impl EmitHelper {
    pub fn write_line(out: &mut String, ctx: &EmitContext, text: &str) {
        out.push_str(&ctx.get_indent());
        out.push_str(text);
        out.push('\n');
    }

    pub fn blank_line(out: &mut String) {
        out.push('\n');
    }

    /// Emit `header {`, the indented body, and the closing brace.
    pub fn write_block<F>(
        out: &mut String,
        ctx: &mut EmitContext,
        header: &str,
        body: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut String, &mut EmitContext) -> Result<()>,
    {
        Self::write_line(out, ctx, &format!("{} {{", header));
        ctx.indent();
        body(out, ctx)?;
        ctx.dedent();
        Self::write_line(out, ctx, "}");
        Ok(())
    }

    /// The rejection form of generated code: a plain early return. Reverting
    /// here would roll back approval bookkeeping recorded earlier in the call.
    pub fn write_early_return(out: &mut String, ctx: &mut EmitContext, condition: &str) -> Result<()> {
        Self::write_block(out, ctx, &format!("if ({})", condition), |out, ctx| {
            Self::write_line(out, ctx, "return;");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_context_indentation() {
        let mut ctx = EmitContext::new();
        assert_eq!(ctx.get_indent(), "");

        ctx.indent();
        assert_eq!(ctx.get_indent(), "    ");

        ctx.indent();
        assert_eq!(ctx.get_indent(), "        ");

        ctx.dedent();
        ctx.dedent();
        ctx.dedent();
        assert_eq!(ctx.get_indent(), "");
    }

    #[test]
    fn test_nested_context_leaves_original_untouched() {
        let ctx = EmitContext::new();
        let nested = ctx.nested();
        assert_eq!(ctx.indent_level, 0);
        assert_eq!(nested.indent_level, 1);
    }

    #[test]
    fn test_write_block() {
        let mut out = String::new();
        let mut ctx = EmitContext::new();
        EmitHelper::write_block(&mut out, &mut ctx, "contract Demo", |out, ctx| {
            EmitHelper::write_line(out, ctx, "uint public total;");
            Ok(())
        })
        .unwrap();
        assert_eq!(out, "contract Demo {\n    uint public total;\n}\n");
        assert_eq!(ctx.indent_level, 0);
    }
}
