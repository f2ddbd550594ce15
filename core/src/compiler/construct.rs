use compact_str::CompactString;

use super::{Compiled, Compiler, Scope};
use crate::error::{Result, ResultExt};
use crate::expr::Expr;
use crate::target::Segment;

impl Compiler<'_> {
    /// `{ a: ..., b: ... }`: every member lands beneath its own name.
    pub(super) fn member_init(
        &mut self,
        expr: &Expr,
        members: &[(CompactString, Expr)],
        scope: Scope<'_>,
    ) -> Result<Compiled> {
        let mut out = Compiled::default();
        for (name, value) in members {
            let compiled = self.compile_value(value, scope).within(expr)?;
            out.merge(compiled.prefixed(Segment::Field(name.clone())));
        }
        Ok(out)
    }

    /// Tuples, constructor calls and array literals: positional targets.
    pub(super) fn construct(
        &mut self,
        expr: &Expr,
        items: &[Expr],
        scope: Scope<'_>,
    ) -> Result<Compiled> {
        let mut out = Compiled::default();
        for (index, item) in items.iter().enumerate() {
            let compiled = self.compile_value(item, scope).within(expr)?;
            out.merge(compiled.prefixed(Segment::Arg(index)));
        }
        Ok(out)
    }
}
