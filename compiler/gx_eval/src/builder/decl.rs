//! Package-level declarations.
//!
//! Each `var` spec and each line of a `const` block compiles to its own
//! unit: a parameterless graph run directly in the package scope. Units are
//! independent so the package initializer can retry one whose operands are
//! not declared yet.

use std::rc::Rc;

use gx_ir::{ConstBlock, Expr, Name, Signature, Span, Type, ValueSpec};
use smallvec::SmallVec;

use super::{unsupported, CompileError, Compiler, FuncBuilder};
use crate::flow::{CompiledFunc, FuncFlags, StepOp};

/// One line of a `const` block with omitted values filled in from the
/// previous line.
#[derive(Debug)]
pub struct ConstEntry<'b> {
    pub names: &'b [Name],
    pub ty: Option<&'b Type>,
    pub values: &'b [Expr],
    /// Index of the line within its block.
    pub iota: i128,
    pub span: Span,
}

/// Lines of `block`, each paired with its `iota`.
pub fn expand_const_block(block: &ConstBlock) -> Vec<ConstEntry<'_>> {
    let mut entries = Vec::with_capacity(block.specs.len());
    let none: &[Expr] = &[];
    let mut previous: Option<(&[Expr], Option<&Type>)> = None;
    for (iota, spec) in (0_i128..).zip(&block.specs) {
        let (values, ty) = if spec.values.is_empty() {
            previous.unwrap_or((none, spec.ty.as_ref()))
        } else {
            (spec.values.as_slice(), spec.ty.as_ref())
        };
        previous = Some((values, ty));
        entries.push(ConstEntry {
            names: &spec.names,
            ty,
            values,
            iota,
            span: spec.span,
        });
    }
    entries
}

/// Unit initializing one package-level `var` spec.
pub fn compile_var_unit(
    cx: &mut Compiler<'_>,
    spec: &ValueSpec,
) -> Result<Rc<CompiledFunc>, CompileError> {
    let name = cx.names.init;
    let sig = Signature::default();
    let mut builder = FuncBuilder::new(cx, &sig, FuncFlags::empty(), Vec::new());
    let names = SmallVec::from_slice(&spec.names);
    if spec.values.is_empty() {
        let Some(ty) = &spec.ty else {
            return Err(unsupported("variable without type or value", spec.span));
        };
        builder.emit(
            StepOp::DeclareZero {
                names,
                ty: ty.clone(),
            },
            spec.span,
        )?;
    } else {
        let hints = vec![spec.ty.clone(); spec.names.len()];
        let arity = builder.compile_values(&spec.values, spec.names.len(), &hints)?;
        builder.emit(
            StepOp::Declare {
                names,
                ty: spec.ty.clone(),
                arity,
            },
            spec.span,
        )?;
    }
    Ok(Rc::new(builder.finish(name, &sig, None, spec.span)?))
}

/// Unit initializing one line of a package-level `const` block.
pub fn compile_const_unit(
    cx: &mut Compiler<'_>,
    entry: &ConstEntry<'_>,
) -> Result<Rc<CompiledFunc>, CompileError> {
    if entry.values.is_empty() {
        return Err(unsupported("constant without a value", entry.span));
    }
    let name = cx.names.init;
    let sig = Signature::default();
    let mut builder = FuncBuilder::new(cx, &sig, FuncFlags::empty(), Vec::new());
    builder.iota = Some(entry.iota);
    let hints = vec![entry.ty.cloned(); entry.names.len()];
    let arity = builder.compile_values(entry.values, entry.names.len(), &hints)?;
    builder.emit(
        StepOp::Declare {
            names: SmallVec::from_slice(entry.names),
            ty: entry.ty.cloned(),
            arity,
        },
        entry.span,
    )?;
    Ok(Rc::new(builder.finish(name, &sig, None, entry.span)?))
}

#[cfg(test)]
mod tests {
    use gx_ir::{AstBuilder, ConstBlock};

    use super::expand_const_block;

    #[test]
    fn omitted_values_repeat_the_previous_line() {
        let b = AstBuilder::new();
        let block = ConstBlock {
            specs: vec![
                b.const_spec(&["a"], None, vec![b.ident("iota")]),
                b.const_spec(&["b"], None, vec![]),
                b.const_spec(&["c"], None, vec![]),
            ],
        };
        let entries = expand_const_block(&block);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].iota, 2);
        assert_eq!(entries[2].values.len(), 1);
        assert_eq!(entries[1].names, &[b.name("b")]);
    }

    #[test]
    fn explicit_values_reset_the_repeated_line() {
        let b = AstBuilder::new();
        let block = ConstBlock {
            specs: vec![
                b.const_spec(&["a"], None, vec![b.int(1)]),
                b.const_spec(&["b"], Some(gx_ir::Type::String), vec![b.string("x")]),
                b.const_spec(&["c"], None, vec![]),
            ],
        };
        let entries = expand_const_block(&block);
        assert_eq!(entries[2].ty, Some(&gx_ir::Type::String));
        assert_eq!(entries[2].iota, 2);
    }
}
