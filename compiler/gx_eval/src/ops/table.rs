//! Compile-time operator resolution.

use gx_ir::{BinaryOp, IntKind, Type};
use rustc_hash::FxHashMap;

use super::{family_fn, BinaryFn, TypeKey};

const OPS: [BinaryOp; 19] = [
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::Div,
    BinaryOp::Rem,
    BinaryOp::BitAnd,
    BinaryOp::BitOr,
    BinaryOp::BitXor,
    BinaryOp::AndNot,
    BinaryOp::Shl,
    BinaryOp::Shr,
    BinaryOp::Eq,
    BinaryOp::NotEq,
    BinaryOp::Lt,
    BinaryOp::LtEq,
    BinaryOp::Gt,
    BinaryOp::GtEq,
    BinaryOp::LogicalAnd,
    BinaryOp::LogicalOr,
];

/// Family functions keyed by `(left type, operator, right type)`.
///
/// Holds an entry for every operator defined on a pair of identical basic
/// types, and for shifts between any two integer kinds.
pub struct OperatorTable {
    entries: FxHashMap<(TypeKey, BinaryOp, TypeKey), BinaryFn>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorTable {
    pub fn new() -> Self {
        let mut entries = FxHashMap::default();
        for key in TypeKey::all() {
            for op in OPS {
                if op.is_shift() {
                    continue;
                }
                if let Some(func) = family_fn(key, op) {
                    entries.insert((key, op, key), func);
                }
            }
        }
        for left in IntKind::ALL {
            for right in IntKind::ALL {
                for op in [BinaryOp::Shl, BinaryOp::Shr] {
                    if let Some(func) = family_fn(TypeKey::Int(left), op) {
                        entries.insert((TypeKey::Int(left), op, TypeKey::Int(right)), func);
                    }
                }
            }
        }
        OperatorTable { entries }
    }

    /// Entry for a key triple.
    pub fn get(&self, left: TypeKey, op: BinaryOp, right: TypeKey) -> Option<BinaryFn> {
        self.entries.get(&(left, op, right)).copied()
    }

    /// Entry for two static types; `None` unless both are basic.
    pub fn resolve(&self, left: &Type, op: BinaryOp, right: &Type) -> Option<BinaryFn> {
        self.get(TypeKey::of(left)?, op, TypeKey::of(right)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
