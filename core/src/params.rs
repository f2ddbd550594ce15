//! The parameter pool: constants and argument references lifted out of a
//! mapping and bound as SQL parameters.

use core::fmt;

use crate::error::{Result, RowshapeError};
use crate::expr::{Expr, eval};
use crate::value::Value;

/// Index of a slot in a [`ParamPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub(crate) u32);

impl ParamId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@p{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// Folded at compile time
    Value(Value),
    /// Depends on the arguments object; evaluated per execution
    Deferred(Expr),
}

#[derive(Debug, Clone, PartialEq)]
struct ParamSlot {
    source: ParamSource,
    /// Bound as a list and rendered as one placeholder per element
    expand: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamPool {
    slots: Vec<ParamSlot>,
}

impl ParamPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, source: ParamSource) -> ParamId {
        let id = ParamId(self.slots.len() as u32);
        self.slots.push(ParamSlot {
            source,
            expand: false,
        });
        id
    }

    pub fn register_value(&mut self, value: Value) -> ParamId {
        self.push(ParamSource::Value(value))
    }

    pub fn register_deferred(&mut self, expr: Expr) -> ParamId {
        self.push(ParamSource::Deferred(expr))
    }

    pub fn mark_expanded(&mut self, id: ParamId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            slot.expand = true;
        }
    }

    pub fn is_expanded(&self, id: ParamId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.expand)
    }

    pub fn has_expansions(&self) -> bool {
        self.slots.iter().any(|s| s.expand)
    }

    pub fn source(&self, id: ParamId) -> Option<&ParamSource> {
        self.slots.get(id.index()).map(|s| &s.source)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Produces one value per slot, evaluating deferred slots against `args`.
    pub fn bind(&self, args: &serde_json::Value) -> Result<Vec<Value>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let value = match &slot.source {
                    ParamSource::Value(value) => value.clone(),
                    ParamSource::Deferred(expr) => eval::evaluate(expr, args)?,
                };
                match (&value, slot.expand) {
                    (Value::List(_), true) => Ok(value),
                    (Value::List(_), false) => Err(RowshapeError::Parameter(format!(
                        "parameter @p{i} is a list but is not the right side of a membership test"
                    ))),
                    (_, true) => Err(RowshapeError::Parameter(format!(
                        "parameter @p{i} is the right side of a membership test and must be a list, got {value}"
                    ))),
                    (_, false) => Ok(value),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deferred_parameters_bind_per_execution() {
        let mut pool = ParamPool::new();
        let a = pool.register_value(Value::Integer(1));
        let b = pool.register_deferred(Expr::args().field("min"));
        assert_eq!((a.index(), b.index()), (0, 1));

        assert_eq!(
            pool.bind(&json!({ "min": 5 })).unwrap(),
            vec![Value::Integer(1), Value::Integer(5)]
        );
        assert_eq!(
            pool.bind(&json!({ "min": "x" })).unwrap(),
            vec![Value::Integer(1), Value::Text("x".into())]
        );
    }

    #[test]
    fn lists_only_bind_in_membership_slots() {
        let mut pool = ParamPool::new();
        let ids = pool.register_deferred(Expr::args().field("ids"));
        assert!(matches!(
            pool.bind(&json!({ "ids": [1, 2] })),
            Err(RowshapeError::Parameter(_))
        ));

        pool.mark_expanded(ids);
        assert!(pool.has_expansions());
        assert_eq!(
            pool.bind(&json!({ "ids": [1, 2] })).unwrap(),
            vec![Value::List(vec![Value::Integer(1), Value::Integer(2)])]
        );
        assert!(pool.bind(&json!({ "ids": 3 })).is_err());
    }
}
