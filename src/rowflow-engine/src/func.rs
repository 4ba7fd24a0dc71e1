//! Typed callbacks over dynamically typed rows.
//!
//! A booked callback declares its parameters through its Rust signature.
//! [`RowFn`] exposes the parameter count, used to validate the branch list
//! at booking time, and decodes each branch value into the matching
//! parameter type when the row is read, failing with `TypeMismatch` if the
//! stored value has a different type.

use common_error::{FlowError, FlowResult};
use rowflow_core::{FromValue, RowIndex, SlotId, Value};

/// A callback taking one typed argument per branch.
///
/// Implemented for every `Fn(A1, ..., An) -> Out` (up to eight parameters)
/// whose parameter types implement [`FromValue`].
pub trait RowFn<Args, Out>: Send + Sync + 'static {
    /// Number of parameters.
    fn arity(&self) -> usize;

    /// Decode `values` (read from `branches`) and invoke the callback.
    fn call(&self, branches: &[String], values: &[Value]) -> FlowResult<Out>;
}

/// A callback taking the slot id followed by one typed argument per branch.
pub trait SlotRowFn<Args>: Send + Sync + 'static {
    /// Number of branch parameters (the slot id is not counted).
    fn arity(&self) -> usize;

    /// Decode `values` and invoke the callback for `slot`.
    fn call(&self, slot: SlotId, branches: &[String], values: &[Value]) -> FlowResult<()>;
}

/// Conversion of a callback's return value into the engine's result type.
///
/// Callbacks may return a plain value or a `FlowResult` of it; an error
/// aborts the traversal.
pub trait CallbackOutput<T> {
    /// Convert into a `FlowResult`.
    fn into_flow(self) -> FlowResult<T>;
}

impl CallbackOutput<bool> for bool {
    fn into_flow(self) -> FlowResult<bool> {
        Ok(self)
    }
}

impl CallbackOutput<bool> for FlowResult<bool> {
    fn into_flow(self) -> FlowResult<bool> {
        self
    }
}

impl CallbackOutput<()> for () {
    fn into_flow(self) -> FlowResult<()> {
        Ok(())
    }
}

impl CallbackOutput<()> for FlowResult<()> {
    fn into_flow(self) -> FlowResult<()> {
        self
    }
}

macro_rules! impl_value_output {
    ($($t:ty),*) => {
        $(
            impl CallbackOutput<Value> for $t {
                fn into_flow(self) -> FlowResult<Value> {
                    Ok(Value::from(self))
                }
            }
        )*
    };
}

impl_value_output!(bool, i64, i32, u32, f64, f32, String, &'static str);

impl CallbackOutput<Value> for Value {
    fn into_flow(self) -> FlowResult<Value> {
        Ok(self)
    }
}

impl<T: Into<Value>> CallbackOutput<Value> for Vec<T> {
    fn into_flow(self) -> FlowResult<Value> {
        Ok(Value::from(self))
    }
}

impl<T: Into<Value>> CallbackOutput<Value> for Option<T> {
    fn into_flow(self) -> FlowResult<Value> {
        Ok(Value::from(self))
    }
}

impl<T: CallbackOutput<Value>> CallbackOutput<Value> for FlowResult<T> {
    fn into_flow(self) -> FlowResult<Value> {
        self.and_then(CallbackOutput::into_flow)
    }
}

fn check_len(expected: usize, branches: &[String], values: &[Value]) -> FlowResult<()> {
    if values.len() == expected && branches.len() == expected {
        Ok(())
    } else {
        Err(FlowError::internal(format!(
            "callback expects {expected} values, got {}",
            values.len()
        )))
    }
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_row_fn {
    ($($ty:ident $var:ident),*) => {
        impl<Func, Out, $($ty,)*> RowFn<($($ty,)*), Out> for Func
        where
            Func: Fn($($ty),*) -> Out + Send + Sync + 'static,
            $($ty: FromValue,)*
        {
            fn arity(&self) -> usize {
                count!($($ty)*)
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn call(&self, branches: &[String], values: &[Value]) -> FlowResult<Out> {
                check_len(count!($($ty)*), branches, values)?;
                let mut pos = 0usize;
                $(
                    let $var = $ty::decode(&branches[pos], &values[pos])?;
                    pos += 1;
                )*
                Ok((self)($($var),*))
            }
        }

        impl<Func, Out, $($ty,)*> SlotRowFn<($($ty,)*)> for Func
        where
            Func: Fn(SlotId, $($ty),*) -> Out + Send + Sync + 'static,
            Out: CallbackOutput<()>,
            $($ty: FromValue,)*
        {
            fn arity(&self) -> usize {
                count!($($ty)*)
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn call(&self, slot: SlotId, branches: &[String], values: &[Value]) -> FlowResult<()> {
                check_len(count!($($ty)*), branches, values)?;
                let mut pos = 0usize;
                $(
                    let $var = $ty::decode(&branches[pos], &values[pos])?;
                    pos += 1;
                )*
                (self)(slot, $($var),*).into_flow()
            }
        }
    };
}

impl_row_fn!();
impl_row_fn!(A a);
impl_row_fn!(A a, B b);
impl_row_fn!(A a, B b, C c);
impl_row_fn!(A a, B b, C c, D d);
impl_row_fn!(A a, B b, C c, D d, E e);
impl_row_fn!(A a, B b, C c, D d, E e, F f);
impl_row_fn!(A a, B b, C c, D d, E e, F f, G g);
impl_row_fn!(A a, B b, C c, D d, E e, F f, G g, H h);

/// The values an action receives for one accepted row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    slot: SlotId,
    index: RowIndex,
    branches: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub(crate) fn new(
        slot: SlotId,
        index: RowIndex,
        branches: &'a [String],
        values: &'a [Value],
    ) -> Self {
        Self {
            slot,
            index,
            branches,
            values,
        }
    }

    /// Slot processing this row.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Index of this row.
    pub fn index(&self) -> RowIndex {
        self.index
    }

    /// Number of branch values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row carries no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of the branches the values were read from.
    pub fn branches(&self) -> &'a [String] {
        self.branches
    }

    /// All branch values, in branch order.
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Name of the branch at `pos`.
    pub fn branch(&self, pos: usize) -> FlowResult<&'a str> {
        self.branches
            .get(pos)
            .map(String::as_str)
            .ok_or_else(|| FlowError::internal(format!("no branch at position {pos}")))
    }

    /// Raw value at `pos`.
    pub fn value(&self, pos: usize) -> FlowResult<&'a Value> {
        self.values
            .get(pos)
            .ok_or_else(|| FlowError::internal(format!("no value at position {pos}")))
    }

    /// Value at `pos` decoded as `T`.
    pub fn get<T: FromValue>(&self, pos: usize) -> FlowResult<T> {
        T::decode(self.branch(pos)?, self.value(pos)?)
    }

    /// Value at `pos` read as numbers: a scalar yields one element, a
    /// collection one element per entry.
    pub fn numeric(&self, pos: usize) -> FlowResult<Vec<f64>> {
        let value = self.value(pos)?;
        let branch = self.branch(pos)?;
        value
            .numeric_elements()
            .ok_or_else(|| FlowError::type_mismatch(branch, "numeric", value.type_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| (*s).to_string()).collect()
    }

    fn invoke<Args, Out, F: RowFn<Args, Out>>(f: F, b: &[&str], v: &[Value]) -> FlowResult<Out> {
        f.call(&names(b), v)
    }

    fn arity_of<Args, Out, F: RowFn<Args, Out>>(f: F) -> usize {
        f.arity()
    }

    #[test]
    fn test_arity() {
        assert_eq!(arity_of(|| true), 0);
        assert_eq!(arity_of(|x: i64| x > 0), 1);
        assert_eq!(arity_of(|x: i64, y: f64, s: String| x as f64 + y > s.len() as f64), 3);
    }

    #[test]
    fn test_call_decodes_arguments() {
        let out = invoke(
            |x: i64, y: f64| x as f64 * y,
            &["x", "y"],
            &[Value::Int64(3), Value::Float64(0.5)],
        )
        .unwrap();
        assert!((out - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_call_type_mismatch() {
        let err = invoke(|x: f64| x > 0.0, &["x"], &[Value::Int64(3)]).unwrap_err();
        assert!(matches!(err, FlowError::TypeMismatch { ref branch, .. } if branch == "x"));
    }

    #[test]
    fn test_slot_fn() {
        let f = |slot: SlotId, x: i64| {
            assert_eq!(slot, 2);
            assert_eq!(x, 9);
        };
        SlotRowFn::call(&f, 2, &names(&["x"]), &[Value::Int64(9)]).unwrap();
        assert_eq!(SlotRowFn::arity(&f), 1);
    }

    #[test]
    fn test_outputs() {
        assert!(CallbackOutput::<bool>::into_flow(true).unwrap());
        assert_eq!(
            CallbackOutput::<Value>::into_flow(Ok::<_, FlowError>(2.5f64)).unwrap(),
            Value::Float64(2.5)
        );
        assert!(CallbackOutput::<Value>::into_flow(Err::<i64, _>(FlowError::execution("x"))).is_err());
    }

    #[test]
    fn test_row_accessors() {
        let branches = names(&["n", "jets"]);
        let values = [Value::Int64(2), Value::from(vec![1.0f64, 2.0])];
        let row = Row::new(0, 5, &branches, &values);

        assert_eq!(row.index(), 5);
        assert_eq!(row.get::<i64>(0).unwrap(), 2);
        assert_eq!(row.numeric(1).unwrap(), vec![1.0, 2.0]);
        assert!(row.get::<String>(0).is_err());
        assert!(row.value(2).is_err());
    }
}
