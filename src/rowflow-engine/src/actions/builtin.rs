//! Built-in accumulators.

use std::fmt;
use std::sync::Arc;

use common_error::{FlowError, FlowResult};
use rowflow_core::{FromValue, RowIndex};

use super::histogram::HistogramModel;
use super::{Accumulator, EachFn};
use crate::func::Row;

/// Scalar types `sum`, `min` and `max` operate on.
pub trait Numeric: FromValue + Copy + PartialOrd + Send + Sync + fmt::Debug {
    /// Additive identity.
    const ZERO: Self;

    /// Addition used by `sum`; `None` on overflow.
    fn checked_sum(self, other: Self) -> Option<Self>;
}

macro_rules! impl_numeric {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                const ZERO: Self = 0;

                fn checked_sum(self, other: Self) -> Option<Self> {
                    self.checked_add(other)
                }
            }
        )*
    };
}

impl_numeric!(i64, i32, u32);

impl Numeric for f64 {
    const ZERO: Self = 0.0;

    fn checked_sum(self, other: Self) -> Option<Self> {
        Some(self + other)
    }
}

/// Number of accepted rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count {
    rows: u64,
}

impl Accumulator for Count {
    type Output = u64;

    fn fold(&mut self, _row: &Row<'_>) -> FlowResult<()> {
        self.rows += 1;
        Ok(())
    }

    fn merge(&mut self, other: Self) -> FlowResult<()> {
        self.rows += other.rows;
        Ok(())
    }

    fn finish(self) -> FlowResult<u64> {
        Ok(self.rows)
    }
}

/// Sum of a scalar branch.
#[derive(Debug, Clone, Copy)]
pub struct Sum<T> {
    total: T,
}

impl<T: Numeric> Default for Sum<T> {
    fn default() -> Self {
        Self { total: T::ZERO }
    }
}

impl<T: Numeric> Accumulator for Sum<T> {
    type Output = T;

    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()> {
        let value = row.get::<T>(0)?;
        self.total = self.total.checked_sum(value).ok_or_else(|| {
            FlowError::value_error(format!(
                "sum of branch \"{}\" overflows at row {}",
                row.branches().first().map_or("", String::as_str),
                row.index()
            ))
        })?;
        Ok(())
    }

    fn merge(&mut self, other: Self) -> FlowResult<()> {
        self.total = self
            .total
            .checked_sum(other.total)
            .ok_or_else(|| FlowError::value_error("sum overflows while merging slots"))?;
        Ok(())
    }

    fn finish(self) -> FlowResult<T> {
        Ok(self.total)
    }
}

fn keep<T: Numeric>(current: &mut Option<T>, candidate: T, better: fn(&T, &T) -> bool) {
    match current {
        Some(held) if !better(&candidate, held) => {}
        _ => *current = Some(candidate),
    }
}

/// Minimum of a scalar branch; `None` when no row was accepted.
#[derive(Debug, Clone, Copy)]
pub struct Min<T> {
    value: Option<T>,
}

impl<T> Default for Min<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: Numeric> Accumulator for Min<T> {
    type Output = Option<T>;

    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()> {
        keep(&mut self.value, row.get::<T>(0)?, |a, b| a < b);
        Ok(())
    }

    fn merge(&mut self, other: Self) -> FlowResult<()> {
        if let Some(v) = other.value {
            keep(&mut self.value, v, |a, b| a < b);
        }
        Ok(())
    }

    fn finish(self) -> FlowResult<Option<T>> {
        Ok(self.value)
    }
}

/// Maximum of a scalar branch; `None` when no row was accepted.
#[derive(Debug, Clone, Copy)]
pub struct Max<T> {
    value: Option<T>,
}

impl<T> Default for Max<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: Numeric> Accumulator for Max<T> {
    type Output = Option<T>;

    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()> {
        keep(&mut self.value, row.get::<T>(0)?, |a, b| a > b);
        Ok(())
    }

    fn merge(&mut self, other: Self) -> FlowResult<()> {
        if let Some(v) = other.value {
            keep(&mut self.value, v, |a, b| a > b);
        }
        Ok(())
    }

    fn finish(self) -> FlowResult<Option<T>> {
        Ok(self.value)
    }
}

/// Mean of a numeric branch.
///
/// Integers and booleans are read as `f64`; a collection branch contributes
/// each of its elements. The mean of no values is `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean {
    sum: f64,
    entries: u64,
}

impl Accumulator for Mean {
    type Output = f64;

    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()> {
        for v in row.numeric(0)? {
            self.sum += v;
            self.entries += 1;
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> FlowResult<()> {
        self.sum += other.sum;
        self.entries += other.entries;
        Ok(())
    }

    fn finish(self) -> FlowResult<f64> {
        if self.entries == 0 {
            Ok(0.0)
        } else {
            Ok(self.sum / self.entries as f64)
        }
    }
}

/// Values of a branch for every accepted row, in row order.
#[derive(Debug, Clone)]
pub struct Take<T> {
    values: Vec<(RowIndex, T)>,
}

impl<T> Default for Take<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T: FromValue + Sync> Accumulator for Take<T> {
    type Output = Vec<T>;

    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()> {
        self.values.push((row.index(), row.get::<T>(0)?));
        Ok(())
    }

    fn merge(&mut self, other: Self) -> FlowResult<()> {
        self.values.extend(other.values);
        Ok(())
    }

    fn finish(mut self) -> FlowResult<Vec<T>> {
        // Slots finish in arbitrary order; rows are globally indexed.
        self.values.sort_by_key(|(index, _)| *index);
        Ok(self.values.into_iter().map(|(_, v)| v).collect())
    }
}

/// Fold of a branch with a user binary operation.
///
/// Every slot starts from the initial value; slot partials are then combined
/// with the same operation.
pub struct Reduce<T> {
    value: Option<T>,
    op: Arc<dyn Fn(T, T) -> T + Send + Sync>,
}

impl<T> Reduce<T> {
    /// Create a reduction starting from `init`.
    pub fn new(init: T, op: Arc<dyn Fn(T, T) -> T + Send + Sync>) -> Self {
        Self {
            value: Some(init),
            op,
        }
    }

    fn combine(&mut self, other: T) {
        self.value = Some(match self.value.take() {
            Some(current) => (self.op)(current, other),
            None => other,
        });
    }
}

impl<T: fmt::Debug> fmt::Debug for Reduce<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reduce")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl<T: FromValue + Sync> Accumulator for Reduce<T> {
    type Output = T;

    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()> {
        let value = row.get::<T>(0)?;
        self.combine(value);
        Ok(())
    }

    fn merge(&mut self, other: Self) -> FlowResult<()> {
        if let Some(v) = other.value {
            self.combine(v);
        }
        Ok(())
    }

    fn finish(self) -> FlowResult<T> {
        self.value
            .ok_or_else(|| FlowError::internal("reduction lost its value"))
    }
}

/// Histogram fill of a numeric branch into a copy of a model histogram.
#[derive(Debug, Clone)]
pub struct Histo<H> {
    histogram: H,
}

impl<H> Histo<H> {
    /// Fill into `histogram`.
    pub fn new(histogram: H) -> Self {
        Self { histogram }
    }
}

impl<H: HistogramModel> Accumulator for Histo<H> {
    type Output = H;

    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()> {
        for v in row.numeric(0)? {
            self.histogram.fill(v);
        }
        Ok(())
    }

    fn merge(&mut self, other: Self) -> FlowResult<()> {
        self.histogram.merge(&other.histogram)
    }

    fn finish(self) -> FlowResult<H> {
        Ok(self.histogram)
    }
}

/// Side-effecting action: invokes its callback for every accepted row.
pub struct Each {
    callback: EachFn,
}

impl Each {
    pub(crate) fn new(callback: EachFn) -> Self {
        Self { callback }
    }
}

impl fmt::Debug for Each {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Each").finish_non_exhaustive()
    }
}

impl Accumulator for Each {
    type Output = ();

    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()> {
        (self.callback)(row.slot(), row.branches(), row.values())
    }

    fn merge(&mut self, _other: Self) -> FlowResult<()> {
        Ok(())
    }

    fn finish(self) -> FlowResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowflow_core::Value;

    fn feed<A: Accumulator>(acc: &mut A, rows: &[(RowIndex, Value)]) {
        let branches = vec!["x".to_string()];
        for (index, value) in rows {
            let values = [value.clone()];
            acc.fold(&Row::new(0, *index, &branches, &values)).unwrap();
        }
    }

    fn ints(rows: &[(RowIndex, i64)]) -> Vec<(RowIndex, Value)> {
        rows.iter().map(|&(i, v)| (i, Value::Int64(v))).collect()
    }

    #[test]
    fn test_sum_min_max_merge() {
        let mut sum = Sum::<i64>::default();
        let mut min = Min::<i64>::default();
        let mut max = Max::<i64>::default();
        let first = ints(&[(0, 5), (1, -3)]);
        feed(&mut sum, &first);
        feed(&mut min, &first);
        feed(&mut max, &first);

        let mut sum2 = Sum::<i64>::default();
        let mut min2 = Min::<i64>::default();
        let mut max2 = Max::<i64>::default();
        let second = ints(&[(2, 9)]);
        feed(&mut sum2, &second);
        feed(&mut min2, &second);
        feed(&mut max2, &second);

        sum.merge(sum2).unwrap();
        min.merge(min2).unwrap();
        max.merge(max2).unwrap();
        assert_eq!(sum.finish().unwrap(), 11);
        assert_eq!(min.finish().unwrap(), Some(-3));
        assert_eq!(max.finish().unwrap(), Some(9));
    }

    #[test]
    fn test_min_of_nothing() {
        let mut min = Min::<f64>::default();
        min.merge(Min::default()).unwrap();
        assert_eq!(min.finish().unwrap(), None);
    }

    #[test]
    fn test_mean_flattens_collections() {
        let mut mean = Mean::default();
        feed(
            &mut mean,
            &[
                (0, Value::Int64(1)),
                (1, Value::from(vec![2.0f64, 3.0])),
            ],
        );
        assert!((mean.finish().unwrap() - 2.0).abs() < f64::EPSILON);
        assert_eq!(Mean::default().finish().unwrap(), 0.0);
    }

    #[test]
    fn test_take_restores_row_order() {
        let mut late = Take::<i64>::default();
        feed(&mut late, &ints(&[(5, 50), (6, 60)]));
        let mut early = Take::<i64>::default();
        feed(&mut early, &ints(&[(0, 0), (1, 10)]));

        late.merge(early).unwrap();
        assert_eq!(late.finish().unwrap(), vec![0, 10, 50, 60]);
    }

    #[test]
    fn test_reduce_starts_each_slot_from_init() {
        let op: Arc<dyn Fn(i64, i64) -> i64 + Send + Sync> = Arc::new(|a, b| a.max(b));
        let mut a = Reduce::new(0, Arc::clone(&op));
        let mut b = Reduce::new(0, op);
        feed(&mut a, &ints(&[(0, -4), (1, 3)]));
        feed(&mut b, &ints(&[(2, 7)]));
        a.merge(b).unwrap();
        assert_eq!(a.finish().unwrap(), 7);
    }

    #[test]
    fn test_sum_type_mismatch() {
        let mut sum = Sum::<f64>::default();
        let branches = vec!["x".to_string()];
        let values = [Value::Int64(1)];
        assert!(sum.fold(&Row::new(0, 0, &branches, &values)).is_err());
    }

    #[test]
    fn test_sum_overflow_is_an_error() {
        let mut sum = Sum::<i32>::default();
        let branches = vec!["x".to_string()];
        let big = [Value::Int64(2_000_000_000)];
        sum.fold(&Row::new(0, 0, &branches, &big)).unwrap();
        let err = sum.fold(&Row::new(0, 1, &branches, &big)).unwrap_err();
        assert!(matches!(err, FlowError::ValueError(_)));

        let mut left = Sum::<u32>::default();
        let mut right = Sum::<u32>::default();
        feed(&mut left, &ints(&[(0, 3_000_000_000)]));
        feed(&mut right, &ints(&[(1, 3_000_000_000)]));
        assert!(left.merge(right).is_err());
    }
}
