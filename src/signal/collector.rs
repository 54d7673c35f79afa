//! Result collectors.
//!
//! A collector sees each handler result in connection order and decides
//! after every result whether the emission continues.

use std::ops::AddAssign;

use crate::any::AnyValue;

/// Folds handler results into one emission result.
pub trait Collector<R>: Default {
    type Output;

    /// Feed one result; returning false skips the remaining handlers.
    fn collect(&mut self, result: R) -> bool;

    fn finish(self) -> Self::Output;
}

/// Truth value of a handler result, used by [`CollectorUntil0`] and
/// [`CollectorWhile0`].
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

macro_rules! truthy_number {
    ($($t:ty),*) => {$(
        impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != (0 as $t)
            }
        }
    )*};
}

truthy_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl Truthy for AnyValue {
    fn is_truthy(&self) -> bool {
        self.get::<bool>().unwrap_or(false)
    }
}

/// Keeps the most recent result; the default of `R` when nothing ran.
pub struct CollectorLast<R> {
    last: Option<R>,
}

/// The collector signals use unless told otherwise.
pub type CollectorDefault<R> = CollectorLast<R>;

impl<R> Default for CollectorLast<R> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<R: Default> Collector<R> for CollectorLast<R> {
    type Output = R;

    fn collect(&mut self, result: R) -> bool {
        self.last = Some(result);
        true
    }

    fn finish(self) -> R {
        self.last.unwrap_or_default()
    }
}

/// Sums all results with `+=`.
pub struct CollectorSum<R> {
    sum: R,
}

impl<R: Default> Default for CollectorSum<R> {
    fn default() -> Self {
        Self { sum: R::default() }
    }
}

impl<R: Default + AddAssign> Collector<R> for CollectorSum<R> {
    type Output = R;

    fn collect(&mut self, result: R) -> bool {
        self.sum += result;
        true
    }

    fn finish(self) -> R {
        self.sum
    }
}

/// Runs handlers until one returns a falsy result, and returns that result.
pub struct CollectorUntil0<R> {
    last: R,
}

impl<R: Default> Default for CollectorUntil0<R> {
    fn default() -> Self {
        Self { last: R::default() }
    }
}

impl<R: Default + Truthy> Collector<R> for CollectorUntil0<R> {
    type Output = R;

    fn collect(&mut self, result: R) -> bool {
        let proceed = result.is_truthy();
        self.last = result;
        proceed
    }

    fn finish(self) -> R {
        self.last
    }
}

/// Runs handlers while they return falsy results; stops at and returns the
/// first truthy one.
pub struct CollectorWhile0<R> {
    last: R,
}

impl<R: Default> Default for CollectorWhile0<R> {
    fn default() -> Self {
        Self { last: R::default() }
    }
}

impl<R: Default + Truthy> Collector<R> for CollectorWhile0<R> {
    type Output = R;

    fn collect(&mut self, result: R) -> bool {
        let proceed = !result.is_truthy();
        self.last = result;
        proceed
    }

    fn finish(self) -> R {
        self.last
    }
}

/// Collects every result in order.
pub struct CollectorVector<R> {
    results: Vec<R>,
}

impl<R> Default for CollectorVector<R> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
        }
    }
}

impl<R> Collector<R> for CollectorVector<R> {
    type Output = Vec<R>;

    fn collect(&mut self, result: R) -> bool {
        self.results.push(result);
        true
    }

    fn finish(self) -> Vec<R> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<C: Collector<R>, R>(results: Vec<R>) -> (C::Output, usize) {
        let mut collector = C::default();
        let mut consumed = 0;
        for r in results {
            consumed += 1;
            if !collector.collect(r) {
                break;
            }
        }
        (collector.finish(), consumed)
    }

    #[test]
    fn last_and_sum() {
        assert_eq!(run::<CollectorLast<i32>, _>(vec![1, 2, 3]), (3, 3));
        assert_eq!(run::<CollectorLast<i32>, i32>(vec![]), (0, 0));
        assert_eq!(run::<CollectorSum<i32>, _>(vec![1, 2, 3]), (6, 3));
        assert_eq!(run::<CollectorSum<f64>, f64>(vec![]), (0.0, 0));
    }

    #[test]
    fn until0_stops_at_first_falsy() {
        assert_eq!(run::<CollectorUntil0<i32>, _>(vec![3, 0, 5]), (0, 2));
        assert_eq!(run::<CollectorUntil0<i32>, _>(vec![3, 4]), (4, 2));
        assert_eq!(run::<CollectorUntil0<bool>, bool>(vec![]), (false, 0));
    }

    #[test]
    fn while0_stops_at_first_truthy() {
        assert_eq!(run::<CollectorWhile0<i32>, _>(vec![0, 7, 5]), (7, 2));
        assert_eq!(
            run::<CollectorWhile0<String>, _>(vec![String::new(), String::new()]),
            (String::new(), 2)
        );
    }

    #[test]
    fn vector_collects_everything() {
        assert_eq!(
            run::<CollectorVector<&str>, _>(vec!["a", "b"]),
            (vec!["a", "b"], 2)
        );
    }

    #[test]
    fn any_value_truthiness() {
        assert!(AnyValue::from("x").is_truthy());
        assert!(!AnyValue::from(0i32).is_truthy());
        assert!(!AnyValue::new().is_truthy());
    }
}
