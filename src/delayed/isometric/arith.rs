//! Submodule providing stock arithmetic and comparison operations for the
//! isometric decorators.

use core::ops::{Add, Div, Mul, Sub};

use num_traits::{NumCast, One};

use crate::delayed::isometric::{BinaryOperation, UnaryOperation};
use crate::errors::{LayoutError, MatrixError};
use crate::traits::extractor::Subset;
use crate::traits::numeric::{MatrixIndex, MatrixValue};

/// Adds a scalar to every element.
#[derive(Clone, Copy, Debug)]
pub struct AddScalar<V> {
    value: V,
}

impl<V: MatrixValue + Add<Output = V>> AddScalar<V> {
    /// Creates the operation `x + value`.
    pub fn new(value: V) -> Self {
        Self { value }
    }
}

impl<V: MatrixValue + Add<Output = V>, I: MatrixIndex> UnaryOperation<V, I> for AddScalar<V> {
    fn preserves_sparsity(&self) -> bool {
        // Probed rather than compared against a literal zero, to behave for
        // special values like negative zero or NaN.
        V::zero() + self.value == V::zero()
    }

    fn fill(&self, _row: bool, _i: I) -> V {
        V::zero() + self.value
    }

    fn dense(&self, _row: bool, _i: I, _subset: &Subset<I>, buffer: &mut [V]) {
        for x in buffer {
            *x = *x + self.value;
        }
    }

    fn sparse(&self, _row: bool, _i: I, values: &mut [V], _indices: &[I]) {
        for x in values {
            *x = *x + self.value;
        }
    }
}

/// Multiplies every element by a scalar.
#[derive(Clone, Copy, Debug)]
pub struct MultiplyScalar<V> {
    value: V,
}

impl<V: MatrixValue + Mul<Output = V>> MultiplyScalar<V> {
    /// Creates the operation `x * value`.
    pub fn new(value: V) -> Self {
        Self { value }
    }
}

impl<V: MatrixValue + Mul<Output = V>, I: MatrixIndex> UnaryOperation<V, I> for MultiplyScalar<V> {
    fn preserves_sparsity(&self) -> bool {
        V::zero() * self.value == V::zero()
    }

    fn fill(&self, _row: bool, _i: I) -> V {
        V::zero() * self.value
    }

    fn dense(&self, _row: bool, _i: I, _subset: &Subset<I>, buffer: &mut [V]) {
        for x in buffer {
            *x = *x * self.value;
        }
    }

    fn sparse(&self, _row: bool, _i: I, values: &mut [V], _indices: &[I]) {
        for x in values {
            *x = *x * self.value;
        }
    }
}

/// Subtracts a scalar from every element, or every element from a scalar.
#[derive(Clone, Copy, Debug)]
pub struct SubtractScalar<V> {
    value: V,
    scalar_on_right: bool,
}

impl<V: MatrixValue + Sub<Output = V>> SubtractScalar<V> {
    /// Creates the operation `x - value`.
    pub fn from_right(value: V) -> Self {
        Self { value, scalar_on_right: true }
    }

    /// Creates the operation `value - x`.
    pub fn from_left(value: V) -> Self {
        Self { value, scalar_on_right: false }
    }

    fn apply(&self, x: V) -> V {
        if self.scalar_on_right { x - self.value } else { self.value - x }
    }
}

impl<V: MatrixValue + Sub<Output = V>, I: MatrixIndex> UnaryOperation<V, I> for SubtractScalar<V> {
    fn preserves_sparsity(&self) -> bool {
        self.apply(V::zero()) == V::zero()
    }

    fn fill(&self, _row: bool, _i: I) -> V {
        self.apply(V::zero())
    }

    fn dense(&self, _row: bool, _i: I, _subset: &Subset<I>, buffer: &mut [V]) {
        for x in buffer {
            *x = self.apply(*x);
        }
    }

    fn sparse(&self, _row: bool, _i: I, values: &mut [V], _indices: &[I]) {
        for x in values {
            *x = self.apply(*x);
        }
    }
}

/// Divides every element by a scalar.
#[derive(Clone, Copy, Debug)]
pub struct DivideScalar<V> {
    divisor: V,
    sparse: bool,
}

impl<V: MatrixValue + Div<Output = V> + NumCast> DivideScalar<V> {
    /// Creates the operation `x / divisor`.
    ///
    /// # Errors
    ///
    /// Fails with [`MatrixError::UnsupportedConfiguration`] when the divisor
    /// is zero and the value type has no infinities to carry the result.
    pub fn new(divisor: V) -> Result<Self, MatrixError> {
        if divisor.is_zero() && V::from(f64::INFINITY).is_none() {
            return Err(MatrixError::UnsupportedConfiguration(
                "division by zero needs a value type with IEEE semantics".into(),
            ));
        }
        let sparse = V::zero() / divisor == V::zero();
        Ok(Self { divisor, sparse })
    }
}

impl<V: MatrixValue + Div<Output = V> + NumCast, I: MatrixIndex> UnaryOperation<V, I>
    for DivideScalar<V>
{
    fn preserves_sparsity(&self) -> bool {
        self.sparse
    }

    fn fill(&self, _row: bool, _i: I) -> V {
        V::zero() / self.divisor
    }

    fn dense(&self, _row: bool, _i: I, _subset: &Subset<I>, buffer: &mut [V]) {
        for x in buffer {
            *x = *x / self.divisor;
        }
    }

    fn sparse(&self, _row: bool, _i: I, values: &mut [V], _indices: &[I]) {
        for x in values {
            *x = *x / self.divisor;
        }
    }
}

/// Which comparison a [`CompareScalar`] performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOperation {
    /// `x == value`.
    Equal,
    /// `x != value`.
    NotEqual,
    /// `x > value`.
    GreaterThan,
    /// `x < value`.
    LessThan,
    /// `x >= value`.
    GreaterThanOrEqual,
    /// `x <= value`.
    LessThanOrEqual,
}

/// Compares every element against a scalar, producing ones and zeros.
#[derive(Clone, Copy, Debug)]
pub struct CompareScalar<V> {
    operation: CompareOperation,
    value: V,
}

impl<V: MatrixValue + One> CompareScalar<V> {
    /// Creates the comparison `x <op> value`.
    pub fn new(operation: CompareOperation, value: V) -> Self {
        Self { operation, value }
    }

    fn apply(&self, x: V) -> V {
        let hit = match self.operation {
            CompareOperation::Equal => x == self.value,
            CompareOperation::NotEqual => x != self.value,
            CompareOperation::GreaterThan => x > self.value,
            CompareOperation::LessThan => x < self.value,
            CompareOperation::GreaterThanOrEqual => x >= self.value,
            CompareOperation::LessThanOrEqual => x <= self.value,
        };
        if hit { V::one() } else { V::zero() }
    }
}

impl<V: MatrixValue + One, I: MatrixIndex> UnaryOperation<V, I> for CompareScalar<V> {
    fn preserves_sparsity(&self) -> bool {
        self.apply(V::zero()) == V::zero()
    }

    fn fill(&self, _row: bool, _i: I) -> V {
        self.apply(V::zero())
    }

    fn dense(&self, _row: bool, _i: I, _subset: &Subset<I>, buffer: &mut [V]) {
        for x in buffer {
            *x = self.apply(*x);
        }
    }

    fn sparse(&self, _row: bool, _i: I, values: &mut [V], _indices: &[I]) {
        for x in values {
            *x = self.apply(*x);
        }
    }
}

/// Adds a per-row or per-column vector to the matrix.
#[derive(Clone, Debug)]
pub struct AddVector<V> {
    values: Vec<V>,
    along_rows: bool,
    sparse: bool,
}

impl<V: MatrixValue + Add<Output = V>> AddVector<V> {
    /// Creates the operation adding `values[r]` to every element of row `r`.
    pub fn along_rows(values: Vec<V>) -> Self {
        let sparse = values.iter().all(|x| V::zero() + *x == V::zero());
        Self { values, along_rows: true, sparse }
    }

    /// Creates the operation adding `values[c]` to every element of column
    /// `c`.
    pub fn along_columns(values: Vec<V>) -> Self {
        let sparse = values.iter().all(|x| V::zero() + *x == V::zero());
        Self { values, along_rows: false, sparse }
    }
}

impl<V: MatrixValue + Add<Output = V>, I: MatrixIndex> UnaryOperation<V, I> for AddVector<V> {
    fn preserves_sparsity(&self) -> bool {
        self.sparse
    }

    fn fill(&self, row: bool, i: I) -> V {
        debug_assert!(row == self.along_rows, "zero fills vary across this fetch direction");
        V::zero() + self.values[i.as_()]
    }

    fn uniform_fill(&self, row: bool) -> bool {
        // Fetching across the vector's dimension, the addend changes from
        // position to position within a single fetch.
        row == self.along_rows
    }

    fn dense(&self, row: bool, i: I, subset: &Subset<I>, buffer: &mut [V]) {
        if row == self.along_rows {
            // The addend is fixed along the target dimension.
            let addend = self.values[i.as_()];
            for x in buffer {
                *x = *x + addend;
            }
        } else {
            for (k, x) in buffer.iter_mut().enumerate() {
                *x = *x + self.values[subset.coordinate(k)];
            }
        }
    }

    fn sparse(&self, row: bool, i: I, values: &mut [V], indices: &[I]) {
        if row == self.along_rows {
            let addend = self.values[i.as_()];
            for x in values {
                *x = *x + addend;
            }
        } else {
            for (x, idx) in values.iter_mut().zip(indices) {
                *x = *x + self.values[idx.as_()];
            }
        }
    }

    fn validate(&self, nrow: I, ncol: I) -> Result<(), MatrixError> {
        let expected = if self.along_rows { nrow.as_() } else { ncol.as_() };
        if self.values.len() != expected {
            return Err(LayoutError::DimensionMismatch {
                by_row: self.along_rows,
                expected,
                found: self.values.len(),
            }
            .into());
        }
        Ok(())
    }
}

/// Entry-wise addition of two matrices.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryAdd;

impl<V: MatrixValue + Add<Output = V>> BinaryOperation<V> for BinaryAdd {
    fn preserves_sparsity(&self) -> bool {
        true
    }

    fn apply(&self, left: V, right: V) -> V {
        left + right
    }
}

/// Entry-wise subtraction of two matrices.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinarySubtract;

impl<V: MatrixValue + Sub<Output = V>> BinaryOperation<V> for BinarySubtract {
    fn preserves_sparsity(&self) -> bool {
        true
    }

    fn apply(&self, left: V, right: V) -> V {
        left - right
    }
}

/// Entry-wise multiplication of two matrices.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryMultiply;

impl<V: MatrixValue + Mul<Output = V>> BinaryOperation<V> for BinaryMultiply {
    fn preserves_sparsity(&self) -> bool {
        true
    }

    fn apply(&self, left: V, right: V) -> V {
        left * right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_scalar_sparsity() {
        let shifted: AddScalar<f64> = AddScalar::new(1.5);
        assert!(!UnaryOperation::<f64, u32>::preserves_sparsity(&shifted));
        let unshifted: AddScalar<f64> = AddScalar::new(0.0);
        assert!(UnaryOperation::<f64, u32>::preserves_sparsity(&unshifted));
    }

    #[test]
    fn test_multiply_scalar_nan_is_dense() {
        let scaled: MultiplyScalar<f64> = MultiplyScalar::new(f64::NAN);
        assert!(!UnaryOperation::<f64, u32>::preserves_sparsity(&scaled));
        let doubled: MultiplyScalar<f64> = MultiplyScalar::new(2.0);
        assert!(UnaryOperation::<f64, u32>::preserves_sparsity(&doubled));
    }

    #[test]
    fn test_divide_by_zero_rejected_for_integers() {
        assert!(DivideScalar::new(0_i64).is_err());
        assert!(DivideScalar::new(2_i64).is_ok());
        // IEEE types keep going and simply stop being sparse.
        let divided = DivideScalar::new(0.0_f64).unwrap();
        assert!(!UnaryOperation::<f64, u32>::preserves_sparsity(&divided));
    }

    #[test]
    fn test_compare_scalar() {
        let compare: CompareScalar<f64> = CompareScalar::new(CompareOperation::GreaterThan, 2.0);
        let mut buffer = [1.0, 3.0, 2.0];
        UnaryOperation::<f64, u32>::dense(&compare, true, 0, &Subset::Full, &mut buffer);
        assert_eq!(buffer, [0.0, 1.0, 0.0]);
        assert!(UnaryOperation::<f64, u32>::preserves_sparsity(&compare));

        let le: CompareScalar<f64> = CompareScalar::new(CompareOperation::LessThanOrEqual, 2.0);
        assert!(!UnaryOperation::<f64, u32>::preserves_sparsity(&le));
    }

    #[test]
    fn test_add_vector_validation() {
        let addend: AddVector<f64> = AddVector::along_rows(vec![1.0, 2.0]);
        assert!(UnaryOperation::<f64, u32>::validate(&addend, 2, 5).is_ok());
        assert!(UnaryOperation::<f64, u32>::validate(&addend, 3, 5).is_err());
    }
}
