use crate::error::Result;




/**
 * Capability shared by every field type in this crate: a container of
 * floating point values with a fixed structure that supports elementwise
 * math. Implementors provide the two apply primitives; every math function
 * is derived from them, so a uniform field and a hierarchy of fields behave
 * identically.
 */
pub trait NumericField: Sized {

    /// Return a new field with `f` applied to every value.
    fn apply_unary<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync;

    /// Return a new field with `f` applied to every pair of values. The two
    /// fields must have identical structure, otherwise this fails with
    /// `Error::GridMismatch`.
    fn apply_binary<F>(&self, other: &Self, f: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> f64 + Send + Sync;

    fn apply_scalar<F>(&self, scalar: f64, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync
    {
        self.apply_unary(move |x| f(x, scalar))
    }

    fn abs(&self) -> Self { self.apply_unary(f64::abs) }
    fn sqrt(&self) -> Self { self.apply_unary(f64::sqrt) }
    fn cbrt(&self) -> Self { self.apply_unary(f64::cbrt) }
    fn exp(&self) -> Self { self.apply_unary(f64::exp) }
    fn exp2(&self) -> Self { self.apply_unary(f64::exp2) }
    fn ln(&self) -> Self { self.apply_unary(f64::ln) }
    fn log10(&self) -> Self { self.apply_unary(f64::log10) }
    fn log2(&self) -> Self { self.apply_unary(f64::log2) }
    fn sin(&self) -> Self { self.apply_unary(f64::sin) }
    fn cos(&self) -> Self { self.apply_unary(f64::cos) }
    fn tan(&self) -> Self { self.apply_unary(f64::tan) }
    fn asin(&self) -> Self { self.apply_unary(f64::asin) }
    fn acos(&self) -> Self { self.apply_unary(f64::acos) }
    fn atan(&self) -> Self { self.apply_unary(f64::atan) }
    fn sinh(&self) -> Self { self.apply_unary(f64::sinh) }
    fn cosh(&self) -> Self { self.apply_unary(f64::cosh) }
    fn tanh(&self) -> Self { self.apply_unary(f64::tanh) }
    fn asinh(&self) -> Self { self.apply_unary(f64::asinh) }
    fn acosh(&self) -> Self { self.apply_unary(f64::acosh) }
    fn atanh(&self) -> Self { self.apply_unary(f64::atanh) }
    fn floor(&self) -> Self { self.apply_unary(f64::floor) }
    fn ceil(&self) -> Self { self.apply_unary(f64::ceil) }
    fn round(&self) -> Self { self.apply_unary(f64::round) }
    fn signum(&self) -> Self { self.apply_unary(f64::signum) }
    fn recip(&self) -> Self { self.apply_unary(f64::recip) }

    fn powi(&self, n: i32) -> Self {
        self.apply_unary(move |x| x.powi(n))
    }

    fn powf(&self, p: f64) -> Self {
        self.apply_unary(move |x| x.powf(p))
    }

    /// Raise each value to the power given by the matching value of `other`.
    fn pow(&self, other: &Self) -> Result<Self> {
        self.apply_binary(other, f64::powf)
    }

    fn atan2(&self, other: &Self) -> Result<Self> {
        self.apply_binary(other, f64::atan2)
    }

    fn hypot(&self, other: &Self) -> Result<Self> {
        self.apply_binary(other, f64::hypot)
    }

    fn minimum(&self, other: &Self) -> Result<Self> {
        self.apply_binary(other, f64::min)
    }

    fn maximum(&self, other: &Self) -> Result<Self> {
        self.apply_binary(other, f64::max)
    }
}




/**
 * Implement the arithmetic operators for a `NumericField`. Operators between
 * two fields return `Result<Self>` since the operands may not be compatible;
 * operators with an `f64` always succeed.
 */
macro_rules! impl_field_ops {
    ($t:ty) => {
        impl core::ops::Neg for &$t {
            type Output = $t;

            fn neg(self) -> $t {
                $crate::numeric::NumericField::apply_unary(self, |x| -x)
            }
        }

        impl core::ops::Neg for $t {
            type Output = $t;

            fn neg(self) -> $t {
                core::ops::Neg::neg(&self)
            }
        }

        impl_field_ops!(@binary $t, Add, add, +);
        impl_field_ops!(@binary $t, Sub, sub, -);
        impl_field_ops!(@binary $t, Mul, mul, *);
        impl_field_ops!(@binary $t, Div, div, /);
        impl_field_ops!(@binary $t, Rem, rem, %);
    };

    (@binary $t:ty, $op_trait:ident, $method:ident, $op:tt) => {
        impl core::ops::$op_trait<&$t> for &$t {
            type Output = $crate::error::Result<$t>;

            fn $method(self, rhs: &$t) -> Self::Output {
                $crate::numeric::NumericField::apply_binary(self, rhs, |a, b| a $op b)
            }
        }

        impl core::ops::$op_trait<$t> for $t {
            type Output = $crate::error::Result<$t>;

            fn $method(self, rhs: $t) -> Self::Output {
                core::ops::$op_trait::$method(&self, &rhs)
            }
        }

        impl core::ops::$op_trait<f64> for &$t {
            type Output = $t;

            fn $method(self, rhs: f64) -> $t {
                $crate::numeric::NumericField::apply_unary(self, move |a| a $op rhs)
            }
        }

        impl core::ops::$op_trait<f64> for $t {
            type Output = $t;

            fn $method(self, rhs: f64) -> $t {
                core::ops::$op_trait::$method(&self, rhs)
            }
        }

        impl core::ops::$op_trait<&$t> for f64 {
            type Output = $t;

            fn $method(self, rhs: &$t) -> $t {
                $crate::numeric::NumericField::apply_unary(rhs, move |b| self $op b)
            }
        }

        impl core::ops::$op_trait<$t> for f64 {
            type Output = $t;

            fn $method(self, rhs: $t) -> $t {
                core::ops::$op_trait::$method(self, &rhs)
            }
        }
    };
}

pub(crate) use impl_field_ops;
