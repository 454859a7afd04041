//! Operator overloads for [`Number`]: each one evaluates eagerly, records a
//! node with the local derivatives, and wires the argument adjoint slots.
//! Mixed `Number ⊕ float` variants record unary nodes — the constant side
//! has no adjoint to receive anything. Comparisons read values only and
//! record nothing.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::float::Float;
use crate::number::Number;
use crate::tape::TapeThreadLocal;

impl<F: Float + TapeThreadLocal> Add for Number<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Number::binary(self.value() + rhs.value(), &self, &rhs, F::one(), F::one())
    }
}

impl<F: Float + TapeThreadLocal> Sub for Number<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Number::binary(self.value() - rhs.value(), &self, &rhs, F::one(), -F::one())
    }
}

impl<F: Float + TapeThreadLocal> Mul for Number<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Number::binary(
            self.value() * rhs.value(),
            &self,
            &rhs,
            rhs.value(),
            self.value(),
        )
    }
}

impl<F: Float + TapeThreadLocal> Div for Number<F> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let inv = F::one() / rhs.value();
        Number::binary(
            self.value() * inv,
            &self,
            &rhs,
            inv,
            -self.value() * inv * inv,
        )
    }
}

impl<F: Float + TapeThreadLocal> Neg for Number<F> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Number::unary(-self.value(), &self, -F::one())
    }
}

impl<F: Float + TapeThreadLocal> AddAssign for Number<F> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<F: Float + TapeThreadLocal> SubAssign for Number<F> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<F: Float + TapeThreadLocal> MulAssign for Number<F> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl<F: Float + TapeThreadLocal> DivAssign for Number<F> {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

// Mixed ops: Number<F> with its primitive float, both ways, per float type.
macro_rules! impl_number_float_ops {
    ($f:ty) => {
        impl Add<$f> for Number<$f> {
            type Output = Number<$f>;
            #[inline]
            fn add(self, rhs: $f) -> Number<$f> {
                Number::unary(self.value() + rhs, &self, 1.0)
            }
        }

        impl Add<Number<$f>> for $f {
            type Output = Number<$f>;
            #[inline]
            fn add(self, rhs: Number<$f>) -> Number<$f> {
                Number::unary(self + rhs.value(), &rhs, 1.0)
            }
        }

        impl Sub<$f> for Number<$f> {
            type Output = Number<$f>;
            #[inline]
            fn sub(self, rhs: $f) -> Number<$f> {
                Number::unary(self.value() - rhs, &self, 1.0)
            }
        }

        impl Sub<Number<$f>> for $f {
            type Output = Number<$f>;
            #[inline]
            fn sub(self, rhs: Number<$f>) -> Number<$f> {
                Number::unary(self - rhs.value(), &rhs, -1.0)
            }
        }

        impl Mul<$f> for Number<$f> {
            type Output = Number<$f>;
            #[inline]
            fn mul(self, rhs: $f) -> Number<$f> {
                Number::unary(self.value() * rhs, &self, rhs)
            }
        }

        impl Mul<Number<$f>> for $f {
            type Output = Number<$f>;
            #[inline]
            fn mul(self, rhs: Number<$f>) -> Number<$f> {
                Number::unary(self * rhs.value(), &rhs, self)
            }
        }

        impl Div<$f> for Number<$f> {
            type Output = Number<$f>;
            #[inline]
            fn div(self, rhs: $f) -> Number<$f> {
                let inv: $f = 1.0 / rhs;
                Number::unary(self.value() * inv, &self, inv)
            }
        }

        impl Div<Number<$f>> for $f {
            type Output = Number<$f>;
            #[inline]
            fn div(self, rhs: Number<$f>) -> Number<$f> {
                let inv: $f = 1.0 / rhs.value();
                Number::unary(self * inv, &rhs, -self * inv * inv)
            }
        }

        impl AddAssign<$f> for Number<$f> {
            #[inline]
            fn add_assign(&mut self, rhs: $f) {
                *self = *self + rhs;
            }
        }

        impl SubAssign<$f> for Number<$f> {
            #[inline]
            fn sub_assign(&mut self, rhs: $f) {
                *self = *self - rhs;
            }
        }

        impl MulAssign<$f> for Number<$f> {
            #[inline]
            fn mul_assign(&mut self, rhs: $f) {
                *self = *self * rhs;
            }
        }

        impl DivAssign<$f> for Number<$f> {
            #[inline]
            fn div_assign(&mut self, rhs: $f) {
                *self = *self / rhs;
            }
        }

        impl PartialEq<$f> for Number<$f> {
            #[inline]
            fn eq(&self, other: &$f) -> bool {
                self.value() == *other
            }
        }

        impl PartialEq<Number<$f>> for $f {
            #[inline]
            fn eq(&self, other: &Number<$f>) -> bool {
                *self == other.value()
            }
        }

        impl PartialOrd<$f> for Number<$f> {
            #[inline]
            fn partial_cmp(&self, other: &$f) -> Option<Ordering> {
                self.value().partial_cmp(other)
            }
        }

        impl PartialOrd<Number<$f>> for $f {
            #[inline]
            fn partial_cmp(&self, other: &Number<$f>) -> Option<Ordering> {
                self.partial_cmp(&other.value())
            }
        }
    };
}

impl_number_float_ops!(f32);
impl_number_float_ops!(f64);

impl<F: Float> PartialEq for Number<F> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl<F: Float> PartialOrd for Number<F> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value().partial_cmp(&other.value())
    }
}
