//! Elementwise `+ - * /` between vectors and between a vector and a scalar.
//! Borrowed and owned left-hand sides, plus the compound-assignment forms.

use super::{Scalar, Vector};
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

macro_rules! impl_elementwise {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident, $sym:tt) => {
        impl $OpAssign<&Vector> for Vector {
            #[inline]
            fn $op_assign(&mut self, rhs: &Vector) {
                debug_assert_eq!(self.dim(), rhs.dim(), "dimension mismatch");
                for (a, &b) in self.as_mut_slice().iter_mut().zip(rhs.as_slice()) {
                    *a = *a $sym b;
                }
            }
        }

        impl $OpAssign<Scalar> for Vector {
            #[inline]
            fn $op_assign(&mut self, rhs: Scalar) {
                for a in self.as_mut_slice().iter_mut() {
                    *a = *a $sym rhs;
                }
            }
        }

        impl $Op<&Vector> for Vector {
            type Output = Vector;
            #[inline]
            fn $op(mut self, rhs: &Vector) -> Vector {
                self.$op_assign(rhs);
                self
            }
        }

        impl $Op<Vector> for Vector {
            type Output = Vector;
            #[inline]
            fn $op(mut self, rhs: Vector) -> Vector {
                self.$op_assign(&rhs);
                self
            }
        }

        impl $Op<&Vector> for &Vector {
            type Output = Vector;
            #[inline]
            fn $op(self, rhs: &Vector) -> Vector {
                let mut out = self.clone();
                out.$op_assign(rhs);
                out
            }
        }

        impl $Op<Scalar> for Vector {
            type Output = Vector;
            #[inline]
            fn $op(mut self, rhs: Scalar) -> Vector {
                self.$op_assign(rhs);
                self
            }
        }

        impl $Op<Scalar> for &Vector {
            type Output = Vector;
            #[inline]
            fn $op(self, rhs: Scalar) -> Vector {
                let mut out = self.clone();
                out.$op_assign(rhs);
                out
            }
        }
    };
}

impl_elementwise!(Add, add, AddAssign, add_assign, +);
impl_elementwise!(Sub, sub, SubAssign, sub_assign, -);
impl_elementwise!(Mul, mul, MulAssign, mul_assign, *);
impl_elementwise!(Div, div, DivAssign, div_assign, /);
