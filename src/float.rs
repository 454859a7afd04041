use std::fmt::Display;

use num_traits::{Float as NumFloat, FloatConst};

/// Base floating-point type a tape records over.
///
/// Values of `F` are stored by value inside tape nodes and addressed through
/// raw pointers into the block-pools, so the type must be plain data with no
/// drop glue — `num_traits::Float` already guarantees `Copy`. `FloatConst`
/// supplies the constants the Gaussian helpers need, `Display` lets a
/// [`Number`](crate::Number) print as its value, and `'static` is what
/// allows a per-type thread-local slot to hold the active tape pointer.
///
/// Implemented for `f32` and `f64` only. The AD scalar is deliberately not a
/// `Float` itself: it wraps one of these.
pub trait Float: NumFloat + FloatConst + Display + 'static {}

impl Float for f32 {}
impl Float for f64 {}
