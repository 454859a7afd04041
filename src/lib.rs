//! Tape-based adjoint algorithmic differentiation (AAD).
//!
//! Arithmetic on [`Number`] is recorded onto a thread-local [`Tape`] during
//! the forward evaluation — each operation stores its local derivatives and
//! pointers to its arguments' adjoints. One backward replay of the tape then
//! yields the derivative of an output with respect to every input it
//! touched, at a cost independent of the number of inputs. Marks, rewinds,
//! and multi-result adjoint lanes support the Monte-Carlo risk workflows
//! this style of engine is built for.

pub mod api;
pub mod blocklist;
pub mod float;
pub mod gaussians;
pub mod node;
pub mod number;
mod ops;
pub mod tape;

pub use api::{grad, jacobian};
pub use blocklist::{BlockList, Cursor};
pub use float::Float;
pub use number::Number;
pub use tape::{
    is_multi, num_results, set_num_results, with_active_tape, NumResultsGuard, Tape, TapeGuard,
    TapeThreadLocal,
};

/// Differentiable scalar over `f64`.
pub type Number64 = Number<f64>;
/// Differentiable scalar over `f32`.
pub type Number32 = Number<f32>;
