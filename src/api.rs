//! Closure-based drivers: record, sweep, and harvest in one call.
//!
//! Thin convenience over the raw tape workflow (build a [`Tape`], install a
//! [`TapeGuard`], make leaves, run the computation, propagate). Code that
//! needs marks, rewinds, or adjoint re-seeding uses the tape directly.

use crate::float::Float;
use crate::number::Number;
use crate::tape::{with_active_tape, NumResultsGuard, Tape, TapeGuard, TapeThreadLocal};

/// Gradient of a scalar function `f : Rⁿ → R` in one forward recording and
/// one reverse sweep.
///
/// ```
/// let g = quoll::grad(|x: &[quoll::Number<f64>]| x[0] * x[0] + x[1] * x[1], &[3.0, 4.0]);
/// assert!((g[0] - 6.0).abs() < 1e-12);
/// assert!((g[1] - 8.0).abs() < 1e-12);
/// ```
pub fn grad<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Number<F>]) -> Number<F>,
    x: &[F],
) -> Vec<F> {
    let mut tape: Tape<F> = Tape::new();
    let _guard = TapeGuard::new(&mut tape);

    let inputs: Vec<Number<F>> = x.iter().map(|&v| Number::new(v)).collect();
    let mut output = f(&inputs);
    output.propagate_to_start();

    inputs.iter().map(|n| n.adjoint()).collect()
}

/// Values and Jacobian of `f : Rⁿ → Rᵐ` in one recording and one
/// multi-result reverse sweep (`m` adjoint lanes per node).
///
/// Returns `(f(x), J)` with `J[i][j] = ∂fᵢ/∂xⱼ`.
pub fn jacobian<F: Float + TapeThreadLocal>(
    f: impl FnOnce(&[Number<F>]) -> Vec<Number<F>>,
    x: &[F],
    m: usize,
) -> (Vec<F>, Vec<Vec<F>>) {
    let _mode = NumResultsGuard::set(true, m);
    let mut tape: Tape<F> = Tape::new();
    let _guard = TapeGuard::new(&mut tape);

    let inputs: Vec<Number<F>> = x.iter().map(|&v| Number::new(v)).collect();
    let mut outputs = f(&inputs);
    assert_eq!(outputs.len(), m, "output count must match the lane count");

    for (i, out) in outputs.iter_mut().enumerate() {
        out.set_adjoint_at(i, F::one());
    }
    // One sweep over the whole tape: nodes recorded after an output carry
    // zero adjoints and are skipped.
    with_active_tape(|t: &mut Tape<F>| {
        if !t.is_empty() {
            let from = t.back();
            let to = t.begin();
            t.propagate_multi(from, to);
        }
    });

    let values = outputs.iter().map(|n| n.value()).collect();
    let jac = (0..m)
        .map(|i| inputs.iter().map(|n| n.adjoint_at(i)).collect())
        .collect();
    (values, jac)
}
