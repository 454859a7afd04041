//! The differentiable scalar.

use std::fmt::{self, Display};
use std::ptr;

use crate::blocklist::Cursor;
use crate::float::Float;
use crate::gaussians;
use crate::node::Node;
use crate::tape::{self, with_active_tape, Tape, TapeThreadLocal};

/// Differentiable scalar recorded on the thread's active tape.
///
/// Two words: the value and a pointer to the node the value came from. Every
/// arithmetic operation eagerly computes its result and its local
/// derivatives, appends a node to the active tape, and wires the node to its
/// arguments' adjoint slots. Asking a result to propagate then replays the
/// tape backward and leaves ∂result/∂leaf in every leaf's adjoint.
///
/// A `Number` is a non-owning handle: its node pointer is only meaningful
/// while that tape position is live. Rewinding or clearing the tape past the
/// node leaves the handle dangling — recording or propagating through it
/// afterward is a programming error (caught in debug builds, undefined in
/// release).
///
/// ```
/// use quoll::{Number, Tape, TapeGuard};
///
/// let mut tape: Tape<f64> = Tape::new();
/// let _guard = TapeGuard::new(&mut tape);
///
/// let x = Number::new(3.0_f64);
/// let mut y = x * x + 2.0 * x + 1.0;
/// y.propagate_to_start();
///
/// assert_eq!(y.value(), 16.0);
/// assert_eq!(x.adjoint(), 8.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Number<F: Float> {
    value: F,
    node: *mut Node<F>,
}

#[cfg(debug_assertions)]
fn check_on_tape<F: Float>(tape: &Tape<F>, node: *const Node<F>) {
    assert!(!node.is_null(), "operand was never put on tape");
    // Linear scan; debugging aid, compiled out of release builds.
    assert!(
        tape.find(node).is_some(),
        "operand's node is not on the active tape"
    );
}

#[cfg(not(debug_assertions))]
fn check_on_tape<F: Float>(_tape: &Tape<F>, _node: *const Node<F>) {}

impl<F: Float> Number<F> {
    /// The recorded value.
    #[inline]
    pub fn value(&self) -> F {
        self.value
    }

    /// Overwrite the value without touching the tape. The node keeps its
    /// original derivatives; use [`put_on_tape`](Self::put_on_tape) to
    /// restart the number as a fresh leaf instead.
    #[inline]
    pub fn set_value(&mut self, value: F) {
        self.value = value;
    }

    #[inline]
    fn node_ref(&self) -> &Node<F> {
        debug_assert!(!self.node.is_null(), "Number was never put on tape");
        // SAFETY: the node was recorded on the owning thread's tape and, per
        // the handle contract above, its position is still live.
        unsafe { &*self.node }
    }

    /// Own adjoint, single-result mode.
    #[inline]
    pub fn adjoint(&self) -> F {
        self.node_ref().adjoint
    }

    /// Seed the own adjoint, single-result mode.
    #[inline]
    pub fn set_adjoint(&mut self, value: F) {
        debug_assert!(!self.node.is_null(), "Number was never put on tape");
        // SAFETY: as node_ref.
        unsafe { (*self.node).adjoint = value };
    }

    /// Own adjoint for result lane `lane`, multi-result mode.
    #[inline]
    pub fn adjoint_at(&self, lane: usize) -> F {
        let node = self.node_ref();
        assert!(
            !node.adjoints.is_null(),
            "node was not recorded in multi-result mode"
        );
        assert!(lane < tape::num_results(), "result lane out of range");
        // SAFETY: multi-mode recording allocated num_results() lanes.
        unsafe { *node.adjoints.add(lane) }
    }

    /// Seed the adjoint of result lane `lane`, multi-result mode.
    #[inline]
    pub fn set_adjoint_at(&mut self, lane: usize, value: F) {
        let node = self.node_ref();
        assert!(
            !node.adjoints.is_null(),
            "node was not recorded in multi-result mode"
        );
        assert!(lane < tape::num_results(), "result lane out of range");
        // SAFETY: as adjoint_at; writing through the node's own lane.
        unsafe { *node.adjoints.add(lane) = value };
    }
}

impl<F: Float + TapeThreadLocal> Number<F> {
    /// Record `value` as a leaf (independent variable) on the active tape.
    pub fn new(value: F) -> Self {
        let node = with_active_tape(|t: &mut Tape<F>| t.record_node::<0>());
        Number { value, node }
    }

    /// Record this number's current value as a fresh leaf. For handles that
    /// were default-constructed (or whose tape position was rewound away)
    /// and need to re-enter the tape.
    pub fn put_on_tape(&mut self) {
        self.node = with_active_tape(|t: &mut Tape<F>| t.record_node::<0>());
    }

    /// Position of this number's node on the active tape.
    pub fn position(&self) -> Cursor {
        let node = self.node;
        with_active_tape(|t: &mut Tape<F>| match t.find(node) {
            Some(pos) => pos,
            None => panic!("Number's node is not on the active tape"),
        })
    }

    /// The adjoint slot operators wire their result node to: the scalar
    /// adjoint in single-result mode, the lane vector in multi mode.
    #[inline]
    fn adjoint_slot(node: *mut Node<F>) -> *mut F {
        // SAFETY: callers checked the node is live on the active tape.
        unsafe {
            if tape::is_multi() {
                (*node).adjoints
            } else {
                &mut (*node).adjoint as *mut F
            }
        }
    }

    /// Record a unary operation: value plus ∂result/∂arg.
    pub(crate) fn unary(value: F, arg: &Number<F>, deriv: F) -> Number<F> {
        let arg_node = arg.node;
        let node = with_active_tape(|t: &mut Tape<F>| {
            check_on_tape(t, arg_node);
            let node = t.record_node::<1>();
            // SAFETY: record_node wired one derivative and one argument
            // slot; arg_node is live on this tape.
            unsafe {
                *(*node).derivatives = deriv;
                *(*node).adj_ptrs = Self::adjoint_slot(arg_node);
            }
            node
        });
        Number { value, node }
    }

    /// Record a binary operation: value plus both local derivatives.
    pub(crate) fn binary(
        value: F,
        lhs: &Number<F>,
        rhs: &Number<F>,
        lhs_deriv: F,
        rhs_deriv: F,
    ) -> Number<F> {
        let (lhs_node, rhs_node) = (lhs.node, rhs.node);
        let node = with_active_tape(|t: &mut Tape<F>| {
            check_on_tape(t, lhs_node);
            check_on_tape(t, rhs_node);
            let node = t.record_node::<2>();
            // SAFETY: record_node wired two derivative and two argument
            // slots; both argument nodes are live on this tape.
            unsafe {
                *(*node).derivatives = lhs_deriv;
                *(*node).derivatives.add(1) = rhs_deriv;
                *(*node).adj_ptrs = Self::adjoint_slot(lhs_node);
                *(*node).adj_ptrs.add(1) = Self::adjoint_slot(rhs_node);
            }
            node
        });
        Number { value, node }
    }

    // ── Math functions ──

    pub fn exp(self) -> Self {
        let e = self.value.exp();
        Self::unary(e, &self, e)
    }

    /// Natural logarithm. Outside the domain the NaN from the underlying
    /// math propagates through value and derivative — no check is inserted.
    pub fn ln(self) -> Self {
        Self::unary(self.value.ln(), &self, F::one() / self.value)
    }

    pub fn sqrt(self) -> Self {
        let e = self.value.sqrt();
        let half = F::from(0.5).unwrap();
        Self::unary(e, &self, half / e)
    }

    /// Absolute value. The derivative at exactly zero is −1; callers must
    /// not seed adjoints through the kink if they care.
    pub fn abs(self) -> Self {
        let deriv = if self.value > F::zero() {
            F::one()
        } else {
            -F::one()
        };
        Self::unary(self.value.abs(), &self, deriv)
    }

    /// `self ^ rhs` with both operands on tape.
    pub fn pow(self, rhs: Self) -> Self {
        let e = self.value.powf(rhs.value);
        Self::binary(
            e,
            &self,
            &rhs,
            rhs.value * e / self.value,
            self.value.ln() * e,
        )
    }

    /// `self ^ exponent` for a constant exponent.
    pub fn powf(self, exponent: F) -> Self {
        let e = self.value.powf(exponent);
        Self::unary(e, &self, exponent * e / self.value)
    }

    /// `base ^ self` for a constant base.
    pub fn float_pow(base: F, exponent: Number<F>) -> Number<F> {
        let e = base.powf(exponent.value);
        Self::unary(e, &exponent, base.ln() * e)
    }

    /// Larger of the two; the derivative follows the winning branch.
    pub fn max(self, rhs: Self) -> Self {
        if self.value > rhs.value {
            Self::binary(self.value, &self, &rhs, F::one(), F::zero())
        } else {
            Self::binary(rhs.value, &self, &rhs, F::zero(), F::one())
        }
    }

    /// Smaller of the two; the derivative follows the winning branch.
    pub fn min(self, rhs: Self) -> Self {
        if self.value < rhs.value {
            Self::binary(self.value, &self, &rhs, F::one(), F::zero())
        } else {
            Self::binary(rhs.value, &self, &rhs, F::zero(), F::one())
        }
    }

    /// `max` against a constant.
    pub fn maxf(self, rhs: F) -> Self {
        let deriv = if self.value > rhs { F::one() } else { F::zero() };
        Self::unary(self.value.max(rhs), &self, deriv)
    }

    /// `min` against a constant.
    pub fn minf(self, rhs: F) -> Self {
        let deriv = if self.value < rhs { F::one() } else { F::zero() };
        Self::unary(self.value.min(rhs), &self, deriv)
    }

    /// Standard normal density φ.
    pub fn normal_pdf(self) -> Self {
        let e = gaussians::normal_pdf(self.value);
        Self::unary(e, &self, -self.value * e)
    }

    /// Standard normal cumulative distribution Φ; derivative is φ.
    pub fn normal_cdf(self) -> Self {
        Self::unary(
            gaussians::normal_cdf(self.value),
            &self,
            gaussians::normal_pdf(self.value),
        )
    }

    // ── Reverse sweeps ──

    /// Seed this number's adjoint to 1 and sweep from its node back to `to`,
    /// both inclusive. Single-result mode.
    pub fn propagate_adjoints(&mut self, to: Cursor) {
        self.set_adjoint(F::one());
        let node = self.node;
        with_active_tape(|t: &mut Tape<F>| {
            let from = match t.find(node) {
                Some(pos) => pos,
                None => panic!("Number's node is not on the active tape"),
            };
            t.propagate(from, to);
        });
    }

    /// Seed 1 and sweep all the way to the start of the tape.
    pub fn propagate_to_start(&mut self) {
        let to = with_active_tape(|t: &mut Tape<F>| t.begin());
        self.propagate_adjoints(to);
    }

    /// Seed 1 and sweep down to the mark, inclusive.
    pub fn propagate_to_mark(&mut self) {
        let to = with_active_tape(|t: &mut Tape<F>| t.mark_pos());
        self.propagate_adjoints(to);
    }

    /// Sweep the pre-mark phase of a two-phase sweep; the post-mark phase
    /// must have seeded and propagated down to the mark already.
    pub fn propagate_mark_to_start() {
        with_active_tape(|t: &mut Tape<F>| t.propagate_mark_to_start());
    }

    /// Multi-result sweep from this number's node back to `to`, both
    /// inclusive. Seeding is the caller's job, one lane per output, via
    /// [`set_adjoint_at`](Self::set_adjoint_at).
    pub fn propagate_adjoints_multi(&self, to: Cursor) {
        let node = self.node;
        with_active_tape(|t: &mut Tape<F>| {
            let from = match t.find(node) {
                Some(pos) => pos,
                None => panic!("Number's node is not on the active tape"),
            };
            t.propagate_multi(from, to);
        });
    }

    /// Zero every adjoint on the active tape.
    pub fn reset_adjoints() {
        with_active_tape(|t: &mut Tape<F>| t.reset_adjoints());
    }
}

impl<F: Float> Default for Number<F> {
    /// A value of zero, not on tape. Call
    /// [`put_on_tape`](Number::put_on_tape) before using it in arithmetic.
    fn default() -> Self {
        Number {
            value: F::zero(),
            node: ptr::null_mut(),
        }
    }
}

impl<F: Float + TapeThreadLocal> From<F> for Number<F> {
    fn from(value: F) -> Self {
        Number::new(value)
    }
}

impl<F: Float> Display for Number<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
