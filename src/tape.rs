//! The tape: ordered log of recorded operations for one thread.
//!
//! A [`Tape`] composes four block-pools — nodes, multi-result adjoints,
//! local derivatives, argument-adjoint pointers — and is the only memory
//! source for tape data. Recording appends; the reverse sweep walks the node
//! pool backward, multiply-accumulating through the pointers each node
//! carries. Marks and rewinds roll all four pools back in lockstep so that
//! Monte-Carlo inner loops recycle the arena perfectly.
//!
//! Tapes are strictly per-thread: an active tape is installed through a
//! thread-local pointer ([`TapeGuard`]), and no [`Number`](crate::Number)
//! may cross threads.

use std::cell::Cell;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::blocklist::{BlockList, Cursor, Iter};
use crate::float::Float;
use crate::node::Node;

/// Nodes per tape block.
pub const BLOCK_SIZE: usize = 16_384;
/// Multi-result adjoint slots per block.
const ADJ_SIZE: usize = 32_768;
/// Derivative / argument-pointer slots per block.
const DATA_SIZE: usize = 65_536;

// ──────────────────────────────────────────────
//  Process-wide multi-result configuration
// ──────────────────────────────────────────────

static MULTI: AtomicBool = AtomicBool::new(false);
static NUM_RESULTS: AtomicUsize = AtomicUsize::new(1);

/// Switch every tape in the process into (or out of) multi-result recording
/// with `num_results` adjoint lanes per node.
///
/// Must be set before any recording starts; flipping it while a thread is
/// mid-recording is undefined. Prefer the scoped [`NumResultsGuard`] so
/// nested multi-result sweeps compose.
pub fn set_num_results(multi: bool, num_results: usize) {
    assert!(num_results >= 1, "at least one result lane is required");
    MULTI.store(multi, Ordering::Relaxed);
    NUM_RESULTS.store(num_results, Ordering::Relaxed);
}

/// Whether nodes are being recorded with multi-result adjoint vectors.
#[inline]
pub fn is_multi() -> bool {
    MULTI.load(Ordering::Relaxed)
}

/// Width of each node's adjoint vector in multi-result mode.
#[inline]
pub fn num_results() -> usize {
    NUM_RESULTS.load(Ordering::Relaxed)
}

/// Scoped [`set_num_results`]: restores the previous `(multi, num_results)`
/// pair on drop, whatever the exit path.
pub struct NumResultsGuard {
    prev_multi: bool,
    prev_num: usize,
}

impl NumResultsGuard {
    pub fn set(multi: bool, num_results: usize) -> Self {
        let guard = NumResultsGuard {
            prev_multi: is_multi(),
            prev_num: self::num_results(),
        };
        set_num_results(multi, num_results);
        guard
    }
}

impl Drop for NumResultsGuard {
    fn drop(&mut self) {
        set_num_results(self.prev_multi, self.prev_num);
    }
}

// ──────────────────────────────────────────────
//  Tape
// ──────────────────────────────────────────────

/// Recording tape for one thread.
pub struct Tape<F: Float> {
    nodes: BlockList<Node<F>, BLOCK_SIZE>,
    multi_adjoints: BlockList<F, ADJ_SIZE>,
    derivs: BlockList<F, DATA_SIZE>,
    arg_ptrs: BlockList<*mut F, DATA_SIZE>,
    /// Keeps tapes packed in an array off each other's cache lines.
    _pad: [u8; 64],
}

impl<F: Float> Tape<F> {
    pub fn new() -> Self {
        Tape {
            nodes: BlockList::new(),
            multi_adjoints: BlockList::new(),
            derivs: BlockList::new(),
            arg_ptrs: BlockList::new(),
            _pad: [0; 64],
        }
    }

    /// Place a node with arity `N` on the tape and wire its storage: zeroed
    /// multi-result adjoint lanes when the process records in multi mode,
    /// and `N` derivative and argument-pointer slots when `N > 0`.
    ///
    /// The returned address is stable until the tape is cleared or rewound
    /// past it. The caller is expected to fill the derivative and argument
    /// slots before the node is swept.
    pub fn record_node<const N: usize>(&mut self) -> *mut Node<F> {
        let node = self.nodes.push(Node::new(N));
        // SAFETY: `node` was just placed and is not aliased; the arrays it
        // receives below come fresh from this tape's own pools.
        unsafe {
            if is_multi() {
                let k = num_results();
                let adj = self.multi_adjoints.alloc_n(k);
                for j in 0..k {
                    adj.add(j).write(F::zero());
                }
                (*node).adjoints = adj;
            }
            if N > 0 {
                (*node).derivatives = self.derivs.alloc_array::<N>();
                (*node).adj_ptrs = self.arg_ptrs.alloc_array::<N>();
            }
        }
        node
    }

    /// Zero every adjoint on the tape.
    pub fn reset_adjoints(&mut self) {
        if is_multi() {
            self.multi_adjoints.fill(F::zero());
        } else {
            // SAFETY: for_each_ptr hands out addresses of live nodes only.
            self.nodes
                .for_each_ptr(|node| unsafe { (*node).adjoint = F::zero() });
        }
    }

    /// Empty the tape and release surplus blocks in all four pools.
    pub fn clear(&mut self) {
        self.multi_adjoints.clear();
        self.derivs.clear();
        self.arg_ptrs.clear();
        self.nodes.clear();
    }

    /// Empty the tape, retaining every block for reuse.
    pub fn rewind(&mut self) {
        self.multi_adjoints.rewind();
        self.derivs.rewind();
        self.arg_ptrs.rewind();
        self.nodes.rewind();
    }

    /// Save the current position of all four pools.
    ///
    /// Marks and rewinds must hit the pools together; rolling back only some
    /// of them would leave live nodes pointing into reused storage.
    pub fn mark(&mut self) {
        self.multi_adjoints.set_mark();
        self.derivs.set_mark();
        self.arg_ptrs.set_mark();
        self.nodes.set_mark();
    }

    /// Roll all four pools back to the mark.
    pub fn rewind_to_mark(&mut self) {
        self.multi_adjoints.rewind_to_mark();
        self.derivs.rewind_to_mark();
        self.arg_ptrs.rewind_to_mark();
        self.nodes.rewind_to_mark();
    }

    pub fn begin(&self) -> Cursor {
        self.nodes.begin()
    }

    pub fn end(&self) -> Cursor {
        self.nodes.end()
    }

    /// Position of the most recently recorded node.
    pub fn back(&self) -> Cursor {
        self.nodes.back()
    }

    /// Node position of the mark: the first node recorded after
    /// [`mark`](Self::mark) was taken.
    pub fn mark_pos(&self) -> Cursor {
        self.nodes.mark_boundary()
    }

    /// Locate a node on this tape by address (linear scan).
    pub fn find(&self, node: *const Node<F>) -> Option<Cursor> {
        self.nodes.find(node)
    }

    pub fn node_at(&self, c: Cursor) -> &Node<F> {
        self.nodes.get(c)
    }

    /// Nodes in recording order.
    pub fn iter(&self) -> Iter<'_, Node<F>, BLOCK_SIZE> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Single-result reverse sweep from `from` back to `to`, both inclusive.
    /// `from` must not precede `to` in recording order.
    pub fn propagate(&mut self, from: Cursor, to: Cursor) {
        debug_assert!(to <= from, "sweep endpoints out of order");
        let mut it = from;
        loop {
            // Raw pointer, not a reference: the adjoint writes inside
            // propagate_one may target other nodes of this same pool.
            let node = self.nodes.get_mut_ptr(it);
            // SAFETY: `it` stays within live node positions, and recording
            // order guarantees every argument slot is live storage.
            unsafe { (*node).propagate_one() };
            if it == to {
                break;
            }
            it = self.nodes.prev(it);
        }
    }

    /// Multi-result reverse sweep from `from` back to `to`, both inclusive.
    pub fn propagate_multi(&mut self, from: Cursor, to: Cursor) {
        debug_assert!(to <= from, "sweep endpoints out of order");
        let k = num_results();
        let mut it = from;
        loop {
            let node = self.nodes.get_mut_ptr(it);
            // SAFETY: as in `propagate`; multi-mode recording gave every
            // node `k` adjoint lanes.
            unsafe { (*node).propagate_all(k) };
            if it == to {
                break;
            }
            it = self.nodes.prev(it);
        }
    }

    /// Sweep the pre-mark phase: from the node just before the mark back to
    /// the start. No-op when nothing precedes the mark. Used for two-phase
    /// sweeps where the post-mark phase seeded and propagated first.
    pub fn propagate_mark_to_start(&mut self) {
        let mark = self.nodes.mark();
        if mark == self.nodes.begin() {
            return;
        }
        let from = self.nodes.prev(mark);
        let to = self.nodes.begin();
        self.propagate(from, to);
    }
}

impl<F: Float> Default for Tape<F> {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────────────────────────────────
//  Thread-local active tape
// ──────────────────────────────────────────────

/// Per-float access to the calling thread's active-tape slot.
///
/// Recording reaches the tape through a plain thread-local pointer rather
/// than a borrow, which is what lets [`Number`](crate::Number) stay `Copy`
/// and the operators record without threading a tape reference through every
/// call. `f32` and `f64` each get their own slot.
pub trait TapeThreadLocal: Float {
    /// Pointer currently installed for this thread; null when none.
    fn active() -> *mut Tape<Self>;

    /// Install `tape` for this thread, returning the previous pointer.
    fn swap_active(tape: *mut Tape<Self>) -> *mut Tape<Self>;
}

macro_rules! impl_tape_thread_local {
    ($f:ty, $slot:ident) => {
        thread_local! {
            static $slot: Cell<*mut Tape<$f>> = const { Cell::new(ptr::null_mut()) };
        }

        impl TapeThreadLocal for $f {
            fn active() -> *mut Tape<Self> {
                $slot.with(Cell::get)
            }

            fn swap_active(tape: *mut Tape<Self>) -> *mut Tape<Self> {
                $slot.with(|slot| slot.replace(tape))
            }
        }
    };
}

impl_tape_thread_local!(f32, ACTIVE_TAPE_F32);
impl_tape_thread_local!(f64, ACTIVE_TAPE_F64);

/// Run `f` against the thread's active tape. Panics if none is installed.
#[inline]
pub fn with_active_tape<F: TapeThreadLocal, R>(f: impl FnOnce(&mut Tape<F>) -> R) -> R {
    let tape = F::active();
    assert!(
        !tape.is_null(),
        "no active tape on this thread; install one with TapeGuard"
    );
    // SAFETY: the guard that installed the pointer keeps the tape alive for
    // its whole scope, and the slot is only reachable from this thread, so
    // no other reference to the tape exists while `f` runs.
    f(unsafe { &mut *tape })
}

/// Makes a tape the thread's active one for the guard's lifetime, then puts
/// back whatever was active before, so recordings nest.
pub struct TapeGuard<F: TapeThreadLocal> {
    prev: *mut Tape<F>,
}

impl<F: TapeThreadLocal> TapeGuard<F> {
    pub fn new(tape: &mut Tape<F>) -> Self {
        TapeGuard {
            prev: F::swap_active(tape),
        }
    }
}

impl<F: TapeThreadLocal> Drop for TapeGuard<F> {
    fn drop(&mut self) {
        F::swap_active(self.prev);
    }
}
