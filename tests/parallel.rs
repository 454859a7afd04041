//! Per-thread tape isolation: parallel recordings never observe each other.

use std::thread;

use approx::assert_relative_eq;
use quoll::{grad, Number, Tape, TapeGuard};

#[test]
fn each_thread_owns_its_tape() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let mut tape: Tape<f64> = Tape::new();
                let _guard = TapeGuard::new(&mut tape);

                let x = Number::new(1.0 + i as f64);
                let y = Number::new(0.5_f64);
                let mut z = x * y + x.exp();
                z.propagate_to_start();

                (x.value(), z.value(), x.adjoint(), y.adjoint())
            })
        })
        .collect();

    for handle in handles {
        let (x0, z, gx, gy) = handle.join().unwrap();
        // z = x·y + eˣ: dz/dx = y + eˣ, dz/dy = x.
        assert_relative_eq!(z, x0 * 0.5 + x0.exp(), max_relative = 1e-14);
        assert_relative_eq!(gx, 0.5 + x0.exp(), max_relative = 1e-14);
        assert_relative_eq!(gy, x0, max_relative = 1e-14);
    }
}

#[test]
fn identical_computations_on_two_threads_agree_bitwise() {
    let run = || {
        grad(
            |v: &[Number<f64>]| v[0] * v[0] + v[1].exp() * v[0] + v[1].ln(),
            &[1.5_f64, 0.3],
        )
    };

    let a = thread::spawn(run).join().unwrap();
    let b = thread::spawn(run).join().unwrap();
    assert_eq!(a, b);
}

#[test]
fn no_tape_on_fresh_thread() {
    // A thread that never installs a tape must refuse to record.
    let result = thread::spawn(|| {
        let caught = std::panic::catch_unwind(|| Number::new(1.0_f64));
        caught.is_err()
    })
    .join()
    .unwrap();
    assert!(result);
}
