use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quoll::gaussians::normal_cdf;
use quoll::{grad, with_active_tape, Number, Tape, TapeGuard};

// Spot, strike, volatility, rate, maturity.
const MARKET: [f64; 5] = [100.0, 105.0, 0.2, 0.03, 1.25];

/// Black-Scholes call on plain floats. Uses the same Φ as the AAD side so
/// the bump gradient differentiates the identical function.
fn call_price_f64(x: &[f64]) -> f64 {
    let (s, k, vol, r, t) = (x[0], x[1], x[2], x[3], x[4]);
    let std_dev = vol * t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * vol * vol) * t) / std_dev;
    let d2 = d1 - std_dev;
    s * normal_cdf(d1) - k * (-r * t).exp() * normal_cdf(d2)
}

/// Same payoff on tape: five leaves, one recording, all Greeks in one sweep.
fn call_price_aad(x: &[Number<f64>]) -> Number<f64> {
    let (s, k, vol, r, t) = (x[0], x[1], x[2], x[3], x[4]);
    let std_dev = vol * t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * (vol * vol)) * t) / std_dev;
    let d2 = d1 - std_dev;
    s * d1.normal_cdf() - k * (-(r * t)).exp() * d2.normal_cdf()
}

/// Central bump-and-reprice: 2n evaluations per gradient.
fn bump_gradient(x: &[f64], h: f64) -> Vec<f64> {
    (0..x.len())
        .map(|i| {
            let mut up = x.to_vec();
            let mut dn = x.to_vec();
            up[i] += h;
            dn[i] -= h;
            (call_price_f64(&up) - call_price_f64(&dn)) / (2.0 * h)
        })
        .collect()
}

fn bench_greeks(c: &mut Criterion) {
    let mut group = c.benchmark_group("greeks");

    group.bench_function("price_f64", |b| {
        b.iter(|| black_box(call_price_f64(black_box(&MARKET))))
    });
    group.bench_function("aad_reverse", |b| {
        b.iter(|| black_box(grad(call_price_aad, black_box(&MARKET))))
    });
    group.bench_function("bump_2n", |b| {
        b.iter(|| black_box(bump_gradient(black_box(&MARKET), 1e-5)))
    });

    group.finish();
}

fn portfolio_f64(x: &[f64], strikes: &[f64]) -> f64 {
    let (s, vol, r, t) = (x[0], x[1], x[2], x[3]);
    let std_dev = vol * t.sqrt();
    let df = (-r * t).exp();
    let mut pv = 0.0;
    for &k in strikes {
        let d1 = ((s / k).ln() + (r + 0.5 * vol * vol) * t) / std_dev;
        let d2 = d1 - std_dev;
        pv += s * normal_cdf(d1) - k * df * normal_cdf(d2);
    }
    pv
}

fn portfolio_aad(x: &[Number<f64>], strikes: &[f64]) -> Number<f64> {
    let (s, vol, r, t) = (x[0], x[1], x[2], x[3]);
    let std_dev = vol * t.sqrt();
    let df = (-(r * t)).exp();
    let mut pv = Number::new(0.0);
    for &k in strikes {
        let d1 = ((s / k).ln() + (r + 0.5 * (vol * vol)) * t) / std_dev;
        let d2 = d1 - std_dev;
        pv += s * d1.normal_cdf() - k * (df * d2.normal_cdf());
    }
    pv
}

fn bench_portfolio(c: &mut Criterion) {
    // A strike ladder priced off four shared market inputs. Reverse mode
    // pays one sweep for the whole gradient however long the ladder gets.
    let mut group = c.benchmark_group("portfolio_greeks");
    let market = [100.0, 0.2, 0.03, 1.25];

    for m in [4usize, 32, 256] {
        let strikes: Vec<f64> = (0..m)
            .map(|i| 70.0 + 60.0 * (i as f64 + 0.5) / m as f64)
            .collect();

        group.bench_with_input(BenchmarkId::new("reprice_f64", m), &strikes, |b, ks| {
            b.iter(|| black_box(portfolio_f64(black_box(&market), ks)))
        });
        group.bench_with_input(BenchmarkId::new("aad_full_gradient", m), &strikes, |b, ks| {
            b.iter(|| black_box(grad(|v| portfolio_aad(v, ks), black_box(&market))))
        });
    }

    group.finish();
}

fn bench_tape_rewind(c: &mut Criterion) {
    // Steady-state Monte-Carlo shape: one persistent tape, rewound and
    // re-recorded every iteration, so the arena recycles with no allocation.
    let mut tape: Tape<f64> = Tape::new();
    let _guard = TapeGuard::new(&mut tape);

    c.bench_function("rewind_reprice_greeks", |b| {
        b.iter(|| {
            with_active_tape(|t: &mut Tape<f64>| t.rewind());
            let leaves: Vec<Number<f64>> =
                MARKET.iter().map(|&v| Number::new(black_box(v))).collect();
            let mut price = call_price_aad(&leaves);
            price.propagate_to_start();
            black_box((leaves[0].adjoint(), leaves[2].adjoint()))
        })
    });
}

criterion_group!(benches, bench_greeks, bench_portfolio, bench_tape_rewind);
criterion_main!(benches);
