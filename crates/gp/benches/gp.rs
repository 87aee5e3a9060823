use criterion::{criterion_group, criterion_main, Criterion};
use linfa::prelude::{Dataset, Fit};
use ndarray::{Array, Array1, Zip};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use patchbox_gp::{GaussianProcess, SquaredExponential};
use rand_xoshiro::Xoshiro256Plus;

fn criterion_gp(c: &mut Criterion) {
    let dims = [2, 5];
    let nts = [100, 300];

    let mut group = c.benchmark_group("gp");
    group.sample_size(20);
    for i in 0..2 {
        let dim = dims[i];
        let nt = nts[i];
        let griewank = |x: &Array1<f64>| -> f64 {
            let d = Array1::linspace(1., dim as f64, dim).mapv(|v| v.sqrt());
            x.mapv(|v| v * v).sum() / 4000. - (x / &d).mapv(|v| v.cos()).fold(1., |acc, x| acc * x)
                + 1.0
        };
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let xt = Array::random_using((nt, dim), Uniform::new(-10., 10.), &mut rng);
        let mut yt: Array1<f64> = Array1::zeros(xt.nrows());
        Zip::from(&mut yt).and(xt.rows()).par_for_each(|y, x| {
            *y = griewank(&x.to_owned());
        });

        group.bench_function(format!("gp fit {}x{}", nt, dim), |b| {
            b.iter(|| {
                std::hint::black_box(
                    GaussianProcess::<f64, _>::params(SquaredExponential::new(2., 1.))
                        .nugget(1e-6)
                        .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
                        .expect("GP fit error"),
                )
            });
        });

        let gp = GaussianProcess::<f64, _>::params(SquaredExponential::new(2., 1.))
            .nugget(1e-6)
            .fit(&Dataset::new(xt.to_owned(), yt.to_owned()))
            .expect("GP fit error");
        let xv = Array::random_using((50, dim), Uniform::new(-10., 10.), &mut rng);
        group.bench_function(format!("gp predict joint {}x{}", nt, dim), |b| {
            b.iter(|| std::hint::black_box(gp.predict_joint(&xv).expect("GP prediction")));
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_gp);
criterion_main!(benches);
