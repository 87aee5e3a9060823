use linfa::prelude::*;
use ndarray::{concatenate, Array, Axis};
use patchbox_gp::{GaussianProcess, SquaredExponential};
use patchbox_patchwork::{IntervalFunctions, PatchworkGaussianProcess};

fn main() {
    env_logger::init();

    // samples on both sides of 0, none in between
    let xtrain = concatenate![
        Axis(0),
        Array::linspace(-1., -0.2, 5),
        Array::linspace(0.2, 1., 5)
    ]
    .insert_axis(Axis(1));
    let ytrain = xtrain.column(0).mapv(|v: f64| v + 0.3 * (6. * v).sin());
    let cov = SquaredExponential::new(0.4, 1.);

    let model = PatchworkGaussianProcess::params(cov, IntervalFunctions::new(vec![0.]))
        .nugget(1e-6)
        .fit(&Dataset::new(xtrain.clone(), ytrain.clone()))
        .expect("Patchwork GP fitting");
    println!("{model}");

    let xtest = Array::linspace(-0.3, 0.3, 7).insert_axis(Axis(1));
    let prediction = model.predict_marginal(&xtest).expect("Patchwork GP prediction");
    let global = GaussianProcess::params(cov)
        .nugget(1e-6)
        .fit(&Dataset::new(xtrain, ytrain))
        .expect("GP fitting")
        .predict(&xtest)
        .expect("GP prediction");

    println!("x\tpatchwork\tglobal GP");
    for ((x, m), g) in xtest.iter().zip(prediction.mean.iter()).zip(global.iter()) {
        println!("{x:.2}\t{m:.4}\t\t{g:.4}");
    }
}
