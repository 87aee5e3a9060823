use linfa::prelude::*;
use ndarray::{arr1, arr2, Array, Axis};
use patchbox_gp::{GaussianProcess, Matern52};

fn main() {
    let xtrain = arr2(&[[0.0], [1.0], [2.0], [3.0], [4.0]]);
    let ytrain = arr1(&[0.0, 1.0, 1.5, 0.9, 1.0]);

    let gp = GaussianProcess::<f64, _>::params(Matern52::new(1., 1.))
        .nugget(1e-6)
        .fit(&Dataset::new(xtrain, ytrain))
        .expect("GP fitting");

    let xtest = Array::linspace(0., 4., 9).insert_axis(Axis(1));
    let prediction = gp.predict_marginal(&xtest).expect("GP prediction");
    println!("{gp}");
    println!("mean = {}", prediction.mean);
    println!("variances = {:?}", prediction.covariance);
}
