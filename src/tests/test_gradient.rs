use ndarray::arr1;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::QDriveError;
use crate::gradient::{Gradient, LayerGradient};
use crate::network::NeuralNetwork;
use crate::replay_buffer::Experience;
use super::fixtures::{assert_close, fixed_network};

fn sample_gradient(reward: f32) -> Gradient {
    let network = fixed_network();
    let experience = Experience {
        state: arr1(&[1.0, -1.0]),
        action: 1,
        reward,
        next_state: arr1(&[0.0, 0.0]),
        done: true,
    };
    network.compute_gradient(&experience, &network, 0.99).unwrap()
}

#[test]
fn test_empty_grad_matches_network_shape() {
    let network = NeuralNetwork::new(&[5, 16, 8, 4]).unwrap();
    let gradient = network.make_empty_grad();
    assert_eq!(gradient.num_layers(), 3);
    for (grad, layer) in gradient.layers().iter().zip(network.layers()) {
        assert_eq!(grad.weights.shape(), layer.weights.shape());
        assert_eq!(grad.biases.shape(), layer.biases.shape());
    }
    assert!(gradient.is_zero());
    assert_eq!(gradient.l2_norm(), 0.0);
}

#[test]
fn test_add_zero_is_identity() {
    let original = sample_gradient(1.0);
    let mut gradient = original.clone();
    gradient.add(&fixed_network().make_empty_grad()).unwrap();
    assert_eq!(gradient, original);
}

#[test]
fn test_add_sums_elementwise() {
    let a = sample_gradient(1.0);
    let b = sample_gradient(2.0);
    let mut sum = a.clone();
    sum.add(&b).unwrap();

    for ((s, x), y) in sum.layers().iter().zip(a.layers()).zip(b.layers()) {
        assert_close(&s.weights, &(&x.weights + &y.weights), 1e-7);
        assert_close(&s.biases, &(&x.biases + &y.biases), 1e-7);
    }
}

#[test]
fn test_add_returns_self_for_chaining() {
    let g = sample_gradient(1.0);
    let mut total = fixed_network().make_empty_grad();
    total.add(&g).unwrap().add(&g).unwrap().divide(2).unwrap();
    assert_close(&total.layers()[1].biases, &g.layers()[1].biases, 1e-7);
}

#[test]
fn test_divide_then_multiply_round_trip() {
    let original = sample_gradient(3.0);
    let mut gradient = original.clone();
    gradient.divide(7).unwrap();
    gradient.scale(7.0);
    for (a, b) in gradient.layers().iter().zip(original.layers()) {
        assert_close(&a.weights, &b.weights, 1e-5);
        assert_close(&a.biases, &b.biases, 1e-5);
    }
}

#[test]
fn test_divide_by_zero_fails() {
    let mut gradient = sample_gradient(1.0);
    assert!(matches!(gradient.divide(0), Err(QDriveError::InvalidParameter { .. })));
}

#[test]
fn test_batch_average_equals_single_when_repeated() {
    let g = sample_gradient(0.0);
    let mut total = fixed_network().make_empty_grad();
    for _ in 0..4 {
        total.add(&g).unwrap();
    }
    total.divide(4).unwrap();
    assert_close(&total.layers()[0].weights, &g.layers()[0].weights, 1e-6);
}

#[test]
fn test_add_rejects_mismatched_shapes() {
    let mut a = NeuralNetwork::new(&[2, 3, 2]).unwrap().make_empty_grad();
    let b = NeuralNetwork::new(&[2, 4, 2]).unwrap().make_empty_grad();
    let err = a.add(&b).unwrap_err();
    assert_eq!(
        err,
        QDriveError::ShapeMismatch { layer: 0, parameter: "weights", expected: vec![2, 3], actual: vec![2, 4] }
    );

    let c = NeuralNetwork::new(&[2, 3, 3, 2]).unwrap().make_empty_grad();
    assert!(matches!(a.add(&c), Err(QDriveError::ArchitectureMismatch { .. })));
}

#[test]
fn test_add_rejects_mismatched_bias_shape() {
    let mut a = Gradient::from_layers(vec![LayerGradient::zeros(2, 3)]);
    let mut bad = LayerGradient::zeros(2, 3);
    bad.biases = arr1(&[0.0, 0.0]);
    let b = Gradient::from_layers(vec![bad]);
    assert!(matches!(a.add(&b), Err(QDriveError::ShapeMismatch { layer: 0, parameter: "biases", .. })));
}

#[test]
fn test_l2_norm() {
    let mut gradient = Gradient::from_layers(vec![LayerGradient::zeros(1, 2)]);
    gradient.add(&Gradient::from_layers(vec![LayerGradient {
        weights: ndarray::arr2(&[[3.0, 0.0]]),
        biases: arr1(&[0.0, 4.0]),
    }])).unwrap();
    assert!((gradient.l2_norm() - 5.0).abs() < 1e-6);
}

#[test]
fn test_gradients_from_seeded_networks_match() {
    let a = NeuralNetwork::with_rng(&[3, 4, 2], &mut StdRng::seed_from_u64(8)).unwrap();
    let b = NeuralNetwork::with_rng(&[3, 4, 2], &mut StdRng::seed_from_u64(8)).unwrap();
    let experience = Experience {
        state: arr1(&[0.2, 0.4, 0.6]),
        action: 0,
        reward: 1.0,
        next_state: arr1(&[0.3, 0.5, 0.7]),
        done: false,
    };
    assert_eq!(
        a.compute_gradient(&experience, &b, 0.9).unwrap(),
        b.compute_gradient(&experience, &a, 0.9).unwrap()
    );
}
