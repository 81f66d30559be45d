//! Properties of the mixture parameters and likelihood that hold for any
//! network weights: shape and normalization, label-switching symmetry, the
//! single-component limit, determinism and the collapsed-sigma boundary.

use approx::assert_relative_eq;
use ferrite_mdn::{
    math::stats::normal_log_pdf, mixture, ExecutionContext, LikelihoodMode, Matrix, MdnError,
    MixtureDensityNetwork, MixtureParams,
};
use proptest::prelude::*;

fn network(components: usize, seed: u64) -> MixtureDensityNetwork {
    MixtureDensityNetwork::new(components, &mut ExecutionContext::seeded(seed)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn mixture_parameters_are_well_formed(
        components in 1usize..8,
        seed in any::<u64>(),
        xs in prop::collection::vec(-20.0f64..20.0, 1..40),
    ) {
        let mut net = network(components, seed);
        let params = net.compute_mixture_parameters(&Matrix::column(&xs)).unwrap();

        for m in [&params.pi, &params.mu, &params.sigma] {
            prop_assert_eq!(m.shape(), (xs.len(), components));
        }
        for row in params.pi.iter_rows() {
            prop_assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-5);
            prop_assert!(row.iter().all(|&p| p >= 0.0));
        }
        prop_assert!(params.sigma.iter_rows().flatten().all(|&s| s > 0.0));
    }

    #[test]
    fn likelihood_ignores_component_order(
        seed in any::<u64>(),
        rotation in 0usize..5,
        xs in prop::collection::vec(-10.0f64..10.0, 1..20),
    ) {
        let mut net = network(5, seed);
        let params = net.compute_mixture_parameters(&Matrix::column(&xs)).unwrap();
        let y = Matrix::column(&xs.iter().map(|x| 0.3 * x - 1.0).collect::<Vec<_>>());

        let order: Vec<usize> = (0..5).map(|k| (k + rotation) % 5).rev().collect();
        let permuted = params.permute_components(&order);
        let original = mixture::log_likelihood(&params, &y, LikelihoodMode::LogSumExp).unwrap();
        let shuffled = mixture::log_likelihood(&permuted, &y, LikelihoodMode::LogSumExp).unwrap();
        prop_assert!((original - shuffled).abs() <= 1e-9 * original.abs().max(1.0));
    }
}

#[test]
fn single_component_is_a_plain_gaussian() {
    let mut net = network(1, 17);
    let x = Matrix::column(&[-4.0, -1.0, 0.5, 2.0, 6.0]);
    let y = Matrix::column(&[0.0, 1.5, -2.0, 3.0, 0.25]);

    let total = net.log_likelihood(&x, &y).unwrap();
    let params = net.mixture_state().unwrap();
    assert!(params.pi.iter_rows().all(|row| row[0] == 1.0));

    let expected: f64 = (0..5)
        .map(|i| normal_log_pdf(y.data[i][0], params.mu.data[i][0], params.sigma.data[i][0]))
        .sum();
    assert_relative_eq!(total, expected, epsilon = 1e-9);
}

#[test]
fn likelihood_is_deterministic_for_a_seed() {
    let x = Matrix::column(&[-3.0, 0.0, 3.0]);
    let y = Matrix::column(&[1.0, -1.0, 0.5]);

    let mut a = network(4, 99);
    let mut b = network(4, 99);
    let first = a.log_likelihood(&x, &y).unwrap();
    assert_eq!(first, a.log_likelihood(&x, &y).unwrap());
    assert_eq!(first, b.log_likelihood(&x, &y).unwrap());
    assert_ne!(first, network(4, 100).log_likelihood(&x, &y).unwrap());
}

#[test]
fn collapsing_sigma_on_target_diverges_then_is_rejected() {
    let y = Matrix::column(&[2.0]);
    let row_ll = |sigma: f64| {
        let params = MixtureParams::new(
            Matrix::from_data(vec![vec![0.5, 0.5]]),
            Matrix::from_data(vec![vec![2.0, -3.0]]),
            Matrix::from_data(vec![vec![sigma, 1.0]]),
        )
        .unwrap();
        mixture::log_likelihood(&params, &y, LikelihoodMode::LogSumExp).unwrap()
    };

    let values: Vec<f64> = [1e-1, 1e-5, 1e-20, 1e-100, 1e-300].iter().map(|&s| row_ll(s)).collect();
    assert!(values.windows(2).all(|w| w[1] > w[0]));
    assert!(values[4] > 680.0 && values[4].is_finite());

    let collapsed = MixtureParams::new(
        Matrix::from_data(vec![vec![0.5, 0.5]]),
        Matrix::from_data(vec![vec![2.0, -3.0]]),
        Matrix::from_data(vec![vec![0.0, 1.0]]),
    );
    assert!(matches!(collapsed, Err(MdnError::NumericalDegeneracy { row: 0, .. })));
}

#[test]
fn direct_mode_reports_overflowing_density() {
    let params = MixtureParams::new(
        Matrix::from_data(vec![vec![1.0]]),
        Matrix::from_data(vec![vec![0.0]]),
        Matrix::from_data(vec![vec![1e-320]]),
    )
    .unwrap();
    let y = Matrix::column(&[0.0]);
    assert!(matches!(
        mixture::log_likelihood(&params, &y, LikelihoodMode::Direct),
        Err(MdnError::NumericalDegeneracy { .. })
    ));
    assert!(mixture::log_likelihood(&params, &y, LikelihoodMode::LogSumExp).unwrap().is_finite());
}

#[test]
fn batch_shape_errors() {
    let mut net = network(3, 1);
    let x = Matrix::column(&[1.0, 2.0, 3.0]);
    assert!(matches!(
        net.log_likelihood(&x, &Matrix::column(&[1.0, 2.0])),
        Err(MdnError::ShapeMismatch { .. })
    ));
    assert!(matches!(
        net.log_likelihood(&x, &Matrix::zeros(3, 2)),
        Err(MdnError::ShapeMismatch { .. })
    ));
}
