//! Reproducibility properties: a forest depends only on its request and seed.

use proptest::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use canopy_forest::{
    ForestConfig, ImportanceMode, Matrix, PredictionRequest, PredictionResult, SplitRule, Target,
    TrainingRequest,
};

fn make_regression(n_rows: usize, data_seed: u64) -> (Matrix, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(data_seed);
    let columns: Vec<Vec<f64>> = (0..3)
        .map(|_| (0..n_rows).map(|_| rng.r#gen::<f64>()).collect())
        .collect();
    let y = (0..n_rows)
        .map(|i| 2.0 * columns[0][i] - columns[2][i] + 0.2 * rng.r#gen::<f64>())
        .collect();
    (Matrix::from_columns(&columns).unwrap(), y)
}

fn regression_request(config: ForestConfig, data_seed: u64) -> TrainingRequest {
    let (x, y) = make_regression(60, data_seed);
    TrainingRequest::new(x, Target::Regression(y), config)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn same_seed_same_forest(seed in any::<u64>(), data_seed in 0_u64..1000) {
        let config = ForestConfig::new(4).unwrap().with_seed(seed);
        let a = regression_request(config.clone(), data_seed).fit().unwrap();
        let b = regression_request(config, data_seed).fit().unwrap();
        prop_assert_eq!(a.trees(), b.trees());
        prop_assert_eq!(a.oob(), b.oob());
    }

    #[test]
    fn thread_count_does_not_change_forest(seed in any::<u64>(), threads in 2_usize..5) {
        let single = regression_request(
            ForestConfig::new(6).unwrap().with_seed(seed).with_num_threads(1),
            3,
        )
        .fit()
        .unwrap();
        let pooled = regression_request(
            ForestConfig::new(6).unwrap().with_seed(seed).with_num_threads(threads),
            3,
        )
        .fit()
        .unwrap();
        prop_assert_eq!(single.trees(), pooled.trees());
    }

    #[test]
    fn extra_trees_thresholds_are_reproducible(seed in any::<u64>()) {
        let config = ForestConfig::new(3)
            .unwrap()
            .with_seed(seed)
            .with_split_rule(Some(SplitRule::extra_trees()));
        let a = regression_request(config.clone(), 5).fit().unwrap();
        let b = regression_request(config, 5).fit().unwrap();
        prop_assert_eq!(a.trees(), b.trees());
    }

    #[test]
    fn predictions_are_finite_for_any_row(
        row in proptest::collection::vec(-2.0_f64..3.0, 3),
    ) {
        let forest = regression_request(ForestConfig::new(5).unwrap(), 1).fit().unwrap();
        let rows = Matrix::from_rows(&[row]).unwrap();
        let PredictionResult::Regression(predicted) =
            forest.predict(&PredictionRequest::new(rows)).unwrap()
        else {
            panic!("expected regression predictions");
        };
        prop_assert!(predicted[0].is_finite());
    }
}

#[test]
fn permutation_importance_is_thread_invariant() {
    let fit = |threads: usize| {
        regression_request(
            ForestConfig::new(8)
                .unwrap()
                .with_importance(ImportanceMode::Permutation)
                .with_num_threads(threads),
            9,
        )
        .fit()
        .unwrap()
    };
    let single = fit(1);
    let pooled = fit(4);
    assert_eq!(single.importance(), pooled.importance());
}

#[test]
fn different_seeds_give_different_bootstraps() {
    let a = regression_request(ForestConfig::new(2).unwrap().with_seed(1), 0)
        .fit()
        .unwrap();
    let b = regression_request(ForestConfig::new(2).unwrap().with_seed(2), 0)
        .fit()
        .unwrap();
    assert_ne!(a.trees()[0].bootstrap_rows(), b.trees()[0].bootstrap_rows());
}
