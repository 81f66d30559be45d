use rand::seq::SliceRandom;

use crate::context::ExecutionContext;
use crate::error::{MdnError, Result};
use crate::math::matrix::Matrix;
use crate::mixture::params::shape_str;

/// Row-aligned train and test partitions of a paired dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSplit {
    pub x_train: Matrix,
    pub x_test: Matrix,
    pub y_train: Matrix,
    pub y_test: Matrix,
}

/// Shuffles rows and holds out `ceil(n · test_fraction)` of them for testing.
pub fn train_test_split(
    x: &Matrix,
    y: &Matrix,
    test_fraction: f64,
    ctx: &mut ExecutionContext,
) -> Result<DataSplit> {
    if x.rows != y.rows {
        return Err(MdnError::shape("train/test split", format!("{} rows", x.rows), shape_str(y)));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(MdnError::InvalidConfig(format!(
            "test fraction must lie in (0, 1), got {test_fraction}"
        )));
    }
    let n_test = (x.rows as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= x.rows {
        return Err(MdnError::InvalidConfig(format!(
            "cannot hold out {n_test} of {} rows", x.rows
        )));
    }

    let mut indices: Vec<usize> = (0..x.rows).collect();
    indices.shuffle(ctx.rng());
    let (test, train) = indices.split_at(n_test);

    Ok(DataSplit {
        x_train: x.select_rows(train),
        x_test: x.select_rows(test),
        y_train: y.select_rows(train),
        y_test: y.select_rows(test),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::toy::build_toy_dataset;

    #[test]
    fn reference_split_sizes() {
        let mut ctx = ExecutionContext::seeded(42);
        let (x, y) = build_toy_dataset(6000, &mut ctx);
        let split = train_test_split(&x, &y, 0.25, &mut ctx).unwrap();
        assert_eq!(split.x_train.shape(), (4500, 1));
        assert_eq!(split.y_train.shape(), (4500, 1));
        assert_eq!(split.x_test.shape(), (1500, 1));
        assert_eq!(split.y_test.shape(), (1500, 1));
    }

    #[test]
    fn pairs_survive_the_shuffle() {
        let x = Matrix::column(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let y = x.map(|v| v * 10.0);
        let split = train_test_split(&x, &y, 0.25, &mut ExecutionContext::seeded(3)).unwrap();
        for (xs, ys) in [(&split.x_train, &split.y_train), (&split.x_test, &split.y_test)] {
            for (xi, yi) in xs.iter_rows().zip(ys.iter_rows()) {
                assert_eq!(yi[0], xi[0] * 10.0);
            }
        }
        assert_eq!(split.x_test.rows, 2);
    }

    #[test]
    fn rejects_bad_inputs() {
        let mut ctx = ExecutionContext::seeded(0);
        let x = Matrix::column(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            train_test_split(&x, &Matrix::column(&[1.0]), 0.25, &mut ctx),
            Err(MdnError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            train_test_split(&x, &x, 1.5, &mut ctx),
            Err(MdnError::InvalidConfig(_))
        ));
    }
}
