use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const POWER_ITERATIONS: usize = 100;
const EPSILON: f32 = 1e-8;
const TOLERANCE: f32 = 1e-6;

/// Scale every column to zero mean and unit variance. Columns with no
/// variance carry no signal and collapse to zero.
pub fn standardize(mut x: Array2<f32>) -> Array2<f32> {
    let rows = x.nrows();
    if rows == 0 {
        return x;
    }

    for mut column in x.axis_iter_mut(Axis(1)) {
        let mean = column.sum() / rows as f32;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / rows as f32;
        let std_dev = variance.sqrt();

        if std_dev > EPSILON {
            column.mapv_inplace(|v| (v - mean) / std_dev);
        } else {
            column.fill(0.0);
        }
    }

    x
}

/// Variance-maximizing linear reduction of centered data to at most
/// `max_components` dimensions: leading eigenvectors of the covariance
/// matrix extracted by power iteration with deflation. The starting vector
/// is drawn from a seeded rng so the projection is reproducible.
pub fn project(x: &Array2<f32>, max_components: usize, seed: u64) -> Array2<f32> {
    let (rows, cols) = x.dim();
    let k = max_components.min(cols).min(rows);
    if k == 0 || rows == 0 {
        return Array2::zeros((rows, 0));
    }

    let mut covariance = x.t().dot(x) / rows as f32;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut components: Vec<Array1<f32>> = Vec::with_capacity(k);

    for _ in 0..k {
        let mut direction = random_unit(&mut rng, cols);

        for _ in 0..POWER_ITERATIONS {
            let mut next = covariance.dot(&direction);
            for found in &components {
                let overlap = next.dot(found);
                next.scaled_add(-overlap, found);
            }

            let magnitude = norm(&next);
            if magnitude < EPSILON {
                break;
            }
            next /= magnitude;

            let shift: f32 = next
                .iter()
                .zip(direction.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();
            direction = next;
            if shift < TOLERANCE {
                break;
            }
        }

        let eigenvalue = direction.dot(&covariance.dot(&direction));
        let outer = Array2::from_shape_fn((cols, cols), |(i, j)| {
            direction[i] * direction[j] * eigenvalue
        });
        covariance = covariance - outer;
        components.push(direction);
    }

    let mut reduced = Array2::zeros((rows, components.len()));
    for (j, component) in components.iter().enumerate() {
        reduced.column_mut(j).assign(&x.dot(component));
    }
    reduced
}

fn norm(v: &Array1<f32>) -> f32 {
    v.dot(v).sqrt()
}

fn random_unit(rng: &mut StdRng, len: usize) -> Array1<f32> {
    let mut v = Array1::from_shape_fn(len, |_| rng.gen_range(-1.0..1.0f32));
    let magnitude = norm(&v);
    if magnitude > EPSILON {
        v /= magnitude;
    } else {
        v.fill(0.0);
        v[0] = 1.0;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn standardized_columns_have_zero_mean() {
        let x = array![[1.0, 10.0], [3.0, 20.0], [5.0, 60.0]];
        let standardized = standardize(x);

        for column in standardized.axis_iter(Axis(1)) {
            let mean = column.sum() / column.len() as f32;
            assert!(mean.abs() < 1e-5);
        }
    }

    #[test]
    fn constant_column_collapses_to_zero() {
        let x = array![[7.0, 1.0], [7.0, 2.0], [7.0, 3.0]];
        let standardized = standardize(x);

        assert!(standardized.column(0).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn projection_bounds_dimensionality() {
        let x = standardize(array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 10.0],
            [2.0, 1.0, 0.0]
        ]);
        let reduced = project(&x, 2, 42);

        assert_eq!(reduced.nrows(), 4);
        assert_eq!(reduced.ncols(), 2);
    }

    #[test]
    fn projection_is_reproducible() {
        let x = standardize(array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        let first = project(&x, 2, 42);
        let second = project(&x, 2, 42);
        assert_eq!(first, second);
    }

    #[test]
    fn leading_component_separates_spread_axis() {
        // variance lives almost entirely on the first feature
        let x = standardize(array![[-10.0, 0.1], [10.0, -0.1], [-9.0, 0.0], [9.0, 0.0]]);
        let reduced = project(&x, 1, 42);

        assert_eq!(reduced.ncols(), 1);
        // opposite-signed rows on the dominant axis stay opposite-signed
        assert!(reduced[[0, 0]] * reduced[[1, 0]] < 0.0);
    }
}
