use crate::traits::*;
pub use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{coo::CooMatrix, csc::CscMatrix};
use num_traits::Float;
pub use rand::Rng;
pub use rand_distr::StandardNormal;
pub use rayon::prelude::*;

/// Median of the values (average of the two middle values for an
/// even count); `None` if empty or non-finite
pub fn median<T: Float>(values: &[T]) -> Option<T> {
    if values.is_empty() || values.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let two = T::one() + T::one();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / two)
    }
}

macro_rules! impl_sample_ops {
    ($t:ty) => {
        impl SampleOps for DMatrix<$t> {
            type Mat = Self;
            type Scalar = $t;

            fn rnorm(dd: usize, nn: usize) -> Self::Mat {
                let rvec = (0..(dd * nn))
                    .into_par_iter()
                    .map_init(rand::rng, |rng, _| rng.sample::<$t, _>(StandardNormal))
                    .collect();
                DMatrix::<$t>::from_vec(dd, nn, rvec)
            }
        }
    };
}

impl_sample_ops!(f32);
impl_sample_ops!(f64);

impl<T> MatOps for DMatrix<T>
where
    T: nalgebra::RealField + Float + Copy + Send + Sync,
{
    type Mat = Self;
    type Scalar = T;

    fn column_means(&self) -> Vec<T> {
        let n = <T as num_traits::NumCast>::from(self.nrows().max(1)).unwrap_or_else(T::one);
        self.column_iter().map(|x_j| x_j.sum() / n).collect()
    }

    fn column_mean_sd(&self) -> (Vec<T>, Vec<T>) {
        let nrows = self.nrows();
        let n = <T as num_traits::NumCast>::from(nrows.max(1)).unwrap_or_else(T::one);
        self.column_iter()
            .map(|x_j| {
                let mu = x_j.sum() / n;
                let ss = x_j.iter().fold(T::zero(), |acc, &x| acc + (x - mu) * (x - mu));
                (mu, Float::sqrt(ss / n))
            })
            .unzip()
    }

    fn centre_columns_inplace(&mut self) {
        let mu = self.column_means();
        self.column_iter_mut().zip(mu).for_each(|(mut x_j, mu_j)| {
            x_j.add_scalar_mut(-mu_j);
        });
    }

    fn standardize_columns(&self, max_z: Option<T>) -> Self::Mat {
        let (mu, sd) = self.column_mean_sd();
        let mut ret = self.clone();
        ret.column_iter_mut()
            .zip(mu.iter().zip(sd.iter()))
            .for_each(|(mut x_j, (&mu_j, &sd_j))| {
                if sd_j > T::zero() {
                    x_j.iter_mut().for_each(|x| {
                        let z = (*x - mu_j) / sd_j;
                        *x = match max_z {
                            Some(m) => Float::max(Float::min(z, m), -m),
                            None => z,
                        };
                    });
                } else {
                    x_j.fill(T::zero());
                }
            });
        ret
    }
}

impl<T> DistanceOps for DMatrix<T>
where
    T: nalgebra::RealField + Float + Copy + Send + Sync,
{
    type Scalar = T;
    type Mat = Self;

    fn squared_euclidean_rows(&self, other: &Self) -> anyhow::Result<Self::Mat> {
        if self.ncols() != other.ncols() {
            anyhow::bail!(
                "dimension mismatch: {} vs {} columns",
                self.ncols(),
                other.ncols()
            );
        }

        let n = self.nrows();
        let m = other.nrows();

        // |x|^2 + |y|^2 - 2 x'y, each source row in parallel
        let other_sq: Vec<T> = other.row_iter().map(|y| y.norm_squared()).collect();

        let rows: Vec<Vec<T>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let x_i = self.row(i);
                let x_sq = x_i.norm_squared();
                (0..m)
                    .map(|j| {
                        let d = x_sq + other_sq[j] - (x_i.dot(&other.row(j)) * (T::one() + T::one()));
                        Float::max(d, T::zero())
                    })
                    .collect()
            })
            .collect();

        Ok(DMatrix::from_row_iterator(n, m, rows.into_iter().flatten()))
    }
}

impl MatTriplets for CscMatrix<f32> {
    type Mat = Self;
    type Scalar = f32;

    fn from_nonzero_triplets<I>(
        nrow: usize,
        ncol: usize,
        triplets: &[(I, I, f32)],
    ) -> anyhow::Result<Self::Mat>
    where
        I: TryInto<usize> + Copy,
        <I as TryInto<usize>>::Error: std::fmt::Debug,
    {
        let mut coo = CooMatrix::<f32>::new(nrow, ncol);
        for &(ii, jj, x_ij) in triplets {
            let i: usize = ii
                .try_into()
                .map_err(|e| anyhow::anyhow!("bad row index: {:?}", e))?;
            let j: usize = jj
                .try_into()
                .map_err(|e| anyhow::anyhow!("bad column index: {:?}", e))?;
            if i >= nrow || j >= ncol {
                anyhow::bail!("triplet ({}, {}) out of range [{} x {}]", i, j, nrow, ncol);
            }
            coo.push(i, j, x_ij);
        }
        Ok(CscMatrix::from(&coo))
    }

    fn to_nonzero_triplets(&self) -> anyhow::Result<(usize, usize, Vec<(usize, usize, f32)>)> {
        let triplets = self
            .triplet_iter()
            .map(|(i, j, &x_ij)| (i, j, x_ij))
            .collect();
        Ok((self.nrows(), self.ncols(), triplets))
    }
}
