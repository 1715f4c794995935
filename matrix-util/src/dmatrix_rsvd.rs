use crate::traits::SampleOps;
use log::debug;
use nalgebra::{DMatrix, DVector};

type Mat = DMatrix<f32>;
type Vec = DVector<f32>;

pub trait RSVD {
    /// `(U, d, V)` truncated to `rank` components
    fn rsvd(&self, rank: usize) -> anyhow::Result<(Mat, Vec, Mat)>;
}

impl RSVD for Mat {
    fn rsvd(&self, rank: usize) -> anyhow::Result<(Mat, Vec, Mat)> {
        let default_iter = 5;
        let mut rsvd = RandomizedSVD::new(rank, default_iter);
        rsvd.compute(self)?;
        Ok((
            rsvd.matrix_u().clone(),
            rsvd.singular_values().clone(),
            rsvd.matrix_v().clone(),
        ))
    }
}

/// Randomized SVD
///
/// Randomized range finder with subspace (power) iterations,
/// Alg 4.4 of Halko et al. (2009). Falls back to the exact SVD when
/// the requested rank covers the smaller dimension.
///
pub struct RandomizedSVD {
    max_rank: usize,
    iter: usize,
    oversample: usize,
    u_vectors: Mat,
    singular_values: Vec,
    v_vectors: Mat,
}

impl RandomizedSVD {
    pub fn new(max_rank: usize, iter: usize) -> Self {
        Self {
            max_rank,
            iter,
            oversample: 10,
            u_vectors: Mat::zeros(0, 0),
            singular_values: Vec::zeros(0),
            v_vectors: Mat::zeros(0, 0),
        }
    }

    pub fn matrix_u(&self) -> &Mat {
        &self.u_vectors
    }

    pub fn matrix_v(&self) -> &Mat {
        &self.v_vectors
    }

    pub fn singular_values(&self) -> &Vec {
        &self.singular_values
    }

    pub fn compute(&mut self, xx: &Mat) -> anyhow::Result<()> {
        let nr = xx.nrows();
        let nc = xx.ncols();
        let full_rank = nr.min(nc);

        if full_rank == 0 {
            anyhow::bail!("empty matrix [{} x {}]", nr, nc);
        }

        let rank = if self.max_rank > 0 {
            self.max_rank.min(full_rank)
        } else {
            full_rank
        };

        if rank + self.oversample >= full_rank {
            debug!("exact svd on [{} x {}]", nr, nc);
            return self.take_svd(xx.clone().svd(true, true), None, rank);
        }

        let qq = self.rand_subspace_iteration(xx, rank + self.oversample);

        let bb = qq.transpose() * xx;
        debug!("final svd on [{} x {}]", bb.nrows(), bb.ncols());

        self.take_svd(bb.svd(true, true), Some(&qq), rank)
    }

    fn take_svd(
        &mut self,
        svd: nalgebra::SVD<f32, nalgebra::Dyn, nalgebra::Dyn>,
        qq: Option<&Mat>,
        rank: usize,
    ) -> anyhow::Result<()> {
        // nalgebra doesn't promise sorted singular values
        let mut order: std::vec::Vec<usize> = (0..svd.singular_values.len()).collect();
        order.sort_by(|&a, &b| {
            svd.singular_values[b]
                .partial_cmp(&svd.singular_values[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.truncate(rank);

        let (Some(svd_u), Some(svd_vt)) = (svd.u, svd.v_t) else {
            anyhow::bail!("SVD failed");
        };

        let uu = svd_u.select_columns(order.iter());
        self.u_vectors = match qq {
            Some(qq) => qq * uu,
            None => uu,
        };
        self.v_vectors = svd_vt.select_rows(order.iter()).transpose();
        self.singular_values = Vec::from_iterator(
            order.len(),
            order.iter().map(|&k| svd.singular_values[k]),
        );
        Ok(())
    }

    /// Find an orthonormal matrix whose range approximates the range of xx
    fn rand_subspace_iteration(&self, xx: &Mat, rank_and_oversample: usize) -> Mat {
        let nc = xx.ncols();

        let omega = Mat::rnorm(nc, rank_and_oversample);
        let mut qq = (xx * omega).qr().q();

        for i in 0..self.iter {
            let zz = (xx.transpose() * &qq).qr().q();
            qq = (xx * zz).qr().q();
            debug!("subspace iteration {:>3}", i + 1);
        }

        let kk = rank_and_oversample.min(qq.ncols());
        qq.columns(0, kk).into_owned()
    }
}
