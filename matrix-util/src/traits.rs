/// Convert to and from the vector of triplets
pub trait MatTriplets {
    type Mat;
    type Scalar;

    fn from_nonzero_triplets<I>(
        nrow: usize,
        ncol: usize,
        triplets: &[(I, I, Self::Scalar)],
    ) -> anyhow::Result<Self::Mat>
    where
        I: TryInto<usize> + Copy,
        <I as TryInto<usize>>::Error: std::fmt::Debug;

    fn to_nonzero_triplets(
        &self,
    ) -> anyhow::Result<(usize, usize, Vec<(usize, usize, Self::Scalar)>)>;
}

/// Column-wise summaries and transformations
pub trait MatOps {
    type Mat;
    type Scalar;

    /// column means
    fn column_means(&self) -> Vec<Self::Scalar>;

    /// column means and population standard deviations
    fn column_mean_sd(&self) -> (Vec<Self::Scalar>, Vec<Self::Scalar>);

    /// subtract column means in place
    fn centre_columns_inplace(&mut self);

    /// `(x - mean) / sd` for every column, clipped to `[-max_z, max_z]`;
    /// columns with zero variance become 0
    fn standardize_columns(&self, max_z: Option<Self::Scalar>) -> Self::Mat;
}

/// Operations to sample random matrices
pub trait SampleOps {
    type Mat;
    type Scalar;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm(dd: usize, nn: usize) -> Self::Mat;
}

pub trait DistanceOps {
    type Scalar;
    type Mat;

    /// `D[i,j] = |self[i,:] - other[j,:]|^2` between the rows of two
    /// matrices with the same number of columns
    fn squared_euclidean_rows(&self, other: &Self) -> anyhow::Result<Self::Mat>;
}
