pub mod common_io; // buffered, gzip-aware line I/O
pub mod dmatrix_rsvd; // randomized SVD
pub mod dmatrix_util; // dense matrix helpers
pub mod mtx_io; // matrix market triplets
pub mod traits;
