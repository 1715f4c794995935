pub mod cost; // normalized squared distances
pub mod gene_set_scores; // per-cell gene-set scores
pub mod growth; // growth-rate prior
pub mod local_pca; // shared projection of a day pair
pub mod simulate; // interpolation and gaussian mixtures
pub mod sinkhorn; // unbalanced entropic transport
pub mod trajectory; // ancestors and descendants
pub mod transport_map; // one day pair, end to end
