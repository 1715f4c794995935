use approx::assert_abs_diff_eq;
use wot_alg::gene_set_scores::*;
use wot_alg::growth::*;
use wot_data::gene_sets::*;
use wot_data::mat_with_names::*;

fn names(xs: &[&str]) -> Vec<Box<str>> {
    xs.iter().map(|&x| Box::from(x)).collect()
}

fn toy_data() -> anyhow::Result<ExpressionData> {
    // genes: a, b, constant c, unrelated d
    let mat = Mat::from_row_slice(4, 4, &[
        1., 0., 3., 9., //
        2., 2., 3., 9., //
        3., 4., 3., 9., //
        4., 6., 3., 9.,
    ]);
    MatWithNames::new(names(&["c0", "c1", "c2", "c3"]), names(&["A", "b", "C", "d"]), mat)
}

fn sets() -> GeneSets {
    GeneSets {
        sets: vec![
            GeneSet::new("ab", "", names(&["a", "B"])),
            GeneSet::new("const", "", names(&["c"])),
            GeneSet::new("missing", "", names(&["zz"])),
        ],
    }
}

#[test]
fn mean_z_score() -> anyhow::Result<()> {
    let scores = score_gene_sets(&toy_data()?, &sets(), ScoreMethod::MeanZScore, 5.0)?;

    assert_eq!(scores.cols, names(&["ab", "const"]));
    assert_eq!(scores.rows, names(&["c0", "c1", "c2", "c3"]));

    // a and b are both linear in the row, so their z-scores agree
    let sd = (1.25_f32).sqrt();
    assert_abs_diff_eq!(scores.mat[(0, 0)], -1.5 / sd, epsilon = 1e-5);
    assert_abs_diff_eq!(scores.mat[(3, 0)], 1.5 / sd, epsilon = 1e-5);
    assert_abs_diff_eq!(scores.mat.column(0).sum(), 0.0, epsilon = 1e-5);

    // zero variance scores 0
    assert!(scores.mat.column(1).iter().all(|&x| x == 0.0));
    Ok(())
}

#[test]
fn clipped_z_score() -> anyhow::Result<()> {
    let scores = score_gene_sets(&toy_data()?, &sets(), ScoreMethod::MeanZScore, 1.0)?;
    assert!(scores.mat.column(0).iter().all(|x| x.abs() <= 1.0));
    Ok(())
}

#[test]
fn mean_expression() -> anyhow::Result<()> {
    let scores = score_gene_sets(&toy_data()?, &sets(), ScoreMethod::Mean, 5.0)?;
    assert_abs_diff_eq!(scores.mat[(1, 0)], 2.0);
    assert_abs_diff_eq!(scores.mat[(3, 0)], 5.0);
    assert_abs_diff_eq!(scores.mat[(2, 1)], 3.0);
    Ok(())
}

#[test]
fn no_matching_set_is_an_error() -> anyhow::Result<()> {
    let sets = GeneSets {
        sets: vec![GeneSet::new("x", "", names(&["zz"]))],
    };
    assert!(score_gene_sets(&toy_data()?, &sets, ScoreMethod::Mean, 5.0).is_err());
    Ok(())
}

#[test]
fn logistic_shape() {
    let params = GrowthParams::default();
    let mut prev = 0.0;
    for k in 0..100 {
        let p = -2.0 + 0.05 * k as f64;
        let b = params.beta(p);
        assert!(b >= params.beta_min && b <= params.beta_max);
        assert!(b >= prev);
        prev = b;
    }
    assert_abs_diff_eq!(logistic(0.0, 2.0, 1.0, 0.0), 1.0);
    assert_abs_diff_eq!(gen_logistic(0.25, 1.7, 0.3, 0.25, 0.5), 1.0, epsilon = 1e-12);
}

#[test]
fn growth_rates() -> anyhow::Result<()> {
    let params = GrowthParams::default();
    let scores = MatWithNames::new(
        names(&["x", "y"]),
        names(&["apoptosis", "Cell.cycle"]),
        Mat::from_row_slice(2, 2, &[0.1, 0.25, 2.0, -2.0]),
    )?;

    let g = growth_from_scores(&scores, &names(&["y", "x"]), &params)?;
    assert_abs_diff_eq!(g[1], 1.0, epsilon = 1e-6);
    assert!(g[0] < 1.0);
    assert_abs_diff_eq!(g[0], (params.beta(-2.0) - params.delta(2.0)).exp(), epsilon = 1e-6);

    assert!(growth_from_scores(&scores, &names(&["z"]), &params).is_err());

    let no_apoptosis = scores.select_columns(&[1]);
    assert!(growth_from_scores(&no_apoptosis, &names(&["x"]), &params).is_err());

    assert_eq!(unit_growth(3), vec![1.0; 3]);
    Ok(())
}

#[test]
fn growth_from_cell_table() -> anyhow::Result<()> {
    let pairs = vec![(Box::<str>::from("a"), 2.0), (Box::from("b"), 0.5)];
    assert_eq!(growth_from_pairs(&pairs, &names(&["b", "a"]))?, vec![0.5, 2.0]);
    assert!(growth_from_pairs(&pairs, &names(&["c"])).is_err());

    let bad = vec![(Box::<str>::from("a"), -1.0)];
    assert!(growth_from_pairs(&bad, &names(&["a"])).is_err());
    Ok(())
}
