use approx::assert_abs_diff_eq;
use wot_alg::cost::*;
use wot_alg::local_pca::*;
use matrix_util::common_io::*;
use wot_alg::sinkhorn::*;
use wot_alg::trajectory::parse_map_name;
use wot_alg::transport_map::*;
use wot_data::cell_days::CellDays;
use wot_data::dataset_io::*;
use wot_data::mat_with_names::*;

/// five cells on a line, one unit apart
fn line_cells() -> Mat {
    Mat::from_fn(5, 2, |i, j| if j == 0 { i as f32 } else { 0.0 })
}

#[test]
fn cost_is_scaled_by_median() -> anyhow::Result<()> {
    let x = line_cells();
    let cost = cost_matrix(&x, &x)?;
    assert_eq!(cost.shape(), (5, 5));
    // squared distances 0, 1, 4, 9, 16 with median 1
    assert_abs_diff_eq!(cost[(0, 1)], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(cost[(0, 4)], 16.0, epsilon = 1e-9);
    assert_abs_diff_eq!(cost[(2, 2)], 0.0, epsilon = 1e-9);

    let same = Mat::from_element(3, 2, 1.0);
    let zero = cost_matrix(&same, &same)?;
    assert!(zero.iter().all(|&c| c == 0.0));

    assert!(cost_matrix(&Mat::zeros(0, 2), &x).is_err());
    assert!(cost_matrix(&Mat::zeros(2, 3), &x).is_err());
    Ok(())
}

#[test]
fn local_pca_width_and_centring() -> anyhow::Result<()> {
    let x0 = Mat::from_fn(6, 20, |i, j| ((i * 7 + j * 3) % 11) as f32);
    let x1 = Mat::from_fn(4, 20, |i, j| ((i * 5 + j * 2) % 13) as f32 + 1.0);

    let (p0, p1) = local_pca(&x0, &x1, 3)?;
    assert_eq!(p0.shape(), (6, 3));
    assert_eq!(p1.shape(), (4, 3));

    for k in 0..3 {
        let total = p0.column(k).sum() + p1.column(k).sum();
        assert_abs_diff_eq!(total, 0.0, epsilon = 1e-3);
    }

    // more components than the rank allows
    let (q0, q1) = local_pca(&x0, &x1, 50)?;
    assert_eq!(q0.ncols(), 10);
    assert_eq!(q1.ncols(), 10);

    let (r0, _) = local_pca(&x0, &x1, 0)?;
    assert_eq!(r0, x0);

    assert!(local_pca(&x0, &Mat::zeros(2, 5), 3).is_err());
    Ok(())
}

#[test]
fn projection_keeps_distances() -> anyhow::Result<()> {
    let x0 = Mat::from_fn(5, 8, |i, j| ((i + 2 * j) % 5) as f32);
    let x1 = Mat::from_fn(5, 8, |i, j| ((3 * i + j) % 7) as f32);
    let (p0, p1) = local_pca(&x0, &x1, 10)?;

    // full-rank projection is a rotation of the centred cloud
    let d_orig = (x0.row(0) - x1.row(2)).norm_squared();
    let d_proj = (p0.row(0) - p1.row(2)).norm_squared();
    assert_abs_diff_eq!(d_orig, d_proj, epsilon = 1e-2);
    Ok(())
}

#[test]
fn epsilon_schedule_ends_at_target() {
    let schedule = epsilon_schedule(1.0, 0.05);
    assert_abs_diff_eq!(schedule[0], 1.0);
    assert_eq!(*schedule.last().unwrap(), 0.05);
    assert!(schedule.windows(2).all(|w| w[0] > w[1]));

    assert_eq!(epsilon_schedule(0.01, 0.05), vec![0.05]);
}

#[test]
fn sinkhorn_identical_clouds() -> anyhow::Result<()> {
    let x = line_cells();
    let cost = cost_matrix(&x, &x)?;

    let params = SinkhornParams {
        lambda1: 50.0,
        lambda2: 50.0,
        ..Default::default()
    };
    let plan = solve_unbalanced(&cost, &[1.0; 5], &params)?;

    assert!(plan.iter().all(|x| x.is_finite() && *x >= 0.0));

    for i in 0..5 {
        for j in 0..5 {
            if i != j {
                assert!(plan[(i, i)] > 10.0 * plan[(i, j)]);
            }
        }
    }

    // row mass under the target measure approaches the source mass
    for g in learned_growth(&plan) {
        assert_abs_diff_eq!(g, 1.0, epsilon = 0.01);
    }
    Ok(())
}

#[test]
fn sinkhorn_rejects_bad_input() -> anyhow::Result<()> {
    let x = line_cells();
    let cost = cost_matrix(&x, &x)?;
    let params = SinkhornParams::default();

    assert!(solve_unbalanced(&cost, &[1.0; 3], &params).is_err());
    assert!(solve_unbalanced(&cost, &[1.0, 1.0, 0.0, 1.0, 1.0], &params).is_err());

    let mut nan_cost = cost.clone();
    nan_cost[(0, 0)] = f64::NAN;
    assert!(solve_unbalanced(&nan_cost, &[1.0; 5], &params).is_err());

    let bad = SinkhornParams {
        epsilon: 0.0,
        ..Default::default()
    };
    assert!(solve_unbalanced(&cost, &[1.0; 5], &bad).is_err());
    Ok(())
}

#[test]
fn growth_shifts_row_mass() -> anyhow::Result<()> {
    let x = line_cells();
    let cost = cost_matrix(&x, &x)?;

    let growth = vec![2.0, 1.0, 1.0, 1.0, 0.5];
    let params = SinkhornParams {
        lambda2: 1.0,
        growth_iters: 2,
        ..Default::default()
    };
    let out = compute_transport_map(&cost, &growth, 1.0, &params)?;

    assert_eq!(out.growth.len(), 3);
    assert_eq!(out.growth[0], growth);
    assert_eq!(out.plan.shape(), (5, 5));

    let rows: Vec<f64> = out.plan.row_iter().map(|r| r.sum()).collect();
    assert!(rows[0] > rows[2]);
    assert!(rows[2] > rows[4]);

    assert!(compute_transport_map(&cost, &growth, 0.0, &params).is_err());
    Ok(())
}

fn names(xs: &[&str]) -> Vec<Box<str>> {
    xs.iter().map(|&x| Box::from(x)).collect()
}

/// two cells on day 0, two on day 1, and `e` without a day
fn two_day_data() -> anyhow::Result<(ExpressionData, CellDays)> {
    let data = MatWithNames::new(
        names(&["a", "c", "e", "b", "d"]),
        names(&["g1", "g2"]),
        Mat::from_row_slice(5, 2, &[0., 0., 0., 1., 5., 5., 1., 0., 1., 1.]),
    )?;
    let days = CellDays::from_pairs(vec![
        ("a".into(), 0.0),
        ("b".into(), 0.0),
        ("c".into(), 1.0),
        ("d".into(), 1.0),
    ])?;
    Ok((data, days))
}

#[test]
fn day_pair_map_ids_and_growth() -> anyhow::Result<()> {
    let (data, days) = two_day_data()?;

    let kept = cells_with_day(&data, &days);
    assert_eq!(kept.rows, names(&["a", "c", "b", "d"]));

    let params = SinkhornParams {
        growth_iters: 2,
        ..Default::default()
    };
    let growth = vec![1.0; kept.nrows()];
    let tmap = compute_pair_map(&kept, &days, &growth, (0.0, 1.0), 0, &params)?;

    assert_eq!(tmap.map.rows, names(&["a", "b"]));
    assert_eq!(tmap.map.cols, names(&["c", "d"]));
    assert!(tmap.map.mat.iter().all(|&x| x.is_finite() && x >= 0.0));

    let attr_names: Vec<&str> = tmap.growth.iter().map(|(k, _)| k.as_ref()).collect();
    assert_eq!(attr_names, vec!["g0", "g1", "g2"]);
    assert!(tmap.growth.iter().all(|(_, g)| g.len() == 2));
    assert_eq!(tmap.growth[0].1, vec![1.0, 1.0]);

    let table = tmap.growth_table()?;
    assert_eq!(table.rows, names(&["a", "b"]));
    assert_eq!(table.cols, names(&["g0", "g1", "g2"]));
    Ok(())
}

#[test]
fn day_pair_map_errors() -> anyhow::Result<()> {
    let (data, days) = two_day_data()?;
    let kept = cells_with_day(&data, &days);
    let params = SinkhornParams::default();
    let growth = vec![1.0; kept.nrows()];

    // no cell on day 5
    assert!(compute_pair_map(&kept, &days, &growth, (0.0, 5.0), 0, &params).is_err());
    // growth not aligned with the cells
    assert!(compute_pair_map(&kept, &days, &growth[..2], (0.0, 1.0), 0, &params).is_err());
    Ok(())
}

#[test]
fn write_day_pair_maps() -> anyhow::Result<()> {
    let (data, days) = two_day_data()?;
    let kept = cells_with_day(&data, &days);
    let growth = vec![1.0; kept.nrows()];
    let tmap = compute_pair_map(
        &kept,
        &days,
        &growth,
        (0.0, 1.0),
        0,
        &SinkhornParams::default(),
    )?;

    let file = create_temp_dir_file("txt")?;
    let dir = file.parent().unwrap().to_str().unwrap().to_string();
    let out = format!("{}/tmaps", dir);

    // text map with a growth table next to it
    let txt = tmap.write(&out, OutputFormat::Txt)?;
    assert_eq!(&*txt, format!("{}/tmaps_0_1.txt", dir));
    assert_eq!(parse_map_name(&txt), Some((0.0, 1.0)));

    let back = read_dataset(&txt)?;
    assert_eq!(back.rows, names(&["a", "b"]));
    assert_eq!(back.cols, names(&["c", "d"]));

    let sidecar = read_dataset(&format!("{}/tmaps_0_1_growth.txt", dir))?;
    assert_eq!(sidecar.rows, names(&["a", "b"]));
    assert_eq!(sidecar.cols, names(&["g0", "g1"]));
    assert_eq!(parse_map_name(&format!("{}/tmaps_0_1_growth.txt", dir)), None);

    // loom map carries the growth as row attributes
    let loom = tmap.write(&out, OutputFormat::Loom)?;
    let (back, attrs) = read_dataset_with_attrs(&loom)?;
    assert_eq!(back.rows, names(&["a", "b"]));
    let mut attr_names: Vec<&str> = attrs.iter().map(|(k, _)| k.as_ref()).collect();
    attr_names.sort();
    assert_eq!(attr_names, vec!["g0", "g1"]);
    Ok(())
}
