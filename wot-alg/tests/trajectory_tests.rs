use approx::assert_abs_diff_eq;
use fnv::FnvHashMap as HashMap;
use matrix_util::common_io::*;
use rand::SeedableRng;
use wot_alg::trajectory::*;
use wot_data::dataset_io::*;
use wot_data::gene_sets::*;
use wot_data::mat_with_names::*;

fn names(xs: &[&str]) -> Vec<Box<str>> {
    xs.iter().map(|&x| Box::from(x)).collect()
}

/// day 0 -> 1 keeps cells apart; day 1 -> 2 splits a1 into a2 and b2
fn toy_maps() -> anyhow::Result<(Vec<MapFile>, HashMap<Box<str>, ExpressionData>)> {
    let m01 = MatWithNames::new(
        names(&["a0", "b0"]),
        names(&["a1", "b1"]),
        Mat::from_row_slice(2, 2, &[1., 0., 0., 1.]),
    )?;
    let m12 = MatWithNames::new(
        names(&["a1", "b1"]),
        names(&["a2", "b2", "c2"]),
        Mat::from_row_slice(2, 3, &[1., 1., 0., 0., 0., 1.]),
    )?;
    let files = vec![
        MapFile {
            path: "m_0_1.txt".into(),
            t0: 0.0,
            t1: 1.0,
        },
        MapFile {
            path: "m_1_2.txt".into(),
            t0: 1.0,
            t1: 2.0,
        },
    ];
    let mut data = HashMap::default();
    data.insert(Box::from("m_0_1.txt"), m01);
    data.insert(Box::from("m_1_2.txt"), m12);
    Ok((files, data))
}

fn run(time: f64, sets: &GeneSets) -> anyhow::Result<Vec<TrajectoryStep>> {
    let (files, data) = toy_maps()?;
    let mut load = |m: &MapFile| {
        data.get(&m.path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no map {}", m.path))
    };
    compute_trajectories_with(&files, time, sets, &mut load)
}

fn cell_sets(sets: &[(&str, &[&str])]) -> GeneSets {
    GeneSets {
        sets: sets
            .iter()
            .map(|(name, cells)| GeneSet::new(name, "", names(cells)))
            .collect(),
    }
}

#[test]
fn map_names() {
    assert_eq!(parse_map_name("dir/tmaps_0_1.5.loom"), Some((0.0, 1.5)));
    assert_eq!(parse_map_name("tmaps_serum_2_3.txt.gz"), Some((2.0, 3.0)));
    assert_eq!(parse_map_name("tmaps_2_1.loom"), None);
    assert_eq!(parse_map_name("tmaps_0_1.csv"), None);
    assert_eq!(parse_map_name("0_1.loom"), None);
}

#[test]
fn list_maps_in_directory() -> anyhow::Result<()> {
    let file = create_temp_dir_file("txt")?;
    let dir = file.parent().unwrap().to_str().unwrap().to_string();

    let (_, data) = toy_maps()?;
    write_dataset(&data[&Box::<str>::from("m_1_2.txt")], &[], &format!("{}/tm_1_2", dir), OutputFormat::Txt)?;
    write_dataset(&data[&Box::<str>::from("m_0_1.txt")], &[], &format!("{}/tm_0_1", dir), OutputFormat::Txt)?;
    write_lines(&names(&["not a map"]), &format!("{}/notes.txt", dir))?;

    let maps = list_transport_maps(&dir)?;
    assert_eq!(maps.len(), 2);
    assert_eq!((maps[0].t0, maps[0].t1), (0.0, 1.0));
    assert_eq!((maps[1].t0, maps[1].t1), (1.0, 2.0));

    let steps = compute_trajectories(&maps, 2.0, &cell_sets(&[("s", &["a2"])]))?;
    assert_eq!(steps.len(), 3);
    Ok(())
}

#[test]
fn ancestors() -> anyhow::Result<()> {
    let steps = run(2.0, &cell_sets(&[("s", &["a2", "b2"]), ("empty", &["zz"])]))?;

    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|s| s.direction == Direction::Backward));
    assert!(steps.iter().all(|s| &*s.set == "s"));

    let times: Vec<f64> = steps.iter().map(|s| s.time).collect();
    assert_eq!(times, vec![2.0, 1.0, 0.0]);

    assert_abs_diff_eq!(steps[0].dist.entropy(), 2.0, epsilon = 1e-9);
    assert_eq!(steps[1].dist.probs, vec![1.0, 0.0]);
    assert_eq!(steps[2].dist.cells, names(&["a0", "b0"]));
    assert_eq!(steps[2].dist.probs, vec![1.0, 0.0]);
    assert_abs_diff_eq!(steps[2].dist.entropy(), 1.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn descendants() -> anyhow::Result<()> {
    let steps = run(0.0, &cell_sets(&[("s", &["a0"])]))?;
    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|s| s.direction == Direction::Forward));

    let last = &steps[2];
    assert_abs_diff_eq!(last.time, 2.0);
    assert_eq!(last.dist.cells, names(&["a2", "b2", "c2"]));
    assert_abs_diff_eq!(last.dist.probs[0], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(last.dist.probs[2], 0.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn both_directions_from_the_middle() -> anyhow::Result<()> {
    let steps = run(1.0, &cell_sets(&[("s", &["a1", "b1"])]))?;
    assert_eq!(steps.len(), 4);
    for step in steps.iter() {
        assert_abs_diff_eq!(step.dist.probs.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        let e = step.dist.entropy();
        assert!(e >= 1.0 - 1e-12 && e <= step.dist.cells.len() as f64 + 1e-12);
    }
    let forward = steps.iter().find(|s| s.direction == Direction::Forward && s.time == 2.0);
    assert!(forward.is_some());
    Ok(())
}

#[test]
fn missing_time_or_sets() {
    assert!(run(5.0, &cell_sets(&[("s", &["a0"])])).is_err());
    assert!(run(2.0, &cell_sets(&[("s", &["nobody"])])).is_err());
}

#[test]
fn summaries() -> anyhow::Result<()> {
    let steps = run(2.0, &cell_sets(&[("s", &["a2", "b2"])]))?;
    let features = MatWithNames::new(
        names(&["a2", "b2", "a0"]),
        names(&["GeneX", "Apoptosis"]),
        Mat::from_row_slice(3, 2, &[1., 0.5, 3., 0.5, 7., 0.1]),
    )?;

    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let (summary, traces) = summarize_step(&steps[0], &features, &mut rng)?;
    assert_eq!(summary.n_sampled, 2);
    assert_abs_diff_eq!(summary.means[0], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(summary.means[1], 0.5, epsilon = 1e-6);
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0].values.len(), 2);
    assert!(traces[0].values.iter().all(|&v| v == 1.0 || v == 3.0));

    // day 1 cells have no feature values
    let (summary, traces) = summarize_step(&steps[1], &features, &mut rng)?;
    assert!(summary.means[0].is_nan());
    assert!(traces[0].values.is_empty());

    let json = serde_json::to_string(&traces)?;
    assert!(json.contains("\"direction\":\"backward\""));
    Ok(())
}

#[test]
fn reindex_drops_unknown_cells() -> anyhow::Result<()> {
    let dist = CellDistribution::new(names(&["a", "b"]), vec![3.0, 1.0])?;
    assert_abs_diff_eq!(dist.probs[0], 0.75);

    let moved = dist.reindex(&names(&["b", "c"]))?;
    assert_eq!(moved.probs, vec![1.0, 0.0]);
    assert!(dist.reindex(&names(&["c"])).is_err());
    Ok(())
}
