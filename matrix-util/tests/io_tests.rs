use matrix_util::common_io::*;
use matrix_util::mtx_io::*;

#[test]
fn lines_round_trip_gz() -> anyhow::Result<()> {
    let file = create_temp_dir_file("txt.gz")?;
    let file = file.to_str().unwrap();

    let lines: Vec<Box<str>> = vec!["a\t1".into(), "b\t2".into(), "c\t3".into()];
    write_lines(&lines, file)?;

    let words = read_lines_of_words_delim(file, "\t", -1)?.lines;
    assert_eq!(words.len(), 3);
    assert_eq!(&*words[1][0], "b");
    assert_eq!(&*words[2][1], "3");
    Ok(())
}

#[test]
fn header_and_types() -> anyhow::Result<()> {
    let file = create_temp_dir_file("tsv")?;
    let file = file.to_str().unwrap();

    let lines: Vec<Box<str>> = vec![
        "# comment".into(),
        "x\ty".into(),
        "1.5\t2".into(),
        "".into(),
        "3\t4.25".into(),
    ];
    write_lines(&lines, file)?;

    let out = read_lines_of_types::<f32>(file, "\t", 0)?;
    assert_eq!(out.header, vec![Box::<str>::from("x"), Box::from("y")]);
    assert_eq!(out.lines, vec![vec![1.5, 2.0], vec![3.0, 4.25]]);
    Ok(())
}

#[test]
fn bad_number_is_an_error() -> anyhow::Result<()> {
    let file = create_temp_dir_file("tsv")?;
    let file = file.to_str().unwrap();
    write_lines(&vec![Box::<str>::from("1\tfoo")], file)?;
    assert!(read_lines_of_types::<f32>(file, "\t", -1).is_err());
    Ok(())
}

#[test]
fn file_names() -> anyhow::Result<()> {
    assert_eq!(&*file_ext("data/matrix.mtx.gz")?, "mtx");
    assert_eq!(&*file_ext("data/x.LOOM")?, "loom");
    assert_eq!(&*basename("data/matrix.mtx.gz")?, "matrix");
    assert_eq!(&*basename("x.txt")?, "x");
    assert!(file_ext("noext").is_err());
    Ok(())
}

#[test]
fn mtx_round_trip() -> anyhow::Result<()> {
    let file = create_temp_dir_file("mtx.gz")?;
    let file = file.to_str().unwrap();

    let triplets = vec![(0_u64, 0_u64, 1.0_f32), (2, 0, 3.0), (1, 1, 2.5)];
    write_mtx_triplets(&triplets, 3, 2, file)?;

    let (read, (nrow, ncol, nnz)) = read_mtx_triplets(file)?;
    assert_eq!((nrow, ncol, nnz), (3, 2, 3));
    assert_eq!(read, triplets);
    Ok(())
}

#[test]
fn mtx_out_of_range() -> anyhow::Result<()> {
    let file = create_temp_dir_file("mtx")?;
    let file = file.to_str().unwrap();
    write_lines(
        &vec![
            Box::<str>::from("%%MatrixMarket matrix coordinate real general"),
            Box::<str>::from("2 2 1"),
            Box::<str>::from("3 1 1.0"),
        ],
        file,
    )?;
    assert!(read_mtx_triplets(file).is_err());
    Ok(())
}
