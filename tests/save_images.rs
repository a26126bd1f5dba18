use batchsave_lib::error::SaveError;
use batchsave_lib::{BatchImageSaver, ImageTensor};
use chrono::NaiveDateTime;
use serde_json::json;

fn gradient(height: u32, width: u32, channels: usize) -> ImageTensor {
    let len = height as usize * width as usize * channels;
    let data = (0..len).map(|i| (i % 256) as f32 / 255.0).collect();
    ImageTensor::new(height, width, channels, data).unwrap()
}

#[test]
fn single_image_uses_base_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());

    let out = saver
        .save(&[gradient(4, 4, 3)], "X", "", "png", None, None)
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].filename, "X.png");
    assert_eq!(out[0].subfolder, "");
    assert_eq!(out[0].kind, "output");
    assert!(dir.path().join("X.png").is_file());
}

#[test]
fn batch_gets_indexed_names_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());
    let batch = vec![gradient(2, 2, 3), gradient(2, 2, 3), gradient(2, 2, 3)];

    let out = saver.save(&batch, "X", "", "png", None, None).unwrap();

    let names: Vec<_> = out.iter().map(|d| d.filename.as_str()).collect();
    assert_eq!(names, ["X_01.png", "X_02.png", "X_03.png"]);
    for name in names {
        assert!(dir.path().join(name).is_file());
    }
}

#[test]
fn counter_increments_per_save() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());

    for expected in ["1", "2", "3"] {
        let out = saver
            .save(&[gradient(2, 2, 3)], "%counter", "", "png", None, None)
            .unwrap();
        assert_eq!(out[0].filename, format!("{expected}.png"));
    }
    assert_eq!(saver.counter(), 3);
}

#[test]
fn model_and_seed_from_metadata_as_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());
    let extra = json!({"workflow": {"nodes": [{"widgets": {"model": "sdxl", "seed": 12345}}]}});

    let out = saver
        .save(&[gradient(8, 8, 3)], "%model_%seed", "", "JPEG", None, Some(&extra))
        .unwrap();

    assert_eq!(out[0].filename, "sdxl_12345.jpeg");
    let decoded = image::open(dir.path().join("sdxl_12345.jpeg")).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (8, 8));
}

#[test]
fn missing_metadata_becomes_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());

    let out = saver
        .save(&[gradient(2, 2, 3)], "%model-%seed", "", "png", None, None)
        .unwrap();

    assert_eq!(out[0].filename, "unknown-unknown.png");
}

#[test]
fn prompt_used_when_extra_has_no_match() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());
    let prompt = json!({"4": {"class_type": "CheckpointLoader", "inputs": {"ckpt_name": "flux dev"}}});
    let extra = json!({"workflow": {"version": 1}});

    let out = saver
        .save(&[gradient(2, 2, 3)], "%model", "", "png", Some(&prompt), Some(&extra))
        .unwrap();

    assert_eq!(out[0].filename, "flux dev.png");
}

#[test]
fn empty_templates_give_timestamp_without_subfolder() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());

    let out = saver
        .save(&[gradient(2, 2, 3)], "", "", "png", None, None)
        .unwrap();

    let stem = out[0].filename.strip_suffix(".png").unwrap();
    assert!(NaiveDateTime::parse_from_str(stem, "%Y-%m-%d-%H%M%S").is_ok());
    assert_eq!(out[0].subfolder, "");
    assert!(dir.path().join(&out[0].filename).is_file());
}

#[test]
fn path_template_creates_nested_subfolder() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());
    let extra = json!({"seed": 9});

    let out = saver
        .save(&[gradient(2, 2, 3)], "img", "runs/%seed/", "png", None, Some(&extra))
        .unwrap();

    assert_eq!(out[0].subfolder, "runs/9");
    assert!(dir.path().join("runs/9/img.png").is_file());

    // pasta já existente não é erro
    let again = saver
        .save(&[gradient(2, 2, 3)], "img2", "runs/%seed", "png", None, Some(&extra))
        .unwrap();
    assert_eq!(again[0].subfolder, "runs/9");
}

#[test]
fn whitespace_path_means_no_subfolder() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());

    let out = saver
        .save(&[gradient(2, 2, 3)], "a", "   ", "png", None, None)
        .unwrap();

    assert_eq!(out[0].subfolder, "");
    assert!(dir.path().join("a.png").is_file());
}

#[test]
fn png_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());
    let data = vec![0.0, 0.25, 0.5, 1.0, 1.5, -0.2, 0.999, 0.004, 0.75, 0.1, 0.2, 0.3];
    let tensor = ImageTensor::new(2, 2, 3, data.clone()).unwrap();

    saver.save(&[tensor], "rt", "", "png", None, None).unwrap();

    let decoded = image::open(dir.path().join("rt.png")).unwrap().to_rgb8();
    let expected: Vec<u8> = data
        .iter()
        .map(|&v| batchsave_lib::encoder::quantize(v))
        .collect();
    assert_eq!(decoded.into_raw(), expected);
}

#[test]
fn webp_round_trip_within_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());
    let data = vec![0.5; 16 * 16 * 3];
    let tensor = ImageTensor::new(16, 16, 3, data).unwrap();

    saver.save(&[tensor], "flat", "", "webp", None, None).unwrap();

    let decoded = image::open(dir.path().join("flat.webp")).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (16, 16));
    for px in decoded.pixels() {
        for &c in &px.0 {
            assert!((i16::from(c) - 127).abs() <= 4, "canal fora da tolerância: {c}");
        }
    }
}

#[test]
fn jpeg_round_trip_within_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());
    let data = vec![0.5; 16 * 16 * 3];
    let tensor = ImageTensor::new(16, 16, 3, data).unwrap();

    saver.save(&[tensor], "flat", "", "jpeg", None, None).unwrap();

    let decoded = image::open(dir.path().join("flat.jpeg")).unwrap().to_rgb8();
    for px in decoded.pixels() {
        for &c in &px.0 {
            assert!((i16::from(c) - 127).abs() <= 3, "canal fora da tolerância: {c}");
        }
    }
}

#[test]
fn unsupported_extension_fails_the_save() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());

    let err = saver
        .save(&[gradient(2, 2, 3)], "x", "", "nope", None, None)
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SaveError>(),
        Some(SaveError::UnsupportedFormat(_))
    ));
    assert!(!dir.path().join("x.nope").exists());
}

#[test]
fn unsupported_extension_leaves_no_subfolder() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());
    let extra = json!({"seed": 3});

    let err = saver
        .save(&[gradient(2, 2, 3)], "x", "novo/%seed", "nope", None, Some(&extra))
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SaveError>(),
        Some(SaveError::UnsupportedFormat(_))
    ));
    assert!(!dir.path().join("novo").exists());
}

#[test]
fn failed_image_keeps_earlier_files_and_stops_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut saver = BatchImageSaver::new(dir.path());
    // diretório com o nome do segundo arquivo impede a gravação
    std::fs::create_dir(dir.path().join("X_02.png")).unwrap();
    let batch = vec![gradient(2, 2, 3), gradient(2, 2, 3), gradient(2, 2, 3)];

    let result = saver.save(&batch, "X", "", "png", None, None);

    assert!(result.is_err());
    assert!(dir.path().join("X_01.png").is_file());
    assert!(!dir.path().join("X_03.png").exists());
}
