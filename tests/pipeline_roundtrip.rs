use image::{Rgb, RgbImage};
use pulse_lib::core::batch::{
    append_csv_row, read_json_records, write_json_records, BatchItem, BatchProcessor,
};
use pulse_lib::core::inference::{store_upload, InferenceCommand, InferenceError};
use pulse_lib::{FrameSequence, PulseConfig, PulseMethod};
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_clip(dir: &Path, len: usize, fps: f64) {
    fs::create_dir_all(dir).unwrap();
    for n in 0..len {
        let t = n as f64 / fps;
        let s = (2.0 * PI * 1.2 * t).sin() + 0.5 * (2.0 * PI * 2.4 * t).sin();
        let pixel = Rgb([
            (150.0 + 15.0 * s).round() as u8,
            (128.0 + 20.0 * s).round() as u8,
            (100.0 + 5.0 * s).round() as u8,
        ]);
        RgbImage::from_pixel(2, 2, pixel)
            .save(dir.join(format!("frame_{n:05}.png")))
            .unwrap();
    }
    // ignored by the loader
    fs::write(dir.join("notes.txt"), "roi dump").unwrap();
}

#[test]
fn frame_directory_through_both_methods() {
    let tmp = tempdir().unwrap();
    let clip_dir = tmp.path().join("clip");
    write_clip(&clip_dir, 320, 30.0);

    let frames = FrameSequence::from_path(&clip_dir, 30.0).unwrap();
    assert_eq!(frames.len(), 320);
    assert_eq!(frames.frames()[5].frame_number, 5);

    let config = PulseConfig::default();
    let green = PulseMethod::Green.compute(&frames, &config).unwrap();
    let chrom = PulseMethod::Chrom.compute(&frames, &config).unwrap();
    assert_eq!(green.len(), 320);
    // win 48, half 24, (320 - 24) / 24 = 12 windows
    assert_eq!(chrom.len(), 24 * 13);

    let csv = tmp.path().join("signals.csv");
    append_csv_row(&csv, &green).unwrap();
    append_csv_row(&csv, &chrom).unwrap();
    let contents = fs::read_to_string(&csv).unwrap();
    let rows: Vec<&str> = contents.lines().collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].split(',').count(), 320);
    assert_eq!(rows[1].split(',').count(), 312);
}

#[test]
fn batch_records_round_trip_through_json() {
    let tmp = tempdir().unwrap();
    let mut items = Vec::new();
    for (label, len) in [(0, 150), (1, 200)] {
        let dir = tmp.path().join(format!("clip_{label}"));
        write_clip(&dir, len, 30.0);
        items.push(BatchItem {
            label,
            frames: FrameSequence::from_path(&dir, 30.0).unwrap(),
        });
    }

    let processor = BatchProcessor::with_threads(PulseMethod::Chrom, PulseConfig::default(), 2).unwrap();
    let outcome = processor.process_batch(&items);
    assert!(outcome.failures.is_empty());

    let out = tmp.path().join("out/pulse_records.json");
    write_json_records(&out, &outcome.records).unwrap();
    let restored = read_json_records(&out).unwrap();

    assert_eq!(restored.len(), 2);
    assert_eq!(restored[0].label, 0);
    assert_eq!(restored[1].label, 1);
    for (restored, original) in restored.iter().zip(&outcome.records) {
        assert_eq!(restored.signal.len(), original.signal.len());
        for (a, b) in restored.signal.iter().zip(&original.signal) {
            assert!((a - b).abs() <= 1e-12 * b.abs().max(1.0));
        }
    }
}

#[test]
fn missing_frame_directory_is_io_error() {
    let tmp = tempdir().unwrap();
    let err = FrameSequence::from_path(tmp.path().join("absent"), 30.0).unwrap_err();
    assert!(matches!(err, pulse_lib::PulseError::Io(_)));
}

#[test]
fn upload_is_stored_under_its_file_name() {
    let tmp = tempdir().unwrap();
    let path = store_upload(tmp.path().join("uploaded_videos"), "../../evil/clip.mp4", &b"fake-mp4"[..]).unwrap();

    assert_eq!(path, tmp.path().join("uploaded_videos").join("clip.mp4"));
    assert_eq!(fs::read(&path).unwrap(), b"fake-mp4");

    assert!(matches!(
        store_upload(tmp.path(), "..", &b""[..]),
        Err(InferenceError::InvalidFileName(_))
    ));
}

#[cfg(unix)]
#[test]
fn inference_process_output_is_parsed() {
    let command = InferenceCommand::new("sh", "config.yaml")
        .arg("-c")
        .arg("echo 'cropped_mouth_video_path: /tmp/mouth.mp4'; echo 'Final Prediction: 0.42 (real)'")
        .arg("inference");

    let outcome = command.run(Path::new("clip.mp4")).unwrap();
    assert_eq!(outcome.cropped_video_path, Path::new("/tmp/mouth.mp4"));
    assert!((outcome.score - 0.42).abs() < 1e-12);
}

#[cfg(unix)]
#[test]
fn inference_process_failure_carries_stderr() {
    let command = InferenceCommand::new("sh", "config.yaml")
        .arg("-c")
        .arg("echo 'model missing' >&2; exit 3")
        .arg("inference");

    match command.run(Path::new("clip.mp4")) {
        Err(InferenceError::ProcessFailed { stderr, .. }) => assert!(stderr.contains("model missing")),
        other => panic!("unexpected result: {other:?}"),
    }
}
