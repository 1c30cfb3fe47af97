//! # Container Creation Tests
//!
//! These tests build containers from JSON descriptors and loose asset files
//! and verify the rows that land in the SQLite file.
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test create_test
//! ```

use sqlx::Row;
use std::f32::consts::PI;
use std::fs;
use std::path::Path;
use tokio::runtime::Runtime;

use ptimer::config::CreateOptions;
use ptimer::{create_container, Descriptor, PtimerError};

/// Write a short mono sine wave, like the sample file generator does
fn write_sine_wav(path: &Path, frequency: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..800 {
        let t = i as f32 / spec.sample_rate as f32;
        let y = (t * frequency * 2.0 * PI).sin() * i16::MAX as f32 * 0.8;
        writer.write_sample(y as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Descriptor with two steps (listed out of playback order) and one sound
fn sample_descriptor(asset_path: &str) -> Descriptor {
    let json = format!(
        r#"{{
            "version": "1",
            "metadata": {{"title": "Sample timer", "description": "This is a sample file for testing purpose.", "lang": "en-US"}},
            "steps": [
                {{"id": 2, "title": "Step 2", "description": "Timer step with sound", "sound": 1, "duration_seconds": 2, "index": 20}},
                {{"id": 1, "title": "Step 1", "description": "Manual step", "sound": null, "duration_seconds": null, "index": 10}}
            ],
            "assets": [
                {{"id": 1, "name": "sin.wav", "mime": "audio/wav", "path": "{}", "notice": null}}
            ]
        }}"#,
        asset_path
    );
    Descriptor::parse(&json).unwrap()
}

#[test]
fn test_create_stores_all_rows() {
    let temp_dir = tempfile::tempdir().unwrap();
    let base = temp_dir.path();
    fs::create_dir(base.join("sounds")).unwrap();
    write_sine_wav(&base.join("sounds/sin.wav"), 440.0);
    let wav = fs::read(base.join("sounds/sin.wav")).unwrap();

    let out = base.join("sample.ptimer");
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        create_container(
            &sample_descriptor("sounds/sin.wav"),
            base,
            &out,
            &CreateOptions::default(),
        )
        .await
        .unwrap();

        let pool = ptimer::db::open_readonly_connection(&out).await.unwrap();

        let row = sqlx::query("SELECT title, description, lang FROM metadata")
            .fetch_one(&pool)
            .await
            .unwrap();
        let title: String = row.get(0);
        let lang: String = row.get(2);
        assert_eq!(title, "Sample timer");
        assert_eq!(lang, "en-US");

        let rows = sqlx::query("SELECT id, sound, duration_seconds, \"index\" FROM step ORDER BY \"index\"")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        let first_id: i64 = rows[0].get(0);
        let second_sound: Option<i64> = rows[1].get(1);
        let second_duration: Option<i64> = rows[1].get(2);
        assert_eq!(first_id, 1);
        assert_eq!(second_sound, Some(1));
        assert_eq!(second_duration, Some(2));

        let data: Vec<u8> = sqlx::query_scalar("SELECT data FROM asset WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(data, wav, "asset bytes must be embedded verbatim");

        pool.close().await;
    });

    // Single-file container: no journal or staging leftovers next to it
    let names: Vec<String> = fs::read_dir(base)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| !n.starts_with(".ptimer-")), "{:?}", names);
    assert!(names.iter().all(|n| !n.ends_with("-journal")), "{:?}", names);
}

#[test]
fn test_duplicate_index_produces_no_container() {
    let temp_dir = tempfile::tempdir().unwrap();
    let base = temp_dir.path();
    write_sine_wav(&base.join("sin.wav"), 440.0);

    let mut descriptor = sample_descriptor("sin.wav");
    descriptor.steps[1].index = descriptor.steps[0].index;

    let out = base.join("dup.ptimer");
    let rt = Runtime::new().unwrap();
    let err = rt
        .block_on(create_container(
            &descriptor,
            base,
            &out,
            &CreateOptions::default(),
        ))
        .unwrap_err();

    assert!(
        matches!(err, PtimerError::ConstraintViolation(_)),
        "unexpected error: {:?}",
        err
    );
    assert!(!out.exists(), "no usable container may be left behind");
}

#[test]
fn test_traversal_is_rejected_before_reading() {
    let temp_dir = tempfile::tempdir().unwrap();
    let base = temp_dir.path().join("timer");
    fs::create_dir(&base).unwrap();

    let out = base.join("evil.ptimer");
    let rt = Runtime::new().unwrap();
    let err = rt
        .block_on(create_container(
            &sample_descriptor("../../etc/passwd"),
            &base,
            &out,
            &CreateOptions::default(),
        ))
        .unwrap_err();

    assert!(matches!(err, PtimerError::PathTraversal { .. }));
    assert!(!out.exists());
    assert_eq!(fs::read_dir(&base).unwrap().count(), 0);
}

#[test]
fn test_absolute_asset_path_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    write_sine_wav(&outside.path().join("sin.wav"), 440.0);
    let absolute = outside.path().join("sin.wav");

    let rt = Runtime::new().unwrap();
    let err = rt
        .block_on(create_container(
            &sample_descriptor(&absolute.to_string_lossy()),
            temp_dir.path(),
            &temp_dir.path().join("abs.ptimer"),
            &CreateOptions::default(),
        ))
        .unwrap_err();

    assert!(matches!(err, PtimerError::PathTraversal { .. }));
}

#[test]
fn test_dangling_sound_reference_policy() {
    let temp_dir = tempfile::tempdir().unwrap();
    let base = temp_dir.path();
    write_sine_wav(&base.join("sin.wav"), 440.0);

    let mut descriptor = sample_descriptor("sin.wav");
    descriptor.steps[0].sound = Some(9);

    let rt = Runtime::new().unwrap();
    let err = rt
        .block_on(create_container(
            &descriptor,
            base,
            &base.join("strict.ptimer"),
            &CreateOptions::default(),
        ))
        .unwrap_err();
    assert!(matches!(err, PtimerError::ConstraintViolation(_)));
    assert!(!base.join("strict.ptimer").exists());

    let lenient = CreateOptions {
        check_sound_references: false,
        ..CreateOptions::default()
    };
    rt.block_on(create_container(
        &descriptor,
        base,
        &base.join("lenient.ptimer"),
        &lenient,
    ))
    .unwrap();
    assert!(base.join("lenient.ptimer").exists());
}

#[test]
fn test_missing_asset_file_reports_asset_id() {
    let temp_dir = tempfile::tempdir().unwrap();
    let out = temp_dir.path().join("missing.ptimer");

    let rt = Runtime::new().unwrap();
    let err = rt
        .block_on(create_container(
            &sample_descriptor("nope.wav"),
            temp_dir.path(),
            &out,
            &CreateOptions::default(),
        ))
        .unwrap_err();

    match err {
        PtimerError::Io { context, .. } => assert!(context.contains("id=1"), "{}", context),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!out.exists());
}

#[test]
fn test_failed_overwrite_keeps_previous_container() {
    let temp_dir = tempfile::tempdir().unwrap();
    let base = temp_dir.path();
    write_sine_wav(&base.join("sin.wav"), 440.0);

    let out = base.join("kept.ptimer");
    let overwrite = CreateOptions {
        overwrite: true,
        ..CreateOptions::default()
    };
    let rt = Runtime::new().unwrap();
    rt.block_on(create_container(
        &sample_descriptor("sin.wav"),
        base,
        &out,
        &overwrite,
    ))
    .unwrap();
    let previous = fs::read(&out).unwrap();

    let err = rt
        .block_on(create_container(
            &sample_descriptor("gone.wav"),
            base,
            &out,
            &overwrite,
        ))
        .unwrap_err();
    assert!(matches!(err, PtimerError::Io { .. }), "{:?}", err);
    assert_eq!(fs::read(&out).unwrap(), previous);

    let mut descriptor = sample_descriptor("sin.wav");
    descriptor.metadata.title = "Replaced".to_string();
    let timer = rt.block_on(async {
        create_container(&descriptor, base, &out, &overwrite)
            .await
            .unwrap();
        ptimer::read_container(&out).await.unwrap()
    });
    assert_eq!(timer.metadata.title, "Replaced");
}

#[cfg(unix)]
#[test]
fn test_symlink_out_of_base_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let base = temp_dir.path().join("timer");
    let outside = temp_dir.path().join("outside");
    fs::create_dir(&base).unwrap();
    fs::create_dir(&outside).unwrap();
    fs::write(outside.join("secret"), b"TOP SECRET").unwrap();
    std::os::unix::fs::symlink(&outside, base.join("link")).unwrap();

    let out = base.join("linked.ptimer");
    let rt = Runtime::new().unwrap();
    let err = rt
        .block_on(create_container(
            &sample_descriptor("link/secret"),
            &base,
            &out,
            &CreateOptions::default(),
        ))
        .unwrap_err();

    assert!(matches!(err, PtimerError::PathTraversal { .. }), "{:?}", err);
    assert!(!out.exists());
}

#[cfg(unix)]
#[test]
fn test_symlink_within_base_is_followed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let base = temp_dir.path();
    fs::create_dir(base.join("sounds")).unwrap();
    write_sine_wav(&base.join("sounds/sin.wav"), 440.0);
    std::os::unix::fs::symlink(base.join("sounds"), base.join("alias")).unwrap();

    let out = base.join("aliased.ptimer");
    let rt = Runtime::new().unwrap();
    let timer = rt.block_on(async {
        create_container(
            &sample_descriptor("alias/sin.wav"),
            base,
            &out,
            &CreateOptions::default(),
        )
        .await
        .unwrap();
        ptimer::read_container(&out).await.unwrap()
    });

    assert_eq!(
        timer.assets[0].data,
        fs::read(base.join("sounds/sin.wav")).unwrap()
    );
}
