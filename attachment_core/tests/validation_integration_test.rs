use attachment_core::{
    units::{KB, MB},
    AppConfig, AspectRatio, Attachment, FailureKind, Record, ValidationSchema, Validator,
};
use image::{ImageFormat, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::new(width, height)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

fn write_wav(dir: &Path, name: &str, seconds: u32) -> PathBuf {
    let sample_rate: u32 = 8000;
    let byte_rate = sample_rate * 2;
    let data_len = byte_rate * seconds;

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(bytes.len() + data_len as usize, 0);

    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn setup() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_image_rules_against_real_files() {
    let dir = setup();
    let banner = write_png(dir.path(), "banner.png", 800, 600);

    let schema = ValidationSchema::builder()
        .attribute("banner", |a| {
            a.attached()
                .content_types(["image/png", "image/jpeg"])
                .min_width(1000)
                .aspect_ratio(AspectRatio::Ratio { width: 4, height: 3 })
                .min_duration(1.0)
        })
        .build()
        .unwrap();

    let record = Record::new().attach("banner", Attachment::from_path(&banner));
    let report = Validator::default().validate(&record, &schema).unwrap();

    assert_eq!(report.kinds(), vec![FailureKind::WidthTooSmall]);
    assert_eq!(
        report.failures()[0].message,
        "width must be greater than or equal to 1000 pixels (current width is 800)"
    );
}

#[test]
fn test_disguised_file_is_caught_by_sniffing() {
    let dir = setup();
    let real_png = write_png(dir.path(), "real.png", 4, 4);
    let disguised = dir.path().join("photo.gif");
    fs::copy(&real_png, &disguised).unwrap();

    let schema = ValidationSchema::builder()
        .attribute("photo", |a| a.strict_content_types(["gif"]))
        .build()
        .unwrap();
    let record = Record::new().attach("photo", Attachment::from_path(&disguised).with_content_type("image/gif"));

    let report = Validator::default().validate(&record, &schema).unwrap();
    assert_eq!(report.kinds(), vec![FailureKind::NotAllowed, FailureKind::Spoofed]);
    assert!(report.failures()[0].message.contains("image/png"));
}

#[test]
fn test_audio_duration_and_total_size() {
    let dir = setup();
    let short = write_wav(dir.path(), "short.wav", 1);
    let long = write_wav(dir.path(), "long.wav", 4);

    let schema = ValidationSchema::builder()
        .attribute("clips", |a| {
            a.content_types(["audio/*"])
                .min_duration(2.0)
                .max_duration(3.0)
                .max_total_size(64 * KB)
                .max_files(5)
        })
        .build()
        .unwrap();
    let record = Record::new()
        .attach("clips", Attachment::from_path(&short))
        .attach("clips", Attachment::from_path(&long));

    let report = Validator::default().validate(&record, &schema).unwrap();
    assert_eq!(
        report.kinds(),
        vec![
            FailureKind::DurationTooShort,
            FailureKind::DurationTooLong,
            FailureKind::TotalSizeTooLarge,
        ]
    );
    assert_eq!(report.failures()[0].filename.as_deref(), Some("short.wav"));
}

#[test]
fn test_schema_file_and_localized_messages() {
    let dir = setup();
    let avatar = write_png(dir.path(), "avatar.png", 300, 200);
    let rules = dir.path().join("rules.toml");
    fs::write(
        &rules,
        r#"
        [[attributes]]
        name = "avatar"
        rules = [
            { kind = "size", max = 10 },
            { kind = "aspect_ratio", ratio = "square", message = "doit être carré" },
        ]

        [[attributes]]
        name = "resume"
        rules = [{ kind = "attached" }]
        "#,
    )
    .unwrap();

    let schema = ValidationSchema::from_path(&rules).unwrap();
    let record = Record::new().attach("avatar", Attachment::from_path(&avatar));

    let mut config = AppConfig::default();
    config.locale.default_locale = "fr".to_string();
    let validator = Validator::from_config(&config).unwrap();

    let report = validator.validate(&record, &schema).unwrap();
    let messages: Vec<_> = report.failures().iter().map(|f| f.message.as_str()).collect();

    assert_eq!(report.kinds(), vec![FailureKind::TooLarge, FailureKind::AspectRatioMismatch, FailureKind::Blank]);
    assert!(messages[0].starts_with("la taille du fichier doit être inférieure ou égale à 10 Bytes"), "{}", messages[0]);
    assert_eq!(messages[1], "doit être carré");
    assert_eq!(messages[2], "doit être rempli(e)");
    assert_eq!(report.errors()["avatar"].len(), 2);
}

#[test]
fn test_missing_file_is_an_extraction_error() {
    let dir = setup();
    let schema = ValidationSchema::builder()
        .attribute("doc", |a| a.max_size(10 * MB))
        .build()
        .unwrap();
    let record = Record::new().attach("doc", Attachment::from_path(dir.path().join("gone.pdf")));

    let err = Validator::default().validate(&record, &schema).unwrap_err();
    assert!(err.is_extraction());
}

#[test]
fn test_custom_locale_directory() {
    let dir = setup();
    let locales = dir.path().join("locales");
    fs::create_dir(&locales).unwrap();
    fs::write(locales.join("es.yml"), "es:\n  blank: \"no puede estar en blanco\"\n").unwrap();

    let mut config = AppConfig::default();
    config.locale.default_locale = "es-MX".to_string();
    config.locale.locale_dir = Some(locales);

    let schema = ValidationSchema::builder()
        .attribute("contract", |a| a.attached().max_files(2))
        .build()
        .unwrap();

    let report = Validator::from_config(&config).unwrap().validate(&Record::new(), &schema).unwrap();
    assert_eq!(report.full_messages(), vec!["Contract no puede estar en blanco"]);
}

#[test]
fn test_misnamed_upload_is_reported_not_raised() {
    let schema = ValidationSchema::builder()
        .attribute("avatar", |a| a.content_types(["image/png"]).max_duration(10.0))
        .build()
        .unwrap();
    let record = Record::new()
        .attach("avatar", Attachment::from_bytes("clip.mp4", b"hello this is plain text, not a video".to_vec()))
        .attach("avatar", Attachment::from_bytes("song.wav", b"also plain text".to_vec()));

    let report = Validator::default().validate(&record, &schema).unwrap();
    assert_eq!(report.kinds(), vec![FailureKind::NotAllowed, FailureKind::NotAllowed]);
    assert!(report.failures()[0].message.contains("video/mp4"), "{}", report.failures()[0].message);
}
