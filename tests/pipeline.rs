use std::io::Cursor;
use std::sync::Arc;

use chrono::NaiveDate;
use image::{DynamicImage, GrayImage, ImageOutputFormat, Rgb, RgbImage};
use luppa_extract::capabilities::fake::{MemoryStorage, StaticFaceDetector};
use luppa_extract::capabilities::DirectoryStorage;
use luppa_extract::capabilities::MrzDecoder;
use luppa_extract::models::{BatchItem, BoundingBox, FaceSource, RawMrzFields};
use luppa_extract::processing::MrzParser;
use luppa_extract::{DocumentExtractor, ExtractorConfig, PassportError};

/// Reads the document number from the image width; images narrower than
/// 20 pixels have no MRZ.
struct WidthDecoder;

impl MrzDecoder for WidthDecoder {
    fn decode(&self, image: &DynamicImage) -> Result<Option<RawMrzFields>, PassportError> {
        if image.width() < 20 {
            return Ok(None);
        }
        Ok(Some(RawMrzFields {
            country: "ITR".to_string(),
            number: format!("P{}<<", image.width()),
            surname: "SMITH<<".to_string(),
            names: "JOHN<<<".to_string(),
            nationality: "USA".to_string(),
            date_of_birth: "990101".to_string(),
            sex: "M".to_string(),
            expiration_date: "991332".to_string(),
            personal_number: "<<<<".to_string(),
            ..RawMrzFields::default()
        }))
    }
}

/// Decodes real MRZ text only when the image is already binary, so the
/// fallback path is the only way to succeed.
struct BinaryOnlyDecoder;

impl MrzDecoder for BinaryOnlyDecoder {
    fn decode(&self, image: &DynamicImage) -> Result<Option<RawMrzFields>, PassportError> {
        let gray: GrayImage = image.to_luma8();
        if !gray.pixels().all(|p| p[0] == 0 || p[0] == 255) {
            return Ok(None);
        }
        let text = format!(
            "{:<<44}\nL898902C36UTO7408122F1204159ZE184226B<<<<<10",
            "P<UTOERIKSSON<<ANNA<MARIA"
        );
        Ok(MrzParser::parse_mrz_text(&text))
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([30, 30, 30])
        } else {
            Rgb([220, 220, 220])
        }
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn extractor(decoder: Arc<dyn MrzDecoder>, faces: Vec<BoundingBox>) -> (DocumentExtractor, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new("faces"));
    let extractor = DocumentExtractor::new(
        decoder,
        Arc::new(StaticFaceDetector::new(faces)),
        storage.clone(),
        ExtractorConfig::default(),
    )
    .unwrap();
    (extractor, storage)
}

#[test]
fn batch_of_five_isolates_unreadable_document() {
    let (extractor, storage) = extractor(Arc::new(WidthDecoder), vec![]);
    let images = vec![png(30, 20), png(31, 20), png(13, 20), png(33, 20), png(34, 20)];
    let names = ["one.png", "two.png", "three.png", "four.png", "five.png"];

    let result = extractor.extract_batch_named(&images, &names).unwrap();

    assert_eq!(result.total, 5);
    assert_eq!(result.successful_count, 4);
    assert_eq!(result.failed_count, 1);
    assert_eq!(result.successful_count + result.failed_count, result.total);

    match &result.per_item[2] {
        BatchItem::Failure(err) => {
            assert_eq!(err.identifier, "three.png");
            assert_eq!(err.kind, "mrz_not_found");
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let numbers: Vec<Option<String>> = result
        .per_item
        .iter()
        .map(|item| match item {
            BatchItem::Success(record) => Some(record.passport_number.clone()),
            BatchItem::Failure(_) => None,
        })
        .collect();
    assert_eq!(
        numbers,
        vec![
            Some("P30".to_string()),
            Some("P31".to_string()),
            None,
            Some("P33".to_string()),
            Some("P34".to_string()),
        ]
    );
    assert_eq!(storage.blobs().len(), 4);
}

#[test]
fn batch_over_cap_is_rejected_before_processing() {
    let (extractor, storage) = extractor(Arc::new(WidthDecoder), vec![]);
    let images: Vec<Vec<u8>> = (0..16).map(|_| png(30, 20)).collect();
    let names: Vec<String> = (0..16).map(|i| format!("{}.png", i)).collect();

    let err = extractor.extract_batch_named(&images, &names).unwrap_err();

    assert!(matches!(err, PassportError::InputError(_)));
    assert!(storage.blobs().is_empty());
}

#[test]
fn record_fields_are_normalized() {
    let (extractor, _) = extractor(Arc::new(WidthDecoder), vec![BoundingBox::new(2, 2, 6, 6)]);

    let record = extractor.extract_document(&png(40, 30), "scan.png").unwrap();

    assert_eq!(record.passport_number, "P40");
    assert_eq!(record.country, "IRQ");
    assert_eq!(record.nationality, "USA");
    assert_eq!(record.surname, "SMITH");
    assert_eq!(record.names, "JOHN");
    assert_eq!(record.date_of_birth, NaiveDate::from_ymd_opt(1999, 1, 1));
    assert_eq!(record.expiration_date, None);
    assert_eq!(record.personal_number, "");
    assert_eq!(record.face_source, FaceSource::Cropped);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["date_of_birth"], "1999-01-01");
    assert!(json["expiration_date"].is_null());
    assert!(json["face_region"].is_string());
}

#[test]
fn undetectable_face_still_yields_record() {
    let (extractor, storage) = extractor(Arc::new(WidthDecoder), vec![]);
    let image = png(40, 30);

    let record = extractor.extract_document(&image, "scan.png").unwrap();

    assert_eq!(record.face_region, None);
    assert_eq!(record.face_source, FaceSource::FullDocument);
    assert_eq!(storage.blobs()[0].1, image);
}

#[test]
fn fallback_binarization_recovers_mrz() {
    let (extractor, _) = extractor(Arc::new(BinaryOnlyDecoder), vec![]);

    let record = extractor.extract_document(&png(24, 24), "grey.png").unwrap();

    assert_eq!(record.passport_number, "L898902C3");
    assert_eq!(record.surname, "ERIKSSON");
    assert_eq!(record.names, "ANNA MARIA");
    assert_eq!(record.date_of_birth, NaiveDate::from_ymd_opt(1974, 8, 12));
    assert_eq!(record.expiration_date, NaiveDate::from_ymd_opt(2012, 4, 15));
    assert_eq!(record.personal_number, "ZE184226B");
}

#[test]
fn raised_batch_cap_is_refused() {
    let config = ExtractorConfig {
        max_batch_size: 100,
        ..ExtractorConfig::default()
    };
    let result = DocumentExtractor::new(
        Arc::new(WidthDecoder),
        Arc::new(StaticFaceDetector::none()),
        Arc::new(MemoryStorage::new("faces")),
        config,
    );

    assert!(matches!(result.err(), Some(PassportError::ConfigError(_))));
}

#[test]
fn oversized_face_box_falls_back_to_full_document() {
    let (extractor, storage) = extractor(
        Arc::new(WidthDecoder),
        vec![BoundingBox::new(0, 0, i64::MAX / 2, 10)],
    );
    let image = png(40, 30);

    let record = extractor.extract_document(&image, "scan.png").unwrap();

    assert_eq!(record.passport_number, "P40");
    assert_eq!(record.face_source, FaceSource::FullDocument);
    assert_eq!(storage.blobs()[0].1, image);
}

#[test]
fn full_document_fallback_keeps_upload_format() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = DocumentExtractor::new(
        Arc::new(WidthDecoder),
        Arc::new(StaticFaceDetector::none()),
        Arc::new(DirectoryStorage::new(dir.path(), "faces")),
        ExtractorConfig::default(),
    )
    .unwrap();

    let record = extractor.extract_document(&png(40, 30), "scan.png").unwrap();

    assert_eq!(record.face_source, FaceSource::FullDocument);
    assert!(record.face_image_url.ends_with(".png"), "{}", record.face_image_url);
}
