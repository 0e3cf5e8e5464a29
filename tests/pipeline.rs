mod common;

use common::*;
use facemood::config::PipelineProfile;
use facemood::{BoundingBox, EmotionLabel, PipelineError};
use image::Rgb;

#[test]
fn single_face_yields_happy_or_sad_with_complementary_percentages() {
    let pipeline = pipeline_with(DarkRegionLocator::default(), ConstantModel(0.8));

    let result = pipeline.infer(&encode_png(&face_image())).unwrap();

    assert_eq!(result.label, EmotionLabel::Sad);
    assert_eq!(result.confidence_percent, 80.0);
    assert!((50.0..=100.0).contains(&result.confidence_percent));
    let sum = result.probabilities.happy + result.probabilities.sad;
    assert!((sum - 100.0).abs() <= 0.01);
}

#[test]
fn blank_image_reports_no_face() {
    let pipeline = pipeline_with(DarkRegionLocator::default(), ConstantModel(0.9));

    let result = pipeline.infer(&encode_png(&blank_image())).unwrap();

    assert_eq!(result.label, EmotionLabel::NoFaceDetected);
    assert_eq!(result.confidence_percent, 0.0);
    assert_eq!(result.probabilities.happy, 0.0);
    assert_eq!(result.probabilities.sad, 0.0);
}

#[test]
fn repeated_calls_on_identical_bytes_agree() {
    let pipeline = pipeline_with(DarkRegionLocator::default(), MeanIntensityModel);
    let mut image = face_image();
    for x in 100..150 {
        image.put_pixel(x, 100, Rgb([90, 90, 90]));
    }
    let bytes = encode_png(&image);

    let first = pipeline.infer(&bytes).unwrap();
    let second = pipeline.infer(&bytes).unwrap();
    assert_eq!(first, second);
}

#[test]
fn even_odds_resolve_to_happy() {
    let pipeline = pipeline_with(DarkRegionLocator::default(), ConstantModel(0.5));

    let result = pipeline.infer(&encode_png(&face_image())).unwrap();

    assert_eq!(result.label, EmotionLabel::Happy);
    assert_eq!(result.confidence_percent, 50.0);
}

#[test]
fn non_image_bytes_fail_to_decode() {
    let pipeline = pipeline_with(DarkRegionLocator::default(), ConstantModel(0.5));

    let err = pipeline.infer(b"%PDF-1.7 not a photo").unwrap_err();
    assert!(matches!(err, PipelineError::Decode(_)));
    assert!(err.is_client_error());
}

#[test]
fn first_detected_face_wins() {
    // Left half black, right half white
    let mut image = blank_image();
    for y in 0..240 {
        for x in 0..160 {
            image.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    let dark = BoundingBox::new(10, 10, 100, 100).unwrap();
    let bright = BoundingBox::new(200, 10, 100, 100).unwrap();

    let dark_first = pipeline_with(FixedLocator(vec![dark, bright]), MeanIntensityModel);
    let result = dark_first.infer_grid(&image).unwrap();
    assert_eq!(result.label, EmotionLabel::Happy);
    assert_eq!(result.confidence_percent, 100.0);

    let bright_first = pipeline_with(FixedLocator(vec![bright, dark]), MeanIntensityModel);
    let result = bright_first.infer_grid(&image).unwrap();
    assert_eq!(result.label, EmotionLabel::Sad);
    assert_eq!(result.confidence_percent, 100.0);
}

#[test]
fn analyze_faces_labels_every_box_in_order() {
    let mut image = blank_image();
    for y in 0..240 {
        for x in 0..160 {
            image.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    let dark = BoundingBox::new(10, 10, 100, 100).unwrap();
    let bright = BoundingBox::new(200, 10, 100, 100).unwrap();
    let pipeline = pipeline_with(FixedLocator(vec![bright, dark]), MeanIntensityModel);

    let faces = pipeline.analyze_faces(&image).unwrap();

    assert_eq!(faces.len(), 2);
    assert_eq!(faces[0].bbox, bright);
    assert_eq!(faces[0].result.label, EmotionLabel::Sad);
    assert_eq!(faces[1].bbox, dark);
    assert_eq!(faces[1].result.label, EmotionLabel::Happy);
}

#[test]
fn analyze_faces_skips_only_the_failing_face() {
    let first = BoundingBox::new(10, 10, 100, 100).unwrap();
    let outside = BoundingBox::new(300, 200, 64, 64).unwrap();
    let last = BoundingBox::new(200, 10, 100, 100).unwrap();
    let pipeline = pipeline_with(FixedLocator(vec![first, outside, last]), ConstantModel(0.3));

    let faces = pipeline.analyze_faces(&face_image()).unwrap();

    let boxes: Vec<BoundingBox> = faces.iter().map(|f| f.bbox).collect();
    assert_eq!(boxes, vec![first, last]);
    assert!(faces.iter().all(|f| f.result.label == EmotionLabel::Happy));
}

#[test]
fn analyze_faces_on_blank_frame_is_empty() {
    let pipeline = pipeline_with(DarkRegionLocator::default(), ConstantModel(0.3));
    assert!(pipeline.analyze_faces(&blank_image()).unwrap().is_empty());
}

#[test]
fn box_beyond_the_image_surfaces_crop_error() {
    let outside = BoundingBox::new(300, 200, 64, 64).unwrap();
    let pipeline = pipeline_with(FixedLocator(vec![outside]), ConstantModel(0.3));

    let err = pipeline.infer(&encode_png(&face_image())).unwrap_err();
    assert!(matches!(err, PipelineError::CropOutOfBounds { width: 320, height: 240, .. }));
    assert!(!err.is_client_error());
}

#[test]
fn call_site_profile_reaches_the_locator() {
    let locator = std::sync::Arc::new(DarkRegionLocator::default());
    let serving = facemood::InferencePipeline::new(
        locator.clone(),
        facemood::EmotionClassifier::new(std::sync::Arc::new(ConstantModel(0.3))),
        PipelineProfile::serving(),
    );
    let interactive = serving.with_profile(PipelineProfile::interactive());

    serving.infer_grid(&face_image()).unwrap();
    interactive.analyze_faces(&face_image()).unwrap();

    let seen = locator.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!((seen[0].min_neighbors, seen[0].min_size), (3, 50));
    assert_eq!((seen[1].min_neighbors, seen[1].min_size), (5, 30));
}

#[test]
fn pipeline_is_shareable_across_threads() {
    let pipeline = std::sync::Arc::new(pipeline_with(
        DarkRegionLocator::default(),
        ConstantModel(0.25),
    ));
    let bytes = std::sync::Arc::new(encode_png(&face_image()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            let bytes = bytes.clone();
            std::thread::spawn(move || pipeline.infer(&bytes).unwrap())
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert_eq!(result.label, EmotionLabel::Happy);
        assert_eq!(result.confidence_percent, 75.0);
    }
}
