use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mrdoc_core::diseases::NO_INFORMATION;
use mrdoc_core::vision::preprocess::{argmax, pixel_values};
use mrdoc_core::{
    ChatTurn, Consultation, Dispatch, DoctorError, ImageClassifier, ImagePolicy, Lookup,
    Responder, TextGenerator, TurnOutcome, TurnRole, UploadedImage,
};

/// Replies with a canned answer and records every prompt it was given
struct ScriptedGenerator {
    reply: Result<String, u16>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(status),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> mrdoc_core::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(status) => Err(DoctorError::Provider {
                provider: "Gemini",
                status: *status,
                body: "scripted failure".to_string(),
            }),
        }
    }

    fn label(&self) -> String {
        "scripted".to_string()
    }
}

/// Always predicts the same class
struct FixedClassifier {
    class_index: usize,
    calls: usize,
}

impl ImageClassifier for FixedClassifier {
    fn classify(&mut self, _image: &DynamicImage) -> mrdoc_core::Result<usize> {
        self.calls += 1;
        Ok(self.class_index)
    }
}

/// Deterministic stand-in for a real model: argmax over a fixed projection
/// of the preprocessed pixels onto 1000 classes.
struct ProjectionClassifier;

impl ImageClassifier for ProjectionClassifier {
    fn classify(&mut self, image: &DynamicImage) -> mrdoc_core::Result<usize> {
        let pixels = pixel_values(image);
        let mut logits = vec![0f32; 1000];
        for (i, value) in pixels.iter().enumerate() {
            logits[(i * 7919) % 1000] += value * ((i % 13) as f32 - 6.0);
        }
        argmax(&logits).ok_or(DoctorError::EmptyLogits)
    }
}

struct BrokenClassifier;

impl ImageClassifier for BrokenClassifier {
    fn classify(&mut self, _image: &DynamicImage) -> mrdoc_core::Result<usize> {
        Err(DoctorError::Inference("session crashed".to_string()))
    }
}

fn consultation(generator: Arc<ScriptedGenerator>, policy: ImagePolicy) -> Consultation {
    Consultation::new(Responder::new(generator), policy)
}

fn sample_upload() -> UploadedImage {
    let img = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 90]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    UploadedImage::from_bytes("rash.png", bytes).unwrap()
}

#[tokio::test]
async fn headache_gets_one_human_and_one_assistant_turn() {
    let generator = ScriptedGenerator::replying("Sorry to hear that. How old are you?");
    let mut consultation = consultation(generator.clone(), ImagePolicy::SingleShot);

    let outcome = consultation.submit("I have a headache").await.unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Replied("Sorry to hear that. How old are you?".to_string())
    );

    let turns = consultation.session().turns();
    assert_eq!(
        turns,
        &[
            ChatTurn::human("I have a headache"),
            ChatTurn::assistant("Sorry to hear that. How old are you?"),
        ]
    );

    // The responder saw the question with an empty prior history
    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("User question: I have a headache"));
    assert!(prompts[0].contains(mrdoc_core::prompt::EMPTY_HISTORY));
    assert!(!consultation.session().awaiting_image());
}

#[tokio::test]
async fn second_turn_prompt_carries_prior_history() {
    let generator = ScriptedGenerator::replying("noted");
    let mut consultation = consultation(generator.clone(), ImagePolicy::SingleShot);

    consultation.submit("I am 34").await.unwrap();
    consultation.submit("I have a cough").await.unwrap();

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[1].contains("Human: I am 34\nAI: noted"));
    assert!(!prompts[1].contains("Human: I have a cough"));
    assert_eq!(consultation.session().turns().len(), 4);
}

#[tokio::test]
async fn image_request_skips_responder() {
    let generator = ScriptedGenerator::replying("should never be used");
    let mut consultation = consultation(generator.clone(), ImagePolicy::SingleShot);

    let outcome = consultation.submit("I need image identification").await.unwrap();
    assert_eq!(outcome, TurnOutcome::ImageRequested);
    assert!(consultation.session().awaiting_image());
    assert_eq!(generator.calls(), 0);

    let turns = consultation.session().turns();
    assert!(turns.iter().all(|t| t.role != TurnRole::Assistant));
    assert_eq!(turns, &[ChatTurn::human("I need image identification")]);
}

#[tokio::test]
async fn photo_keyword_is_case_insensitive() {
    let generator = ScriptedGenerator::replying("unused");
    let mut consultation = consultation(generator.clone(), ImagePolicy::SingleShot);

    assert!(matches!(consultation.begin_turn("Can I send a PHOTO?"), Dispatch::AwaitImage));
    assert!(consultation.session().awaiting_image());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn allergy_prediction_is_displayed() {
    let generator = ScriptedGenerator::replying("unused");
    let mut consultation = consultation(generator, ImagePolicy::SingleShot);
    consultation.submit("I need image identification").await.unwrap();

    let mut classifier = FixedClassifier {
        class_index: 838,
        calls: 0,
    };
    let diagnosis = consultation.examine(&mut classifier, &sample_upload()).unwrap();

    assert_eq!(diagnosis.class_index, 838);
    assert!(matches!(diagnosis.outcome, Lookup::Found(record) if record.name == "Allergy"));
    let lines = diagnosis.lines();
    assert_eq!(lines[0], "Predicted Disease: Allergy");
    assert!(lines[1].starts_with("Description: An allergy is an immune response"));

    // Diagnoses never enter the transcript
    assert_eq!(consultation.session().turns().len(), 1);
}

#[tokio::test]
async fn unknown_prediction_shows_no_information() {
    let generator = ScriptedGenerator::replying("unused");
    let mut consultation = consultation(generator, ImagePolicy::SingleShot);
    consultation.submit("here is an image").await.unwrap();

    let mut classifier = FixedClassifier {
        class_index: 12,
        calls: 0,
    };
    let diagnosis = consultation.examine(&mut classifier, &sample_upload()).unwrap();
    assert_eq!(diagnosis.outcome, Lookup::NoInformation);
    assert_eq!(diagnosis.to_string(), NO_INFORMATION);
}

#[tokio::test]
async fn provider_failure_appends_no_assistant_turn() {
    let generator = ScriptedGenerator::failing(503);
    let mut consultation = consultation(generator.clone(), ImagePolicy::SingleShot);

    let err = consultation.submit("I have a fever").await.unwrap_err();
    assert!(matches!(err, DoctorError::Provider { status: 503, .. }));
    assert_eq!(generator.calls(), 1);
    assert_eq!(consultation.session().turns(), &[ChatTurn::human("I have a fever")]);
}

#[tokio::test]
async fn upload_without_request_is_rejected() {
    let generator = ScriptedGenerator::replying("ok");
    let mut consultation = consultation(generator, ImagePolicy::SingleShot);

    let mut classifier = FixedClassifier {
        class_index: 838,
        calls: 0,
    };
    let err = consultation.examine(&mut classifier, &sample_upload()).unwrap_err();
    assert!(matches!(err, DoctorError::ImageNotRequested));
    assert_eq!(classifier.calls, 0);
}

#[tokio::test]
async fn single_shot_policy_closes_upload_after_attempt() {
    let generator = ScriptedGenerator::replying("ok");
    let mut consultation = consultation(generator, ImagePolicy::SingleShot);
    consultation.submit("photo time").await.unwrap();

    let mut classifier = FixedClassifier {
        class_index: 838,
        calls: 0,
    };
    consultation.examine(&mut classifier, &sample_upload()).unwrap();
    assert!(!consultation.session().awaiting_image());

    // A failed classification also counts as the attempt
    consultation.submit("another photo").await.unwrap();
    assert!(consultation.examine(&mut BrokenClassifier, &sample_upload()).is_err());
    assert!(!consultation.session().awaiting_image());
}

#[tokio::test]
async fn sticky_policy_keeps_upload_open() {
    let generator = ScriptedGenerator::replying("ok");
    let mut consultation = consultation(generator.clone(), ImagePolicy::Sticky);
    consultation.submit("image please").await.unwrap();

    let mut classifier = FixedClassifier {
        class_index: 1,
        calls: 0,
    };
    consultation.examine(&mut classifier, &sample_upload()).unwrap();
    consultation.examine(&mut classifier, &sample_upload()).unwrap();
    assert!(consultation.session().awaiting_image());
    assert_eq!(classifier.calls, 2);

    // Text turns keep working while the upload control is open
    consultation.submit("thanks").await.unwrap();
    assert!(consultation.session().awaiting_image());
    assert_eq!(generator.calls(), 1);
}

#[test]
fn classification_is_deterministic_for_same_bytes() {
    let upload = sample_upload();
    let again = UploadedImage::from_bytes("rash.png", upload.bytes().to_vec()).unwrap();

    let mut classifier = ProjectionClassifier;
    let first = classifier.classify(upload.image()).unwrap();
    let second = classifier.classify(again.image()).unwrap();
    assert_eq!(first, second);
    assert!(first < 1000);
}
