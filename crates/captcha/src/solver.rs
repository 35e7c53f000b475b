use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use xuanke_core::config::CaptchaConfig;

use crate::ocr::Classifier;
use crate::preprocess::{self, Variant};

/// Portal captchas are always four characters.
const GUESS_LEN: usize = 4;

/// Best-effort captcha reader. Tries the cleanup variants in yield order,
/// falls back to the untouched bytes, and repeats the whole sequence up to
/// `max_attempts` times. Returns `""` only on exhaustion; every per-variant
/// error just skips that variant.
#[derive(Clone)]
pub struct CaptchaSolver {
    classifier: Arc<dyn Classifier>,
    max_attempts: u32,
    dump_dir: Option<PathBuf>,
}

impl CaptchaSolver {
    pub fn new(classifier: Arc<dyn Classifier>, config: &CaptchaConfig) -> Self {
        Self {
            classifier,
            max_attempts: config.max_attempts.max(1),
            dump_dir: config.debug_dump.then(|| PathBuf::from(&config.dump_dir)),
        }
    }

    pub fn solve(&self, image: &[u8]) -> String {
        for attempt in 1..=self.max_attempts {
            for variant in Variant::ALL {
                let cleaned = match preprocess::apply(variant, image) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        debug!(?variant, error = %e, "preprocess failed, skipping variant");
                        continue;
                    }
                };
                self.dump(variant, &cleaned);
                if let Some(guess) = self.classify_gated(&cleaned) {
                    debug!(?variant, attempt, "captcha solved");
                    return guess;
                }
            }

            // Cleanup can destroy thin glyphs; the raw image sometimes
            // reads where every variant failed.
            if let Some(guess) = self.classify_gated(image) {
                debug!(attempt, "captcha solved from original bytes");
                return guess;
            }

            debug!(attempt, max_attempts = self.max_attempts, "no variant yielded a guess");
        }

        warn!(max_attempts = self.max_attempts, "captcha recognition failed");
        String::new()
    }

    /// Classify and accept only an exactly-four-character alphanumeric
    /// result; anything else counts as a miss for this input.
    fn classify_gated(&self, image: &[u8]) -> Option<String> {
        let raw = match self.classifier.classify(image) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "classifier failed on this input");
                return None;
            }
        };
        let guess = strip_non_alphanumeric(&raw);
        (guess.len() == GUESS_LEN).then_some(guess)
    }

    /// Solve many images on a worker pool sized to the machine. Items are
    /// independent; output order mirrors input order.
    pub async fn solve_batch(&self, images: Vec<Vec<u8>>) -> Vec<String> {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let semaphore = Arc::new(Semaphore::new(workers));

        let handles: Vec<_> = images
            .into_iter()
            .map(|image| {
                let solver = self.clone();
                let semaphore = semaphore.clone();
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    tokio::task::spawn_blocking(move || solver.solve(&image))
                        .await
                        .unwrap_or_default()
                })
            })
            .collect();

        let mut guesses = Vec::with_capacity(handles.len());
        for handle in handles {
            guesses.push(handle.await.unwrap_or_default());
        }
        guesses
    }

    fn dump(&self, variant: Variant, bytes: &[u8]) {
        if let Some(dir) = &self.dump_dir {
            if std::fs::create_dir_all(dir).is_ok() {
                let path = dir.join(format!("preprocessed-{:?}.png", variant));
                if let Err(e) = std::fs::write(&path, bytes) {
                    debug!(path = %path.display(), error = %e, "debug dump failed");
                }
            }
        }
    }
}

/// Keep only ASCII alphanumerics, preserving case and relative order.
pub fn strip_non_alphanumeric(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Mutex;

    /// Returns scripted outputs in order, then errors.
    struct ScriptedClassifier {
        outputs: Mutex<Vec<Result<String, String>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedClassifier {
        fn new(outputs: Vec<Result<String, String>>) -> Self {
            Self {
                outputs: Mutex::new(outputs),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl Classifier for ScriptedClassifier {
        fn classify(&self, _image: &[u8]) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            let mut outputs = self.outputs.lock().unwrap();
            if outputs.is_empty() {
                anyhow::bail!("script exhausted");
            }
            outputs.remove(0).map_err(|e| anyhow::anyhow!(e))
        }
    }

    /// Echoes the image bytes back as text.
    struct EchoClassifier;

    impl Classifier for EchoClassifier {
        fn classify(&self, image: &[u8]) -> Result<String> {
            Ok(String::from_utf8_lossy(image).into_owned())
        }
    }

    fn solver_with(classifier: Arc<dyn Classifier>, max_attempts: u32) -> CaptchaSolver {
        let config = CaptchaConfig {
            max_attempts,
            ..CaptchaConfig::default()
        };
        CaptchaSolver::new(classifier, &config)
    }

    fn sample_png() -> Vec<u8> {
        use image::{GrayImage, Luma};
        let img = GrayImage::from_fn(24, 12, |x, y| Luma([((x * 7 + y * 3) % 255) as u8]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_strip_preserves_case_and_order() {
        assert_eq!(strip_non_alphanumeric("a-B3!c"), "aB3c");
        assert_eq!(strip_non_alphanumeric("  9 z 9 z "), "9z9z");
        assert_eq!(strip_non_alphanumeric("!!!"), "");
    }

    #[test]
    fn test_wrong_length_results_are_rejected() {
        // Both variants read wrong lengths, the original-bytes fallback
        // reads four characters: that is the accepted one.
        let classifier = Arc::new(ScriptedClassifier::new(vec![
            Ok("abcde".into()),
            Ok("xy1".into()),
            Ok("AB12".into()),
        ]));
        let solver = solver_with(classifier.clone(), 2);

        assert_eq!(solver.solve(&sample_png()), "AB12");
        assert_eq!(classifier.calls(), 3);
    }

    #[test]
    fn test_punctuation_is_stripped_before_the_length_gate() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![Ok("a-B3!c".into())]));
        let solver = solver_with(classifier, 1);

        // "a-B3!c" strips to "aB3c", exactly four characters.
        assert_eq!(solver.solve(&sample_png()), "aB3c");
    }

    #[test]
    fn test_exhaustion_returns_empty_string() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![
            Ok("toolong1".into());
            6
        ]));
        let solver = solver_with(classifier.clone(), 2);

        assert_eq!(solver.solve(&sample_png()), "");
        // 2 attempts x (2 variants + original fallback)
        assert_eq!(classifier.calls(), 6);
    }

    #[test]
    fn test_classifier_errors_skip_the_variant() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![
            Err("bad input".into()),
            Ok("Zz99".into()),
        ]));
        let solver = solver_with(classifier, 1);

        assert_eq!(solver.solve(&sample_png()), "Zz99");
    }

    #[test]
    fn test_undecodable_image_still_reaches_the_fallback() {
        // Preprocess fails on garbage bytes for every variant, so the only
        // classifier call is the original-bytes fallback.
        let classifier = Arc::new(ScriptedClassifier::new(vec![Ok("Qq77".into())]));
        let solver = solver_with(classifier.clone(), 1);

        assert_eq!(solver.solve(b"not an image"), "Qq77");
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        // Garbage "images" fall through to the echo fallback, so each
        // result is derived from its own input.
        let solver = solver_with(Arc::new(EchoClassifier), 1);
        let images = vec![b"AB12".to_vec(), b"CD34".to_vec(), b"EF56".to_vec()];

        let guesses = solver.solve_batch(images).await;
        assert_eq!(guesses, vec!["AB12", "CD34", "EF56"]);
    }
}
