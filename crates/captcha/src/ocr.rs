use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};

/// Best-effort character classifier for captcha images. May fail on
/// malformed input; the solver treats any failure as "no result".
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, image: &[u8]) -> Result<String>;
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

const CHAR_WHITELIST: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Shells out to the tesseract CLI in single-line mode with an alphanumeric
/// whitelist. tesseract reads from a file, so the bytes take a round trip
/// through the temp dir; names are unique because batch solving runs
/// several classifications in parallel.
pub struct TesseractClassifier {
    temp_dir: PathBuf,
}

impl TesseractClassifier {
    pub fn new() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.temp_dir
            .join(format!("xuanke-captcha-{}-{}.png", std::process::id(), n))
    }
}

impl Default for TesseractClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for TesseractClassifier {
    fn classify(&self, image: &[u8]) -> Result<String> {
        let path = self.temp_path();
        std::fs::write(&path, image).context("writing captcha temp file")?;

        let output = Command::new("tesseract")
            .arg(&path)
            .arg("stdout")
            .arg("--psm")
            .arg("7")
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", CHAR_WHITELIST))
            .output();

        std::fs::remove_file(&path).ok();

        let output = output.context("running tesseract")?;
        if !output.status.success() {
            anyhow::bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
