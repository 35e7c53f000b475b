pub mod ocr;
pub mod preprocess;
pub mod solver;

pub use ocr::{Classifier, TesseractClassifier};
pub use preprocess::Variant;
pub use solver::CaptchaSolver;
