pub mod classify;
pub mod model;
pub mod preprocess;
pub mod segment;

pub use classify::{Classification, Confidence, classify};
pub use model::{InferenceError, Models, Predictor};
pub use preprocess::{DecodeError, decode_image};
pub use segment::{Segmentation, SegmentationError, segment};
