pub mod batch_runner;
pub mod face_localizer;
pub mod field_normalizer;
pub mod mrz;
pub mod mrz_acquirer;

pub use batch_runner::BatchRunner;
pub use face_localizer::{FaceCrop, FaceLocalizer, FaceOutcome};
pub use field_normalizer::{FieldNormalizer, NormalizedFields};
pub use mrz::MrzParser;
pub use mrz_acquirer::{MrzAcquirer, MrzAttempt};
