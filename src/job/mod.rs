mod record;
mod state;
mod unit;

pub use record::{JobRecord, OrchestrationResult, Outcome, Summary};
pub use state::{JobState, Transition};
pub use unit::{
    DEFAULT_ALLOWED_CONTENT_TYPES, ImageRef, InputPolicy, Payload, UnitOfWork, UploadFile,
    content_type_for,
};
