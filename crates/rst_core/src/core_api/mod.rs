mod engine;
mod error;
mod types;

pub use engine::{Engine, Session, decode_transport};
pub use error::{CoreError, CoreErrorCode};
pub use types::{FileReport, OutputKind, SectionReport, UnpackOptions, UnpackReport};
