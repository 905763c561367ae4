pub mod constants;
pub mod envelope;
pub mod error;
pub mod model;
pub mod types;

pub use constants::*;
pub use envelope::EnvelopeBuilder;
pub use error::WardrailError;
pub use model::*;
pub use types::*;
