mod capability;
mod metadata;
mod result;
mod status;

pub use self::capability::Capability;
pub use self::metadata::{FileMetadata, extension_of};
pub use self::result::ExtractionResult;
pub use self::status::Status;
