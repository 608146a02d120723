mod error;
mod manifest;

pub use error::ManifestError;
pub use manifest::{
    hex_sha256, hex_sha256_file, read, verify_chunks, write, ManifestOutcome, CHECKSUMS_FILE_NAME,
    METADATA_FILE_NAME,
};
