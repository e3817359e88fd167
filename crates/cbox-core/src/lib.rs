pub mod config;
pub mod error;
pub mod types;

pub use config::CryptoConfig;
pub use error::{CboxError, CboxResult};
pub use types::{CipherKind, HashKind, KdfKind};
