pub mod digest;
pub mod rotator;
pub mod session;

pub use digest::{DigestError, SecretDigest};
pub use rotator::{Issuance, RotationEngine, RotationSettings};
pub use session::{RefreshSession, SessionId, TokenPair};
