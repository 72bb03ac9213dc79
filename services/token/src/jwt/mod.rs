pub mod claims;
pub mod codec;

pub use claims::{Claims, IdentityClaims};
pub use codec::{CodecError, TokenCodec, SIGNING_ALGORITHM};
