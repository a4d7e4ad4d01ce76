/// Authentication core.
///
/// Password verification, access-token issuance/validation, and the
/// refresh-token rotation state machine.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::Claims;
pub use jwt::{IssuedToken, TokenCodec};
pub use password::PasswordHasher;
pub use refresh_token::generate_refresh_token;
pub use refresh_token::hash_refresh_token;
pub use refresh_token::RefreshTokenRecord;
pub use session::{SessionIssuer, SessionRotator, TokenPair};
