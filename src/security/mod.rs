pub mod lock_guard;
pub mod replay_guard;
pub mod signing;
pub mod token;

pub use lock_guard::LockGuard;
pub use replay_guard::IssuedTokenIndex;
pub use signing::{SigningKey, load_signing_key};
pub use token::{Token, TokenIssuer, TokenVerifier};
