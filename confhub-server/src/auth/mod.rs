//! Session verification and the per-request authorization gate

pub mod gate;
pub mod session;

pub use gate::{authenticate, session_credential, Caller, VerifiedIdentity, SESSION_COOKIE};
pub use session::{session_hash, sign_session, IdentityVerifier, SignedSessionVerifier};
