use crate::domain::IdentityId;

/// A principal as held by the external identity store.
///
/// `secret_verifier` is a bcrypt hash; the plaintext secret never leaves the
/// login request.
#[derive(Clone, Debug)]
pub struct Identity {
    pub id: IdentityId,
    pub handle: String,
    pub secret_verifier: String,
}

pub fn normalize_handle(handle: &str) -> String {
    handle.trim().to_ascii_lowercase()
}
