use serde::Serialize;

/// One stored credential, unique per external service.
/// The secret is an opaque ciphertext supplied by the credential service;
/// this store never encrypts or decrypts it.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: i64,
    pub service: String,
    pub username: String,
    pub secret: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Secret-free view of a credential, safe to serialize for listings.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialInfo {
    pub id: i64,
    pub service: String,
    pub username: String,
    pub created_at: String,
    pub updated_at: String,
}
