use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("no private key available for identity {0}")]
    UnknownIdentity(String),

    #[error("authenticated decryption failed")]
    Decryption,

    #[error("ciphertext too short: {0} bytes")]
    Truncated(usize),

    #[error("invalid padding: {0}")]
    Padding(String),

    #[error("malformed JWS: {0}")]
    MalformedJws(String),

    #[error("unsupported JWS algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unknown JWS key id: {0}")]
    UnknownKeyId(String),

    #[error("JWS signature verification failed")]
    BadSignature,
}
