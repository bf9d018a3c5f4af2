use openssl::{
    error::ErrorStack,
    hash::{hash, MessageDigest},
};
use strum::{Display, EnumIter};

/// The digests listed in every certificate annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum DigestAlgorithm {
    #[strum(serialize = "MD5")]
    Md5,

    #[strum(serialize = "SHA1")]
    Sha1,

    #[strum(serialize = "SHA256")]
    Sha256,
}

impl DigestAlgorithm {
    fn message_digest(self) -> MessageDigest {
        match self {
            Self::Md5 => MessageDigest::md5(),
            Self::Sha1 => MessageDigest::sha1(),
            Self::Sha256 => MessageDigest::sha256(),
        }
    }
}

/// Hashes `der` and formats the digest with [`colon_hex`].
pub fn fingerprint(algorithm: DigestAlgorithm, der: &[u8]) -> Result<String, ErrorStack> {
    let digest = hash(algorithm.message_digest(), der)?;
    Ok(colon_hex(&digest))
}

/// Formats bytes as lowercase hex octets separated by colons, e.g. `79:e4:a9`.
pub fn colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
