use openssl::{error::ErrorStack, x509::X509};
use snafu::{ResultExt, Snafu};
use yasna::ASN1Error;

use crate::{
    armor::RawBlock,
    cert_ext::{self, common_name, summarize, CertExt, NameExt},
    fingerprint::{fingerprint, DigestAlgorithm},
};

#[derive(Debug, Snafu)]
pub enum AnnotateError {
    #[snafu(display("failed to parse block contents as a DER encoded X.509 certificate"))]
    ParseCertificate { source: ErrorStack },

    #[snafu(display("certificate is followed by trailing data"))]
    TrailingData { source: ASN1Error },

    #[snafu(display("failed to format issuer name"))]
    FormatIssuer { source: cert_ext::Error },

    #[snafu(display("failed to format subject name"))]
    FormatSubject { source: cert_ext::Error },

    #[snafu(display("failed to read serial number"))]
    ReadSerial { source: cert_ext::Error },

    #[snafu(display("failed to compute {algorithm} fingerprint"))]
    ComputeFingerprint {
        source: ErrorStack,
        algorithm: DigestAlgorithm,
    },
}

/// The summary that is printed in front of a certificate.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedCertificate {
    pub issuer: String,
    pub subject: String,
    pub label: String,
    pub serial: String,
    pub md5_fingerprint: String,
    pub sha1_fingerprint: String,
    pub sha256_fingerprint: String,

    /// The block the certificate was decoded from, re-emitted as-is by [`Self::render`].
    pub pem: RawBlock,
}

/// Parses `block` as a certificate and collects its summary.
///
/// Fingerprints are taken over the DER bytes exactly as they were stored in the PEM body, which
/// must hold the certificate and nothing else.
pub fn annotate(block: RawBlock) -> Result<ParsedCertificate, AnnotateError> {
    let der = block.contents();
    let cert = X509::from_der(der).context(ParseCertificateSnafu)?;
    // OpenSSL stops after the first certificate and ignores whatever follows it
    yasna::parse_ber(der, |r| r.read_tagged_der()).context(TrailingDataSnafu)?;

    let issuer = summarize(&NameExt::entries(cert.issuer_name()).context(FormatIssuerSnafu)?);
    let subject_entries = NameExt::entries(cert.subject_name()).context(FormatSubjectSnafu)?;
    let subject = summarize(&subject_entries);
    let label = common_name(&subject_entries).unwrap_or_default().to_owned();
    let serial = cert.serial_as_dec().context(ReadSerialSnafu)?;

    let der_fingerprint = |algorithm| {
        fingerprint(algorithm, der).context(ComputeFingerprintSnafu { algorithm })
    };
    let md5_fingerprint = der_fingerprint(DigestAlgorithm::Md5)?;
    let sha1_fingerprint = der_fingerprint(DigestAlgorithm::Sha1)?;
    let sha256_fingerprint = der_fingerprint(DigestAlgorithm::Sha256)?;

    Ok(ParsedCertificate {
        issuer,
        subject,
        label,
        serial,
        md5_fingerprint,
        sha1_fingerprint,
        sha256_fingerprint,
        pem: block,
    })
}

impl ParsedCertificate {
    pub fn fingerprints(&self) -> [(DigestAlgorithm, &str); 3] {
        [
            (DigestAlgorithm::Md5, self.md5_fingerprint.as_str()),
            (DigestAlgorithm::Sha1, self.sha1_fingerprint.as_str()),
            (DigestAlgorithm::Sha256, self.sha256_fingerprint.as_str()),
        ]
    }

    /// Renders the comment header followed by the original PEM block.
    ///
    /// The output starts with a blank line, so renderings can be concatenated as-is.
    pub fn render(&self) -> String {
        let mut out = String::from("\n");
        for (field, value) in [
            ("Issuer", &self.issuer),
            ("Subject", &self.subject),
            ("Label", &self.label),
            ("Serial", &self.serial),
        ] {
            out.push_str(&format!("# {field}: {value}\n"));
        }
        for (algorithm, fingerprint) in self.fingerprints() {
            out.push_str(&format!("# {algorithm} Fingerprint: {fingerprint}\n"));
        }
        out.push_str(&self.pem.to_pem());
        out
    }
}
