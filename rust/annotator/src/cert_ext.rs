use openssl::{
    error::ErrorStack,
    x509::{X509NameRef, X509Ref},
};
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use strum::{Display, EnumIter, IntoEnumIterator};
use yasna::{
    models::{ObjectIdentifier, TaggedDerValue},
    tags::{
        TAG_BMPSTRING, TAG_IA5STRING, TAG_NUMERICSTRING, TAG_PRINTABLESTRING,
        TAG_TELETEXSTRING as TAG_T61STRING,
        TAG_UNIVERSALSTRING, TAG_UTF8STRING, TAG_VISIBLESTRING,
    },
    ASN1Error,
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to encode name as DER"))]
    EncodeName { source: ErrorStack },

    #[snafu(display("failed to parse DER encoded name"))]
    ParseName { source: ASN1Error },

    #[snafu(display("failed to decode {attribute} name entry as a string"))]
    DecodeNameEntry { attribute: NameAttribute },

    #[snafu(display("{attribute} name entry {value:?} contains a NUL character"))]
    NulInNameEntry {
        attribute: NameAttribute,
        value: String,
    },

    #[snafu(display("failed to convert certificate serial number to BigNum"))]
    ConvertSerialToBigNum { source: ErrorStack },

    #[snafu(display("failed to convert certificate serial number to a decimal string"))]
    ConvertSerialToDecString { source: ErrorStack },
}

/// The name attributes that are shown in a summary, in the order they are shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum NameAttribute {
    #[strum(serialize = "CN")]
    CommonName,

    #[strum(serialize = "O")]
    Organization,

    #[strum(serialize = "OU")]
    OrganizationalUnit,
}

impl NameAttribute {
    fn oid(self) -> ObjectIdentifier {
        let attribute_type = match self {
            NameAttribute::CommonName => 3,
            NameAttribute::Organization => 10,
            NameAttribute::OrganizationalUnit => 11,
        };
        ObjectIdentifier::from_slice(&[2, 5, 4, attribute_type])
    }
}

pub type NameEntry = (NameAttribute, String);

pub trait NameExt {
    /// The [`NameAttribute`] entries of the name, in the order they appear.
    fn entries(&self) -> Result<Vec<NameEntry>, Error>;
}

impl NameExt for X509NameRef {
    fn entries(&self) -> Result<Vec<NameEntry>, Error> {
        parse_name(&self.to_der().context(EncodeNameSnafu)?)
    }
}

/// Decodes the [`NameAttribute`] entries of a DER encoded X.501 `Name`.
///
/// Values are decoded in full. Entries that contain a NUL character are rejected rather than
/// rendered, since the text before the NUL would misrepresent the name.
pub fn parse_name(der: &[u8]) -> Result<Vec<NameEntry>, Error> {
    let attributes = yasna::parse_ber(der, |r| {
        let mut attributes = Vec::new();
        r.read_sequence_of(|r| {
            r.read_set_of(|r| {
                attributes.push(r.read_sequence(|r| {
                    let oid = r.next().read_oid()?;
                    let value = r.next().read_tagged_der()?;
                    Ok((oid, value))
                })?);
                Ok(())
            })
        })?;
        Ok(attributes)
    })
    .context(ParseNameSnafu)?;

    attributes
        .into_iter()
        .filter_map(|(oid, value)| {
            let attribute = NameAttribute::iter().find(|attribute| attribute.oid() == oid)?;
            Some(decode_string(attribute, &value).map(|value| (attribute, value)))
        })
        .collect()
}

fn decode_string(attribute: NameAttribute, value: &TaggedDerValue) -> Result<String, Error> {
    let bytes = value.value();
    let decoded = match value.tag() {
        TAG_UTF8STRING | TAG_PRINTABLESTRING | TAG_IA5STRING | TAG_VISIBLESTRING
        | TAG_NUMERICSTRING => String::from_utf8(bytes.to_vec()).ok(),
        // Latin-1
        TAG_T61STRING => Some(bytes.iter().copied().map(char::from).collect()),
        TAG_BMPSTRING if bytes.len() % 2 == 0 => char::decode_utf16(
            bytes
                .chunks_exact(2)
                .map(|unit| u16::from_be_bytes([unit[0], unit[1]])),
        )
        .collect::<Result<String, _>>()
        .ok(),
        TAG_UNIVERSALSTRING if bytes.len() % 4 == 0 => bytes
            .chunks_exact(4)
            .map(|unit| char::from_u32(u32::from_be_bytes([unit[0], unit[1], unit[2], unit[3]])))
            .collect(),
        _ => None,
    };

    let decoded = decoded.context(DecodeNameEntrySnafu { attribute })?;
    ensure!(
        !decoded.contains('\0'),
        NulInNameEntrySnafu {
            attribute,
            value: decoded,
        }
    );
    Ok(decoded)
}

/// The CommonName of the name. If there are several, the last one wins.
pub fn common_name(entries: &[NameEntry]) -> Option<&str> {
    entries
        .iter()
        .filter(|(attribute, _)| *attribute == NameAttribute::CommonName)
        .map(|(_, value)| value.as_str())
        .last()
}

/// A single-line summary such as `CN=DigiCert Global Root CA O=DigiCert Inc OU=www.digicert.com`.
///
/// Only the last CommonName is shown. Several Organizations or OrganizationalUnits are joined with
/// `/`. Attributes without a non-empty value are left out.
pub fn summarize(entries: &[NameEntry]) -> String {
    NameAttribute::iter()
        .map(|attribute| {
            let joined = match attribute {
                NameAttribute::CommonName => common_name(entries).unwrap_or_default().to_owned(),
                _ => entries
                    .iter()
                    .filter(|(entry_attribute, _)| *entry_attribute == attribute)
                    .map(|(_, value)| value.as_str())
                    .collect::<Vec<_>>()
                    .join("/"),
            };
            (attribute, joined)
        })
        .filter(|(_, joined)| !joined.is_empty())
        .map(|(attribute, joined)| format!("{attribute}={joined}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub trait CertExt {
    fn serial_as_dec(&self) -> Result<String, Error>;
}

impl CertExt for X509Ref {
    fn serial_as_dec(&self) -> Result<String, Error> {
        Ok(self
            .serial_number()
            .to_bn()
            .context(ConvertSerialToBigNumSnafu)?
            .to_dec_str()
            .context(ConvertSerialToDecStringSnafu)?
            .to_string())
    }
}
