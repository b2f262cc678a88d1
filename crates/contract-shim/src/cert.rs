//! # Certificate Chain Validator
//!
//! Decides whether a caller may use a certificate, using nothing but
//! certificate-store reads. The store is reached through [`CertificateStore`]
//! so the algorithm runs the same against the live peer or a test double.
//!
//! ## Store Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `RootCABytes` | root CA certificate (DER or PEM) |
//! | `RootCAHolder` | address holding the root CA |
//! | `CertBytes_<id>` | JSON [`CertBytesInfo`] |
//! | `CertSubject_<common name>` | big-endian id of the certificate with that subject |
//! | `CertServer_<holder>^<serial>` | revocation time of a server certificate |
//! | `CertMember_<holder>^<serial>` | revocation time of a member certificate |
//!
//! Ids and serials are written as the decimal form of the big-endian
//! unsigned integer. Revocation times are 8-byte big-endian Unix seconds.

use crate::errors::ShimError;
use async_trait::async_trait;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{codec, CertBytesInfo};
use thiserror::Error;
use tracing::debug;

/// Store keys.
pub mod keys {
    /// Root CA certificate bytes.
    pub const ROOT_CA_BYTES: &str = "RootCABytes";
    /// Root CA holder address.
    pub const ROOT_CA_HOLDER: &str = "RootCAHolder";
    /// Prefix of certificate records.
    pub const CERT_BYTES: &str = "CertBytes_";
    /// Prefix of subject-to-id links.
    pub const CERT_SUBJECT: &str = "CertSubject_";
    /// Prefix of server revocation times.
    pub const CERT_SERVER: &str = "CertServer_";
    /// Prefix of member revocation times.
    pub const CERT_MEMBER: &str = "CertMember_";
    /// Separator between holder and serial.
    pub const SPLIT: char = '^';

    /// Key of the record for certificate `id`.
    pub fn cert_bytes(id: &str) -> String {
        format!("{CERT_BYTES}{id}")
    }

    /// Key of the link for subject `common_name`.
    pub fn cert_subject(common_name: &str) -> String {
        format!("{CERT_SUBJECT}{common_name}")
    }

    /// Key of a server certificate's revocation time.
    pub fn cert_server(holder: &str, serial: &str) -> String {
        format!("{CERT_SERVER}{holder}{SPLIT}{serial}")
    }

    /// Key of a member certificate's revocation time.
    pub fn cert_member(holder: &str, serial: &str) -> String {
        format!("{CERT_MEMBER}{holder}{SPLIT}{serial}")
    }
}

/// Longest issuer chain followed before giving up.
pub const MAX_CHAIN_DEPTH: usize = 16;

// =============================================================================
// PORTS
// =============================================================================

/// Read access to the certificate store.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Raw value under `key`; empty if absent.
    async fn get_cert_state(&self, key: &str) -> Result<Vec<u8>, ShimError>;
}

/// The fields of a certificate the validator looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedCertificate {
    /// Decimal serial number.
    pub serial: String,
    /// Subject common name.
    pub subject_cn: String,
    /// Issuer common name.
    pub issuer_cn: String,
    /// Start of validity, Unix seconds.
    pub not_before: i64,
    /// End of validity, Unix seconds.
    pub not_after: i64,
}

impl DecodedCertificate {
    /// Whether `now` lies inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.not_before <= now && now <= self.not_after
    }
}

/// Turns stored certificate bytes into a [`DecodedCertificate`].
pub trait CertificateDecoder: Send + Sync {
    /// Decode `raw`, or describe why it cannot be decoded.
    fn decode(&self, raw: &[u8]) -> Result<DecodedCertificate, String>;
}

/// X.509 decoder accepting DER or PEM.
#[derive(Debug, Clone, Copy, Default)]
pub struct X509Decoder;

impl CertificateDecoder for X509Decoder {
    fn decode(&self, raw: &[u8]) -> Result<DecodedCertificate, String> {
        use x509_parser::pem::parse_x509_pem;
        use x509_parser::x509::X509Name;

        let der;
        let bytes = if raw.starts_with(b"-----BEGIN") {
            let (_, pem) = parse_x509_pem(raw).map_err(|e| format!("pem: {e}"))?;
            der = pem.contents;
            der.as_slice()
        } else {
            raw
        };

        let (_, cert) = x509_parser::parse_x509_certificate(bytes).map_err(|e| format!("x509: {e}"))?;
        let common_name = |name: &X509Name<'_>| {
            name.iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
                .unwrap_or_default()
                .to_owned()
        };

        Ok(DecodedCertificate {
            serial: id_to_decimal(cert.raw_serial()).ok_or("serial number too long")?,
            subject_cn: common_name(cert.subject()),
            issuer_cn: common_name(cert.issuer()),
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
        })
    }
}

/// Decimal form of a big-endian unsigned integer, `None` above 256 bits.
#[must_use]
pub fn id_to_decimal(bytes: &[u8]) -> Option<String> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let digits = &bytes[start..];
    if digits.len() > 32 {
        return None;
    }
    Some(U256::from_big_endian(digits).to_string())
}

// =============================================================================
// REJECTIONS
// =============================================================================

/// Why a certificate was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CertRejection {
    /// No certificate id was presented.
    #[error("no certificate presented")]
    NoCertificate,

    /// The certificate id does not fit in 256 bits.
    #[error("certificate id too long")]
    InvalidId,

    /// The root CA or its holder could not be read.
    #[error("root CA unavailable: {0}")]
    RootCaUnavailable(String),

    /// The root CA is outside its validity window.
    #[error("ca certificate has expired")]
    RootCaExpired,

    /// The CA holder presented a certificate other than the CA, or someone
    /// other than the holder presented the CA.
    #[error("you have no authority to call this certificate")]
    NotCaAuthority,

    /// No record exists for the certificate id.
    #[error("certificate {0} does not exist")]
    NotFound(String),

    /// The record belongs to someone else.
    #[error("you have no authority to use this certificate")]
    NotHolder,

    /// Stored bytes could not be decoded.
    #[error("malformed certificate: {0}")]
    Malformed(String),

    /// The certificate is outside its validity window.
    #[error("certificate {0} has expired")]
    Expired(String),

    /// An issuer in the chain is outside its validity window.
    #[error("intermediate certificate ({0}) has expired")]
    IntermediateExpired(String),

    /// An issuer in the chain has been revoked.
    #[error("intermediate certificate ({0}) has been revoked")]
    IntermediateRevoked(String),

    /// The chain did not reach the root within [`MAX_CHAIN_DEPTH`] links.
    #[error("certificate chain does not reach the root CA")]
    ChainTooLong,

    /// No usable revocation time exists for the certificate.
    #[error("certificate {0} has no revocation record")]
    RevocationUnknown(String),

    /// The certificate has been revoked.
    #[error("certificate {serial} has been revoked at {at}")]
    Revoked {
        /// Serial of the revoked certificate.
        serial: String,
        /// Revocation time, Unix seconds.
        at: i64,
    },

    /// A store read failed.
    #[error("certificate lookup failed: {0}")]
    Lookup(String),
}

impl From<ShimError> for CertRejection {
    fn from(e: ShimError) -> Self {
        Self::Lookup(e.to_string())
    }
}

// =============================================================================
// VALIDATOR
// =============================================================================

/// Certificate chain validator over a store and a decoder.
pub struct CertificateValidator<'a> {
    store: &'a dyn CertificateStore,
    decoder: &'a dyn CertificateDecoder,
}

impl<'a> CertificateValidator<'a> {
    /// Bind a validator to its collaborators.
    pub fn new(store: &'a dyn CertificateStore, decoder: &'a dyn CertificateDecoder) -> Self {
        Self { store, decoder }
    }

    /// Check that `caller` may use certificate `cert_id` at time `now`
    /// (Unix seconds).
    ///
    /// # Errors
    ///
    /// The first [`CertRejection`] encountered.
    pub async fn validate(&self, caller: &str, cert_id: &[u8], now: i64) -> Result<(), CertRejection> {
        if cert_id.is_empty() {
            return Err(CertRejection::NoCertificate);
        }
        let id = id_to_decimal(cert_id).ok_or(CertRejection::InvalidId)?;

        // Root CA must be live.
        let root = self.root_ca().await?;
        if !root.is_valid_at(now) {
            return Err(CertRejection::RootCaExpired);
        }

        // The CA holder may only use the CA, and only the holder may.
        let holder = self.root_holder().await?;
        match (caller == holder, id == root.serial) {
            (true, true) => return Ok(()),
            (true, false) | (false, true) => return Err(CertRejection::NotCaAuthority),
            (false, false) => {}
        }

        let record = self.record(&id).await?.ok_or_else(|| CertRejection::NotFound(id.clone()))?;
        if record.holder != caller {
            return Err(CertRejection::NotHolder);
        }

        let leaf = self.decode(&record.raw)?;
        if !leaf.is_valid_at(now) {
            return Err(CertRejection::Expired(leaf.serial));
        }

        self.check_chain(&root.subject_cn, &leaf, now).await?;

        // Leaf revocation: server namespace first, then member.
        let revoked_at = match self.revocation_time(&keys::cert_server(caller, &leaf.serial)).await? {
            Some(at) => at,
            None => self
                .revocation_time(&keys::cert_member(caller, &leaf.serial))
                .await?
                .ok_or_else(|| CertRejection::RevocationUnknown(leaf.serial.clone()))?,
        };
        if revoked_at < now {
            return Err(CertRejection::Revoked {
                serial: leaf.serial,
                at: revoked_at,
            });
        }

        debug!(caller = caller, serial = %leaf.serial, "Certificate accepted");
        Ok(())
    }

    async fn root_ca(&self) -> Result<DecodedCertificate, CertRejection> {
        let raw = self.store.get_cert_state(keys::ROOT_CA_BYTES).await?;
        if raw.is_empty() {
            return Err(CertRejection::RootCaUnavailable("no root CA certificate".into()));
        }
        self.decoder.decode(&raw).map_err(CertRejection::RootCaUnavailable)
    }

    async fn root_holder(&self) -> Result<String, CertRejection> {
        let raw = self.store.get_cert_state(keys::ROOT_CA_HOLDER).await?;
        if raw.is_empty() {
            return Err(CertRejection::RootCaUnavailable("no root CA holder".into()));
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    async fn record(&self, id: &str) -> Result<Option<CertBytesInfo>, CertRejection> {
        let raw = self.store.get_cert_state(&keys::cert_bytes(id)).await?;
        if raw.is_empty() {
            return Ok(None);
        }
        codec::from_json("CertBytesInfo", &raw)
            .map(Some)
            .map_err(|e| CertRejection::Malformed(e.to_string()))
    }

    fn decode(&self, raw: &[u8]) -> Result<DecodedCertificate, CertRejection> {
        self.decoder.decode(raw).map_err(CertRejection::Malformed)
    }

    /// Walk issuer links upward from `leaf` until the root's subject.
    async fn check_chain(&self, root_cn: &str, leaf: &DecodedCertificate, now: i64) -> Result<(), CertRejection> {
        let mut subject = leaf.issuer_cn.clone();

        for _ in 0..MAX_CHAIN_DEPTH {
            if subject == root_cn {
                return Ok(());
            }
            let link = self.store.get_cert_state(&keys::cert_subject(&subject)).await?;
            if link.is_empty() {
                return Ok(());
            }
            let id = id_to_decimal(&link).ok_or(CertRejection::InvalidId)?;
            let record = self.record(&id).await?.ok_or_else(|| CertRejection::NotFound(id.clone()))?;
            let issuer = self.decode(&record.raw)?;

            if !issuer.is_valid_at(now) {
                return Err(CertRejection::IntermediateExpired(issuer.serial));
            }
            match self
                .revocation_time(&keys::cert_server(&record.holder, &issuer.serial))
                .await?
            {
                Some(at) if at >= now => {}
                _ => return Err(CertRejection::IntermediateRevoked(issuer.serial)),
            }

            subject = issuer.issuer_cn;
        }

        Err(CertRejection::ChainTooLong)
    }

    /// Revocation time under `key`; `None` if absent or not eight bytes.
    async fn revocation_time(&self, key: &str) -> Result<Option<i64>, CertRejection> {
        let raw = self.store.get_cert_state(key).await?;
        Ok(<[u8; 8]>::try_from(raw.as_slice()).ok().map(i64::from_be_bytes))
    }
}
