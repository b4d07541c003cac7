//! PDF encryption support.
//!
//! This module implements the Standard Security Handler according to the PDF
//! specification (ISO 32000-1:2008, Section 7.6) at revisions 2, 3, and 4:
//!
//! - RC4 encryption (40-bit and 128-bit) for PDF 1.4-1.5
//! - AES-128 encryption in CBC mode for PDF 1.6+ (crypt filters)
//! - Password validation (owner and user) and permission flags
//!
//! # Reading
//!
//! Build an [`EncryptionHandler`] from the `/Encrypt` dictionary and the first
//! element of the trailer `/ID` array, then [`validate`](EncryptionHandler::validate)
//! a password. On success the handler decrypts strings and streams in place.
//!
//! # Writing
//!
//! [`EncryptDictBuilder`] computes the `/O`, `/U`, and `/P` entries for a
//! chosen [`SecurityLevel`]; [`EncryptionWriteHandler`] encrypts each outbound
//! indirect object. The encryption dictionary itself is written unencrypted.
//!
//! # References
//!
//! - PDF Spec Section 7.6.2: General Encryption Algorithm
//! - PDF Spec Section 7.6.3: Standard Security Handler
//! - PDF Spec Section 7.6.5: Crypt Filters

use crate::error::{Error, Result};
use crate::object::Object;

mod aes;
mod algorithms;
mod handler;
mod rc4;
mod write_handler;

pub use handler::{EncryptionHandler, PasswordOutcome};
pub use write_handler::{generate_file_id, EncryptDictBuilder, EncryptionWriteHandler};

/// Security level used when arming encryption for a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    /// No encryption
    None,
    /// RC4 with 40-bit key (PDF 1.4, V=1, R=2)
    Rc4_40,
    /// RC4 with 128-bit key (PDF 1.5, V=2, R=3)
    Rc4_128,
    /// AES with 128-bit key in CBC mode (PDF 1.6, V=4, R=4)
    Aes128,
}

impl SecurityLevel {
    /// Get the file key length in bytes for this level.
    pub fn key_length(&self) -> usize {
        match self {
            SecurityLevel::None => 0,
            SecurityLevel::Rc4_40 => 5,   // 40 bits
            SecurityLevel::Rc4_128 => 16, // 128 bits
            SecurityLevel::Aes128 => 16,  // 128 bits
        }
    }

    /// Check if this level uses AES.
    pub fn is_aes(&self) -> bool {
        matches!(self, SecurityLevel::Aes128)
    }

    /// The (V, R) version/revision pair written to the encryption dictionary.
    pub fn version_revision(&self) -> (u32, u32) {
        match self {
            SecurityLevel::None => (0, 0),
            SecurityLevel::Rc4_40 => (1, 2),
            SecurityLevel::Rc4_128 => (2, 3),
            SecurityLevel::Aes128 => (4, 4),
        }
    }
}

/// Crypt filter method of the `/StdCF` entry (V=4 only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptFilterMethod {
    /// RC4 with a 16-byte key
    V2,
    /// AES-128 in CBC mode with a prepended IV
    AesV2,
}

impl CryptFilterMethod {
    /// The `/CFM` name for this method.
    pub fn as_name(&self) -> &'static str {
        match self {
            CryptFilterMethod::V2 => "V2",
            CryptFilterMethod::AesV2 => "AESV2",
        }
    }

    fn from_name(name: &str) -> Result<Self> {
        match name {
            "V2" => Ok(CryptFilterMethod::V2),
            "AESV2" => Ok(CryptFilterMethod::AesV2),
            other => Err(Error::UnsupportedCryptFilter(format!("CFM /{}", other))),
        }
    }
}

/// PDF encryption dictionary (/Encrypt entry in trailer).
///
/// PDF Spec: Section 7.6.1 - General
#[derive(Debug, Clone)]
pub struct EncryptDict {
    /// Filter name (must be "Standard")
    pub filter: String,
    /// Algorithm version (V): 1=RC4-40, 2=RC4-128, 4=crypt filters
    pub version: u32,
    /// Revision number (R): 2, 3, or 4
    pub revision: u32,
    /// Key length in bits (Length): 40 for V=1, 128 for V=2/V=4
    pub length: Option<u32>,
    /// Owner key (O): exactly 32 bytes
    pub owner_key: Vec<u8>,
    /// User key (U): exactly 32 bytes
    pub user_key: Vec<u8>,
    /// User access permissions (P): signed 32-bit flag word
    pub permissions: i32,
    /// Encrypt metadata flag (EncryptMetadata): recorded, no behavioral effect
    pub encrypt_metadata: bool,
    /// `/StdCF` crypt filter method (V=4 only)
    pub crypt_filter: Option<CryptFilterMethod>,
    /// Default stream crypt filter name (StmF, V=4 only)
    pub stream_filter: Option<String>,
    /// Default string crypt filter name (StrF, V=4 only)
    pub string_filter: Option<String>,
}

impl EncryptDict {
    /// Parse an encryption dictionary from a PDF object.
    ///
    /// Validates the preconditions of the Standard Security Handler:
    /// `/Filter /Standard`, `V` in 1..=4, `R` in {2, 3, 4}, 32-byte `/O` and
    /// `/U`, and for R=4 a `/StdCF` crypt filter with `CFM` V2 or AESV2 whose
    /// `AuthEvent` (if present) is `/DocOpen`.
    pub fn from_object(obj: &Object) -> Result<Self> {
        let dict = obj.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: obj.type_name().to_string(),
        })?;

        let filter = dict
            .get("Filter")
            .and_then(|o| o.as_name())
            .ok_or_else(|| Error::InvalidEncryptDict("missing /Filter".to_string()))?
            .to_string();
        if filter != "Standard" {
            return Err(Error::UnknownEncryption(format!("filter /{}", filter)));
        }

        let version = dict
            .get("V")
            .and_then(|o| o.as_integer())
            .ok_or_else(|| Error::InvalidEncryptDict("missing /V".to_string()))?
            as u32;
        if !(1..=4).contains(&version) {
            return Err(Error::UnknownEncryption(format!("V={}", version)));
        }

        let revision = dict
            .get("R")
            .and_then(|o| o.as_integer())
            .ok_or_else(|| Error::InvalidEncryptDict("missing /R".to_string()))?
            as u32;
        if !(2..=4).contains(&revision) {
            return Err(Error::UnsupportedRevision(revision));
        }

        let owner_key = dict
            .get("O")
            .and_then(|o| o.as_string())
            .ok_or_else(|| Error::InvalidEncryptDict("missing /O".to_string()))?
            .to_vec();
        let user_key = dict
            .get("U")
            .and_then(|o| o.as_string())
            .ok_or_else(|| Error::InvalidEncryptDict("missing /U".to_string()))?
            .to_vec();
        if owner_key.len() != 32 || user_key.len() != 32 {
            return Err(Error::InvalidEncryptDict(format!(
                "/O and /U must be 32 bytes, got {} and {}",
                owner_key.len(),
                user_key.len()
            )));
        }

        let permissions = dict
            .get("P")
            .and_then(|o| o.as_integer())
            .ok_or_else(|| Error::InvalidEncryptDict("missing /P".to_string()))?
            as i32;

        let length = dict.get("Length").and_then(|o| o.as_integer()).map(|l| l as u32);

        let encrypt_metadata = dict
            .get("EncryptMetadata")
            .and_then(|o| o.as_bool())
            .unwrap_or(true);

        let (crypt_filter, stream_filter, string_filter) = if revision == 4 {
            let cfm = Self::parse_std_crypt_filter(dict)?;
            let stmf = Self::parse_filter_name(dict, "StmF")?;
            let strf = Self::parse_filter_name(dict, "StrF")?;
            (Some(cfm), Some(stmf), Some(strf))
        } else {
            (None, None, None)
        };

        Ok(EncryptDict {
            filter,
            version,
            revision,
            length,
            owner_key,
            user_key,
            permissions,
            encrypt_metadata,
            crypt_filter,
            stream_filter,
            string_filter,
        })
    }

    /// Parse and validate the `/CF /StdCF` entry of an R=4 dictionary.
    fn parse_std_crypt_filter(
        dict: &std::collections::HashMap<String, Object>,
    ) -> Result<CryptFilterMethod> {
        let cf = dict
            .get("CF")
            .and_then(|o| o.as_dict())
            .ok_or_else(|| Error::UnsupportedCryptFilter("missing /CF dictionary".to_string()))?;
        let std_cf = cf
            .get("StdCF")
            .and_then(|o| o.as_dict())
            .ok_or_else(|| Error::UnsupportedCryptFilter("missing /StdCF entry".to_string()))?;

        let cfm = std_cf
            .get("CFM")
            .and_then(|o| o.as_name())
            .ok_or_else(|| Error::UnsupportedCryptFilter("StdCF missing /CFM".to_string()))?;
        let method = CryptFilterMethod::from_name(cfm)?;

        // AuthEvent defaults to /DocOpen when absent.
        if let Some(event) = std_cf.get("AuthEvent").and_then(|o| o.as_name()) {
            if event != "DocOpen" {
                return Err(Error::UnsupportedCryptFilter(format!("AuthEvent /{}", event)));
            }
        }

        Ok(method)
    }

    /// Parse a `/StmF` or `/StrF` entry; both must reference `/StdCF`.
    fn parse_filter_name(
        dict: &std::collections::HashMap<String, Object>,
        key: &str,
    ) -> Result<String> {
        let name = dict
            .get(key)
            .and_then(|o| o.as_name())
            .ok_or_else(|| Error::UnsupportedCryptFilter(format!("missing /{}", key)))?;
        if name != "StdCF" {
            return Err(Error::UnsupportedCryptFilter(format!("/{} /{}", key, name)));
        }
        Ok(name.to_string())
    }

    /// Materialize the dictionary as a PDF object for the writer.
    ///
    /// The writer must emit this object without encrypting it: its fields are
    /// the key material.
    pub fn to_object(&self) -> Object {
        let mut dict = std::collections::HashMap::new();
        dict.insert("Filter".to_string(), Object::Name(self.filter.clone()));
        dict.insert("V".to_string(), Object::Integer(self.version as i64));
        dict.insert("R".to_string(), Object::Integer(self.revision as i64));
        if let Some(length) = self.length {
            dict.insert("Length".to_string(), Object::Integer(length as i64));
        }
        dict.insert("O".to_string(), Object::String(self.owner_key.clone()));
        dict.insert("U".to_string(), Object::String(self.user_key.clone()));
        dict.insert("P".to_string(), Object::Integer(self.permissions as i64));

        if self.version == 4 {
            if let Some(method) = self.crypt_filter {
                let mut std_cf = std::collections::HashMap::new();
                std_cf.insert("CFM".to_string(), Object::Name(method.as_name().to_string()));
                // Crypt filter Length is expressed in bytes.
                std_cf.insert("Length".to_string(), Object::Integer(16));
                std_cf.insert("AuthEvent".to_string(), Object::Name("DocOpen".to_string()));

                let mut cf = std::collections::HashMap::new();
                cf.insert("StdCF".to_string(), Object::Dictionary(std_cf));
                dict.insert("CF".to_string(), Object::Dictionary(cf));
            }
            dict.insert(
                "StmF".to_string(),
                Object::Name(self.stream_filter.clone().unwrap_or_else(|| "StdCF".to_string())),
            );
            dict.insert(
                "StrF".to_string(),
                Object::Name(self.string_filter.clone().unwrap_or_else(|| "StdCF".to_string())),
            );
            dict.insert("EncryptMetadata".to_string(), Object::Boolean(self.encrypt_metadata));
        }

        Object::Dictionary(dict)
    }

    /// Whether the strong (R>=3) derivation branch applies.
    pub fn is_strong(&self) -> bool {
        self.revision >= 3
    }

    /// File key length in bytes: 5 for R=2, 16 for R=3/R=4.
    ///
    /// The key length follows the revision; the dictionary `/Length` entry is
    /// recorded but not trusted for derivation.
    pub fn key_length_bytes(&self) -> usize {
        if self.revision == 2 {
            5
        } else {
            16
        }
    }

    /// Whether object payloads are enciphered with AES rather than RC4.
    pub fn uses_aes(&self) -> bool {
        matches!(self.crypt_filter, Some(CryptFilterMethod::AesV2))
    }
}

/// PDF encryption permissions (the P field).
///
/// PDF Spec: Table 22 - User access permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    /// Print the document (bit 3)
    pub print: bool,
    /// Modify contents (bit 4)
    pub modify: bool,
    /// Copy text and graphics (bit 5)
    pub copy: bool,
    /// Add or modify annotations (bit 6)
    pub annotate: bool,
    /// Fill in form fields (bit 9, R>=3)
    pub fill_forms: bool,
    /// Extract for accessibility (bit 10, R>=3)
    pub accessibility: bool,
    /// Assemble the document (bit 11, R>=3)
    pub assemble: bool,
    /// Print at high resolution (bit 12, R>=3)
    pub print_high_quality: bool,
}

impl Permissions {
    /// All permissions granted.
    pub fn all() -> Self {
        Self {
            print: true,
            modify: true,
            copy: true,
            annotate: true,
            fill_forms: true,
            accessibility: true,
            assemble: true,
            print_high_quality: true,
        }
    }

    /// View-only: everything withheld except accessibility extraction.
    pub fn read_only() -> Self {
        Self {
            print: false,
            modify: false,
            copy: false,
            annotate: false,
            fill_forms: false,
            accessibility: true,
            assemble: false,
            print_high_quality: false,
        }
    }

    /// Encode as the raw P flag word (reserved bits unset; the dictionary
    /// builder normalizes them).
    pub fn to_bits(&self) -> i32 {
        let mut bits = 0i32;
        if self.print {
            bits |= 1 << 2;
        }
        if self.modify {
            bits |= 1 << 3;
        }
        if self.copy {
            bits |= 1 << 4;
        }
        if self.annotate {
            bits |= 1 << 5;
        }
        if self.fill_forms {
            bits |= 1 << 8;
        }
        if self.accessibility {
            bits |= 1 << 9;
        }
        if self.assemble {
            bits |= 1 << 10;
        }
        if self.print_high_quality {
            bits |= 1 << 11;
        }
        bits
    }

    /// Decode a raw P flag word.
    pub fn from_bits(bits: i32) -> Self {
        Self {
            print: bits & (1 << 2) != 0,
            modify: bits & (1 << 3) != 0,
            copy: bits & (1 << 4) != 0,
            annotate: bits & (1 << 5) != 0,
            fill_forms: bits & (1 << 8) != 0,
            accessibility: bits & (1 << 9) != 0,
            assemble: bits & (1 << 10) != 0,
            print_high_quality: bits & (1 << 11) != 0,
        }
    }

    /// Check if printing is allowed.
    pub fn can_print(&self) -> bool {
        self.print
    }

    /// Check if modifying the document is allowed.
    pub fn can_modify(&self) -> bool {
        self.modify
    }

    /// Check if copying text/graphics is allowed.
    pub fn can_copy(&self) -> bool {
        self.copy
    }

    /// Check if adding/modifying annotations is allowed.
    pub fn can_annotate(&self) -> bool {
        self.annotate
    }

    /// Check if filling form fields is allowed (R>=3).
    pub fn can_fill_forms(&self) -> bool {
        self.fill_forms
    }

    /// Check if content extraction for accessibility is allowed (R>=3).
    pub fn can_extract_accessibility(&self) -> bool {
        self.accessibility
    }

    /// Check if assembling the document is allowed (R>=3).
    pub fn can_assemble(&self) -> bool {
        self.assemble
    }

    /// Check if high-quality printing is allowed (R>=3).
    pub fn can_print_high_quality(&self) -> bool {
        self.print_high_quality
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_dict(revision: i64, version: i64) -> std::collections::HashMap<String, Object> {
        let mut dict = std::collections::HashMap::new();
        dict.insert("Filter".to_string(), Object::Name("Standard".to_string()));
        dict.insert("V".to_string(), Object::Integer(version));
        dict.insert("R".to_string(), Object::Integer(revision));
        dict.insert("O".to_string(), Object::String(vec![0; 32]));
        dict.insert("U".to_string(), Object::String(vec![0; 32]));
        dict.insert("P".to_string(), Object::Integer(-4));
        dict
    }

    #[test]
    fn test_parse_r2_dict() {
        let dict = EncryptDict::from_object(&Object::Dictionary(minimal_dict(2, 1))).unwrap();
        assert_eq!(dict.revision, 2);
        assert_eq!(dict.key_length_bytes(), 5);
        assert!(!dict.is_strong());
        assert!(!dict.uses_aes());
    }

    #[test]
    fn test_parse_r3_dict() {
        let dict = EncryptDict::from_object(&Object::Dictionary(minimal_dict(3, 2))).unwrap();
        assert_eq!(dict.key_length_bytes(), 16);
        assert!(dict.is_strong());
    }

    #[test]
    fn test_parse_rejects_foreign_filter() {
        let mut raw = minimal_dict(2, 1);
        raw.insert("Filter".to_string(), Object::Name("PubSec".to_string()));
        let err = EncryptDict::from_object(&Object::Dictionary(raw)).unwrap_err();
        assert!(matches!(err, Error::UnknownEncryption(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_version() {
        let mut raw = minimal_dict(2, 5);
        raw.insert("V".to_string(), Object::Integer(5));
        let err = EncryptDict::from_object(&Object::Dictionary(raw)).unwrap_err();
        assert!(matches!(err, Error::UnknownEncryption(_)));
    }

    #[test]
    fn test_parse_rejects_unsupported_revision() {
        let raw = minimal_dict(6, 4);
        let err = EncryptDict::from_object(&Object::Dictionary(raw)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedRevision(6)));
    }

    #[test]
    fn test_parse_rejects_short_keys() {
        let mut raw = minimal_dict(2, 1);
        raw.insert("O".to_string(), Object::String(vec![0; 16]));
        let err = EncryptDict::from_object(&Object::Dictionary(raw)).unwrap_err();
        assert!(matches!(err, Error::InvalidEncryptDict(_)));
    }

    #[test]
    fn test_parse_r4_requires_crypt_filter() {
        let raw = minimal_dict(4, 4);
        let err = EncryptDict::from_object(&Object::Dictionary(raw)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCryptFilter(_)));
    }

    fn r4_dict(cfm: &str, auth_event: Option<&str>) -> std::collections::HashMap<String, Object> {
        let mut std_cf = std::collections::HashMap::new();
        std_cf.insert("CFM".to_string(), Object::Name(cfm.to_string()));
        std_cf.insert("Length".to_string(), Object::Integer(16));
        if let Some(event) = auth_event {
            std_cf.insert("AuthEvent".to_string(), Object::Name(event.to_string()));
        }
        let mut cf = std::collections::HashMap::new();
        cf.insert("StdCF".to_string(), Object::Dictionary(std_cf));

        let mut raw = minimal_dict(4, 4);
        raw.insert("CF".to_string(), Object::Dictionary(cf));
        raw.insert("StmF".to_string(), Object::Name("StdCF".to_string()));
        raw.insert("StrF".to_string(), Object::Name("StdCF".to_string()));
        raw
    }

    #[test]
    fn test_parse_r4_aesv2() {
        let dict = EncryptDict::from_object(&Object::Dictionary(r4_dict("AESV2", None))).unwrap();
        assert_eq!(dict.crypt_filter, Some(CryptFilterMethod::AesV2));
        assert!(dict.uses_aes());
        assert_eq!(dict.key_length_bytes(), 16);
    }

    #[test]
    fn test_parse_r4_v2_is_rc4() {
        let dict = EncryptDict::from_object(&Object::Dictionary(r4_dict("V2", Some("DocOpen"))))
            .unwrap();
        assert_eq!(dict.crypt_filter, Some(CryptFilterMethod::V2));
        assert!(!dict.uses_aes());
    }

    #[test]
    fn test_parse_r4_rejects_unknown_cfm() {
        let err =
            EncryptDict::from_object(&Object::Dictionary(r4_dict("AESV3", None))).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCryptFilter(_)));
    }

    #[test]
    fn test_parse_r4_rejects_foreign_auth_event() {
        let err = EncryptDict::from_object(&Object::Dictionary(r4_dict("AESV2", Some("EFOpen"))))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedCryptFilter(_)));
    }

    #[test]
    fn test_to_object_round_trips() {
        let dict = EncryptDict::from_object(&Object::Dictionary(r4_dict("AESV2", None))).unwrap();
        let reparsed = EncryptDict::from_object(&dict.to_object()).unwrap();
        assert_eq!(reparsed.version, 4);
        assert_eq!(reparsed.revision, 4);
        assert_eq!(reparsed.crypt_filter, Some(CryptFilterMethod::AesV2));
        assert_eq!(reparsed.owner_key, dict.owner_key);
        assert_eq!(reparsed.user_key, dict.user_key);
        assert_eq!(reparsed.permissions, dict.permissions);
    }

    #[test]
    fn test_security_level_key_lengths() {
        assert_eq!(SecurityLevel::Rc4_40.key_length(), 5);
        assert_eq!(SecurityLevel::Rc4_128.key_length(), 16);
        assert_eq!(SecurityLevel::Aes128.key_length(), 16);
        assert!(SecurityLevel::Aes128.is_aes());
        assert!(!SecurityLevel::Rc4_128.is_aes());
    }

    #[test]
    fn test_security_level_version_revision() {
        assert_eq!(SecurityLevel::Rc4_40.version_revision(), (1, 2));
        assert_eq!(SecurityLevel::Rc4_128.version_revision(), (2, 3));
        assert_eq!(SecurityLevel::Aes128.version_revision(), (4, 4));
    }

    #[test]
    fn test_permissions_bits_round_trip() {
        let perms = Permissions::all();
        let bits = perms.to_bits();
        assert!(bits & (1 << 2) != 0); // print
        assert!(bits & (1 << 3) != 0); // modify
        assert!(bits & (1 << 4) != 0); // copy
        assert!(bits & (1 << 5) != 0); // annotate
        assert!(bits & (1 << 8) != 0); // fill_forms
        assert!(bits & (1 << 9) != 0); // accessibility
        assert!(bits & (1 << 10) != 0); // assemble
        assert!(bits & (1 << 11) != 0); // print_high_quality
        assert_eq!(Permissions::from_bits(bits), perms);
    }

    #[test]
    fn test_permissions_read_only() {
        let bits = Permissions::read_only().to_bits();
        assert!(bits & (1 << 2) == 0);
        assert!(bits & (1 << 3) == 0);
        assert!(bits & (1 << 9) != 0); // accessibility stays on
    }

    #[test]
    fn test_permissions_accessors() {
        let perms = Permissions::from_bits(Permissions::read_only().to_bits());
        assert!(!perms.can_print());
        assert!(!perms.can_modify());
        assert!(!perms.can_copy());
        assert!(!perms.can_annotate());
        assert!(!perms.can_fill_forms());
        assert!(perms.can_extract_accessibility());
        assert!(!perms.can_assemble());
        assert!(!perms.can_print_high_quality());

        let everything = Permissions::all();
        assert!(everything.can_print());
        assert!(everything.can_annotate());
        assert!(everything.can_print_high_quality());
    }
}
