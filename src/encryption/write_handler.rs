//! Encryption handler for writing encrypted PDFs.
//!
//! [`EncryptDictBuilder`] arms encryption for a save: it normalizes the
//! permission flags, derives the O and U entries, and produces the
//! [`EncryptDict`] the writer emits (unencrypted — its fields are the key
//! material). [`EncryptionWriteHandler`] then encrypts each outbound indirect
//! object with its per-object key.

use md5::{Digest, Md5};

use super::algorithms;
use super::{CryptFilterMethod, EncryptDict, SecurityLevel};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};

/// Builder for the `/Encrypt` dictionary of a document being saved.
///
/// | Level    | V | R | Length | Cipher |
/// |----------|---|---|--------|--------|
/// | Rc4_40   | 1 | 2 | 40     | RC4    |
/// | Rc4_128  | 2 | 3 | 128    | RC4    |
/// | Aes128   | 4 | 4 | 128    | AES    |
#[derive(Debug, Clone)]
pub struct EncryptDictBuilder {
    level: SecurityLevel,
    user_password: Vec<u8>,
    owner_password: Vec<u8>,
    permissions: i32,
    encrypt_metadata: bool,
}

impl EncryptDictBuilder {
    /// Start a builder for the given security level.
    pub fn new(level: SecurityLevel) -> Self {
        Self {
            level,
            user_password: Vec::new(),
            owner_password: Vec::new(),
            permissions: super::Permissions::all().to_bits(),
            encrypt_metadata: true,
        }
    }

    /// Set the user password (raw-encoded bytes; empty means none).
    pub fn user_password(mut self, password: &[u8]) -> Self {
        self.user_password = password.to_vec();
        self
    }

    /// Set the owner password. When empty, the user password is used, so a
    /// document armed with two empty passwords pads both to the standard
    /// padding string and is effectively unprotected.
    pub fn owner_password(mut self, password: &[u8]) -> Self {
        self.owner_password = password.to_vec();
        self
    }

    /// Set the raw P flag word (see [`Permissions::to_bits`](super::Permissions::to_bits)).
    /// Reserved bits are normalized during [`build`](Self::build).
    pub fn permissions(mut self, permissions: i32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Record the EncryptMetadata flag. Informational only: metadata streams
    /// are transformed like any other stream.
    pub fn encrypt_metadata(mut self, encrypt_metadata: bool) -> Self {
        self.encrypt_metadata = encrypt_metadata;
        self
    }

    /// Compute the encryption dictionary for the given file identifier
    /// (first element of the `/ID` array).
    pub fn build(&self, file_id: &[u8]) -> Result<EncryptDict> {
        if self.level == SecurityLevel::None {
            return Err(Error::InvalidEncryptDict(
                "cannot build an encryption dictionary without a security level".to_string(),
            ));
        }

        let (version, revision) = self.level.version_revision();
        let key_length = self.level.key_length();
        let strong = revision >= 3;

        // Reserved permission bits are forced on, and the two low bits
        // (reserved, must be 0) are cleared.
        let reserved = if strong { 0xFFFF_F0C0u32 } else { 0xFFFF_FFC0u32 };
        let permissions = ((self.permissions as u32 | reserved) & 0xFFFF_FFFC) as i32;

        let owner_key = algorithms::compute_owner_key(
            &self.owner_password,
            &self.user_password,
            revision,
            key_length,
        );
        let encryption_key = algorithms::compute_encryption_key(
            &self.user_password,
            &owner_key,
            permissions,
            file_id,
            revision,
            key_length,
        );
        let user_key = algorithms::compute_user_key(&encryption_key, file_id, revision);

        let (crypt_filter, stream_filter, string_filter) = if version == 4 {
            (
                Some(CryptFilterMethod::AesV2),
                Some("StdCF".to_string()),
                Some("StdCF".to_string()),
            )
        } else {
            (None, None, None)
        };

        Ok(EncryptDict {
            filter: "Standard".to_string(),
            version,
            revision,
            length: Some(if self.level == SecurityLevel::Rc4_40 { 40 } else { 128 }),
            owner_key,
            user_key,
            permissions,
            encrypt_metadata: self.encrypt_metadata,
            crypt_filter,
            stream_filter,
            string_filter,
        })
    }
}

impl Drop for EncryptDictBuilder {
    fn drop(&mut self) {
        self.user_password.fill(0);
        self.owner_password.fill(0);
    }
}

/// Handler for encrypting PDF objects during write operations.
pub struct EncryptionWriteHandler {
    /// The file key derived from the user password
    encryption_key: Vec<u8>,
    /// The security level in use
    level: SecurityLevel,
    /// Recorded EncryptMetadata flag
    encrypt_metadata: bool,
}

impl EncryptionWriteHandler {
    /// Create a new encryption write handler.
    ///
    /// `owner_key` and `permissions` come from the built [`EncryptDict`];
    /// the file key is derived here from the user password branch.
    pub fn new(
        user_password: &[u8],
        owner_key: &[u8],
        permissions: i32,
        file_id: &[u8],
        level: SecurityLevel,
        encrypt_metadata: bool,
    ) -> Self {
        let (_, revision) = level.version_revision();
        let encryption_key = algorithms::compute_encryption_key(
            user_password,
            owner_key,
            permissions,
            file_id,
            revision,
            level.key_length(),
        );

        Self {
            encryption_key,
            level,
            encrypt_metadata,
        }
    }

    /// Create a handler from an already derived file key.
    pub fn from_key(encryption_key: Vec<u8>, level: SecurityLevel, encrypt_metadata: bool) -> Self {
        Self {
            encryption_key,
            level,
            encrypt_metadata,
        }
    }

    /// Encrypt a string payload for object `(obj_num, gen_num)`.
    pub fn encrypt_string(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        self.encrypt_bytes(data, obj_num, gen_num)
    }

    /// Encrypt a stream payload for object `(obj_num, gen_num)`.
    ///
    /// For AES the result carries a fresh random IV in its first 16 bytes and
    /// is at least 16 bytes longer than the plaintext after padding.
    pub fn encrypt_stream(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        self.encrypt_bytes(data, obj_num, gen_num)
    }

    fn encrypt_bytes(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        if self.level == SecurityLevel::None || data.is_empty() {
            return Ok(data.to_vec());
        }
        let key = self.object_key(obj_num, gen_num);
        self.apply_key(&key, data)
    }

    /// Encrypt one outbound indirect object in place.
    ///
    /// Same traversal as decryption: strings and stream payloads are replaced
    /// with ciphertext, containers are walked recursively, cross-reference
    /// streams pass through untouched. The encryption dictionary's own object
    /// must not be routed through here.
    pub fn encrypt_object(&self, obj_ref: ObjectRef, obj: &mut Object) -> Result<()> {
        if self.level == SecurityLevel::None || obj.has_type("XRef") {
            return Ok(());
        }
        log::debug!("Encrypting object {}", obj_ref);
        let key = self.object_key(obj_ref.id, obj_ref.gen);
        self.walk(obj, &key)
    }

    fn walk(&self, obj: &mut Object, key: &[u8]) -> Result<()> {
        match obj {
            Object::String(data) => {
                if !data.is_empty() {
                    *data = self.apply_key(key, data)?;
                }
                Ok(())
            }
            Object::Array(items) => {
                for item in items {
                    self.walk(item, key)?;
                }
                Ok(())
            }
            Object::Dictionary(entries) => {
                for value in entries.values_mut() {
                    self.walk(value, key)?;
                }
                Ok(())
            }
            Object::Stream { dict, data } => {
                for value in dict.values_mut() {
                    self.walk(value, key)?;
                }
                if !data.is_empty() {
                    *data = self.apply_key(key, data)?.into();
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn apply_key(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        if self.level.is_aes() {
            super::aes::aes128_encrypt(key, data)
        } else {
            Ok(super::rc4::rc4_crypt(key, data))
        }
    }

    /// Derive the per-object key (Algorithm 1) for `(obj_num, gen_num)`.
    fn object_key(&self, obj_num: u32, gen_num: u16) -> Vec<u8> {
        algorithms::compute_object_key(&self.encryption_key, obj_num, gen_num, self.level.is_aes())
    }

    /// The security level in use.
    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// The recorded EncryptMetadata flag.
    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// Get the file key (for testing purposes).
    #[cfg(test)]
    pub(crate) fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }
}

impl Drop for EncryptionWriteHandler {
    fn drop(&mut self) {
        self.encryption_key.fill(0);
    }
}

/// Generate the two halves of a fresh `/ID` array.
///
/// Each half is an MD5 digest over a random UUID and the current time, which
/// is enough to make identifiers distinct between saves. Document IDs are
/// tie-breakers, not secrets.
pub fn generate_file_id() -> (Vec<u8>, Vec<u8>) {
    let half = || {
        let mut hasher = Md5::new();
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        hasher.update(now.as_nanos().to_le_bytes());
        hasher.finalize().to_vec()
    };
    (half(), half())
}
