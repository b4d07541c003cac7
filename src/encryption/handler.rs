//! Encryption handler for reading encrypted PDFs.
//!
//! The handler is the per-document session: it parses and validates the
//! `/Encrypt` dictionary, classifies a supplied password as owner, user, or
//! invalid, and owns the file key used to decrypt strings and streams in
//! place. One handler per document; handlers are not shared across threads.

use super::algorithms;
use super::{EncryptDict, Permissions};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};

/// Outcome of validating a password against an encrypted document.
///
/// Password validity is a value, not an error: only structural faults in the
/// encryption dictionary surface as [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordOutcome {
    /// The password matched the owner password; full permissions apply.
    Owner,
    /// The password matched the user password; the P flags apply.
    User,
    /// The password matched neither.
    Invalid,
}

/// Main encryption handler for reading PDF documents.
#[derive(Debug)]
pub struct EncryptionHandler {
    /// Parsed encryption dictionary
    dict: EncryptDict,
    /// File identifier (first element of /ID array)
    file_id: Vec<u8>,
    /// Derived file key (set after successful validation)
    encryption_key: Option<Vec<u8>>,
    /// Whether the validated password was the owner password
    has_owner_permissions: bool,
    /// Indirect object holding the encryption dictionary itself, if any;
    /// exempt from decryption
    own_ref: Option<ObjectRef>,
}

impl EncryptionHandler {
    /// Create a new encryption handler from an encryption dictionary.
    ///
    /// `encrypt_obj` is the `/Encrypt` dictionary from the trailer and
    /// `file_id` the first element of the `/ID` array. Fails when the
    /// dictionary names a different security handler, an unsupported
    /// revision, or an unsupported crypt filter.
    pub fn new(encrypt_obj: &Object, file_id: Vec<u8>) -> Result<Self> {
        let dict = EncryptDict::from_object(encrypt_obj)?;

        log::info!(
            "PDF is encrypted with the standard security handler (V={}, R={})",
            dict.version,
            dict.revision
        );

        Ok(Self {
            dict,
            file_id,
            encryption_key: None,
            has_owner_permissions: false,
            own_ref: None,
        })
    }

    /// Record the indirect object the encryption dictionary lives in, so
    /// [`decrypt_document`](Self::decrypt_document) can skip it.
    pub fn with_own_ref(mut self, own_ref: ObjectRef) -> Self {
        self.own_ref = Some(own_ref);
        self
    }

    /// Validate a password and classify it (Algorithms 6 and 7).
    ///
    /// The owner password is tried first, then the user password. On a match
    /// the file key is derived and kept for subsequent decryption; on
    /// [`PasswordOutcome::Invalid`] the session state is unchanged.
    pub fn validate(&mut self, password: &[u8]) -> PasswordOutcome {
        let key_length = self.dict.key_length_bytes();

        if let Some(key) = algorithms::authenticate_owner_password(
            password,
            &self.dict.user_key,
            &self.dict.owner_key,
            self.dict.permissions,
            &self.file_id,
            self.dict.revision,
            key_length,
        ) {
            log::info!("Authenticated with the owner password");
            self.encryption_key = Some(key);
            self.has_owner_permissions = true;
            return PasswordOutcome::Owner;
        }

        if let Some(key) = algorithms::authenticate_user_password(
            password,
            &self.dict.user_key,
            &self.dict.owner_key,
            self.dict.permissions,
            &self.file_id,
            self.dict.revision,
            key_length,
        ) {
            log::info!("Authenticated with the user password");
            self.encryption_key = Some(key);
            self.has_owner_permissions = false;
            return PasswordOutcome::User;
        }

        log::warn!("Password authentication failed");
        PasswordOutcome::Invalid
    }

    /// Check if a password has validated successfully.
    pub fn is_authenticated(&self) -> bool {
        self.encryption_key.is_some()
    }

    /// Whether the validated password was the owner password.
    pub fn has_owner_permissions(&self) -> bool {
        self.has_owner_permissions
    }

    /// Get the file key (if authenticated).
    pub fn encryption_key(&self) -> Option<&[u8]> {
        self.encryption_key.as_deref()
    }

    /// The document permissions carried by the P field.
    pub fn permissions(&self) -> Permissions {
        Permissions::from_bits(self.dict.permissions)
    }

    /// The parsed encryption dictionary.
    pub fn dict(&self) -> &EncryptDict {
        &self.dict
    }

    /// Decrypt a string payload belonging to object `(obj_num, gen_num)`.
    pub fn decrypt_string(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        self.decrypt_bytes(data, obj_num, gen_num)
    }

    /// Decrypt a stream payload belonging to object `(obj_num, gen_num)`.
    ///
    /// Streams must be decrypted before any stream filters are decoded.
    pub fn decrypt_stream(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        self.decrypt_bytes(data, obj_num, gen_num)
    }

    fn decrypt_bytes(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.object_key(obj_num, gen_num)?;
        self.apply_key(&key, data)
    }

    /// Derive the per-object key (Algorithm 1) for `(obj_num, gen_num)`.
    ///
    /// Fails loudly with [`Error::NotAuthenticated`] when no password has
    /// validated; there is no silent pass-through path.
    fn object_key(&self, obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        let key = self.encryption_key.as_ref().ok_or(Error::NotAuthenticated)?;
        Ok(algorithms::compute_object_key(key, obj_num, gen_num, self.dict.uses_aes()))
    }

    /// Decrypt one indirect object in place.
    ///
    /// Installs the per-object key for `obj_ref`, then walks the value:
    /// strings and stream payloads are replaced with their plaintext,
    /// dictionaries and arrays are traversed recursively. Cross-reference
    /// streams (`/Type /XRef`) are exempt, including the strings in their
    /// dictionaries. References are not followed; the caller enumerates every
    /// indirect object exactly once.
    pub fn decrypt_object(&self, obj_ref: ObjectRef, obj: &mut Object) -> Result<()> {
        if obj.has_type("XRef") {
            return Ok(());
        }
        log::debug!("Decrypting object {}", obj_ref);
        let key = self.object_key(obj_ref.id, obj_ref.gen)?;
        self.walk(obj, &key)
    }

    /// Decrypt every supplied indirect object, skipping the encryption
    /// dictionary's own object.
    pub fn decrypt_document<'a, I>(&self, objects: I) -> Result<()>
    where
        I: IntoIterator<Item = (ObjectRef, &'a mut Object)>,
    {
        for (obj_ref, obj) in objects {
            if self.own_ref == Some(obj_ref) {
                continue;
            }
            self.decrypt_object(obj_ref, obj)?;
        }
        Ok(())
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
        if self.dict.uses_aes() {
            super::aes::aes128_decrypt(key, data)
        } else {
            Ok(super::rc4::rc4_crypt(key, data))
        }
    }
}

impl Drop for EncryptionHandler {
    fn drop(&mut self) {
        // Key material does not outlive the session.
        if let Some(key) = self.encryption_key.as_mut() {
            key.fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{EncryptDictBuilder, SecurityLevel};

    const FILE_ID: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    fn handler_for(level: SecurityLevel, user: &[u8], owner: &[u8]) -> EncryptionHandler {
        let dict = EncryptDictBuilder::new(level)
            .user_password(user)
            .owner_password(owner)
            .permissions(-4)
            .build(&FILE_ID)
            .unwrap();
        EncryptionHandler::new(&dict.to_object(), FILE_ID.to_vec()).unwrap()
    }

    #[test]
    fn test_validate_classifies_passwords() {
        let mut handler = handler_for(SecurityLevel::Rc4_128, b"user", b"owner");
        assert_eq!(handler.validate(b"wrong"), PasswordOutcome::Invalid);
        assert!(!handler.is_authenticated());

        assert_eq!(handler.validate(b"user"), PasswordOutcome::User);
        assert!(!handler.has_owner_permissions());

        assert_eq!(handler.validate(b"owner"), PasswordOutcome::Owner);
        assert!(handler.has_owner_permissions());
        assert!(handler.is_authenticated());
    }

    #[test]
    fn test_decrypt_requires_authentication() {
        let handler = handler_for(SecurityLevel::Rc4_40, b"u", b"o");
        let err = handler.decrypt_string(b"ciphertext", 1, 0).unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));

        let mut obj = Object::String(b"ciphertext".to_vec());
        let err = handler.decrypt_object(ObjectRef::new(1, 0), &mut obj).unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
    }

    #[test]
    fn test_empty_payloads_are_skipped() {
        let mut handler = handler_for(SecurityLevel::Aes128, b"u", b"o");
        assert_eq!(handler.validate(b"u"), PasswordOutcome::User);

        assert_eq!(handler.decrypt_string(b"", 1, 0).unwrap(), Vec::<u8>::new());

        let mut obj = Object::String(Vec::new());
        handler.decrypt_object(ObjectRef::new(1, 0), &mut obj).unwrap();
        assert_eq!(obj, Object::String(Vec::new()));
    }

    #[test]
    fn test_xref_stream_exempt() {
        let mut handler = handler_for(SecurityLevel::Rc4_128, b"u", b"o");
        assert_eq!(handler.validate(b"u"), PasswordOutcome::User);

        let mut dict = std::collections::HashMap::new();
        dict.insert("Type".to_string(), Object::Name("XRef".to_string()));
        dict.insert("Prev".to_string(), Object::String(b"not touched".to_vec()));
        let mut obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"xref table data"),
        };
        let before = obj.clone();
        handler.decrypt_object(ObjectRef::new(12, 0), &mut obj).unwrap();
        assert_eq!(obj, before);
    }
}
