#![allow(clippy::too_many_arguments)]

//! # pdf-secure
//!
//! Standard Security Handler for PDF documents, implementing ISO 32000-1:2008
//! Section 7.6 at algorithm revisions R2, R3, and R4.
//!
//! ## Core Features
//!
//! ### Reading encrypted documents
//! - **Password Validation**: classifies a supplied password as owner, user,
//!   or invalid (Algorithms 6 and 7)
//! - **Key Derivation**: file key and per-object keys from passwords,
//!   permissions, and the document identifier (Algorithms 1-5)
//! - **Decryption**: RC4 (40/128-bit) and AES-128-CBC crypt filters applied
//!   in place to the strings and streams of the object graph
//!
//! ### Writing encrypted documents
//! - **Encryption Dictionary**: `/Encrypt` construction for V=1, V=2, and V=4
//!   (crypt filters) via a fluent builder
//! - **Object Encryption**: per-object keying and in-place encryption of
//!   outbound strings and streams
//! - **Permissions**: the `P` flag word with reserved-bit normalization
//!
//! ## Scope
//!
//! This crate is the security-handler core only. PDF parsing, serialization,
//! and document APIs are external collaborators: the caller enumerates
//! indirect objects as `(ObjectRef, Object)` pairs and supplies the first
//! element of the trailer `/ID` array. Public-key security handlers and the
//! AES-256 revisions (R5/R6, PDF 2.0) are out of scope.
//!
//! ## Quick Start
//!
//! ```
//! use pdf_secure::{
//!     EncryptDictBuilder, EncryptionHandler, EncryptionWriteHandler, PasswordOutcome,
//!     Permissions, SecurityLevel,
//! };
//!
//! # fn main() -> pdf_secure::Result<()> {
//! let file_id = vec![0u8; 16];
//!
//! // Arm encryption for a save.
//! let dict = EncryptDictBuilder::new(SecurityLevel::Aes128)
//!     .user_password(b"user")
//!     .owner_password(b"owner")
//!     .permissions(Permissions::all().to_bits())
//!     .build(&file_id)?;
//! let writer = EncryptionWriteHandler::new(
//!     b"user", &dict.owner_key, dict.permissions, &file_id,
//!     SecurityLevel::Aes128, true,
//! );
//! let ciphertext = writer.encrypt_string(b"secret", 7, 0)?;
//!
//! // Re-open and validate.
//! let mut handler = EncryptionHandler::new(&dict.to_object(), file_id)?;
//! assert_eq!(handler.validate(b"owner"), PasswordOutcome::Owner);
//! assert_eq!(handler.decrypt_string(&ciphertext, 7, 0)?, b"secret");
//! # Ok(())
//! # }
//! ```

pub mod encryption;
pub mod error;
pub mod object;

pub use encryption::{
    generate_file_id, CryptFilterMethod, EncryptDict, EncryptDictBuilder, EncryptionHandler,
    EncryptionWriteHandler, PasswordOutcome, Permissions, SecurityLevel,
};
pub use error::{Error, Result};
pub use object::{Object, ObjectRef};
