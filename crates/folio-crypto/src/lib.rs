//! Hashing primitives for Folio.
//!
//! Provides domain-separated BLAKE3 hashing so that a blob, a tree and a
//! commit with byte-identical payloads never share an address.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
