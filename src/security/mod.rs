//! Security helpers.
//!
//! # Scope
//! - `obscure.rs`: reversible XOR/zlib/base64 transform for cookie values
//!
//! # Design Decisions
//! - Nothing here is a cryptographic primitive; values are hidden from
//!   casual inspection, not protected against tampering
//! - Callers that need integrity or secrecy must bring real crypto

pub mod obscure;
