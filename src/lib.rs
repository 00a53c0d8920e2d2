//! # Aliro (Wallet-native identity & SSO)
//!
//! `aliro` is an identity service where an Ethereum wallet is the account.
//! There are no passwords and no email flows: a user proves control of an
//! address by signing a short-lived challenge message, and a successful
//! verification establishes a server-side session.
//!
//! ## Challenge-login protocol
//!
//! Login is two round trips:
//!
//! 1. **Challenge** — the client posts an address and receives a one-time
//!    message embedding a random nonce. Issuing a new challenge replaces any
//!    pending one for that address.
//! 2. **Login** — the client posts the address and an EIP-191 signature over
//!    the exact challenge message. The verifier recovers the signer, compares
//!    it to the claimed address, and consumes the challenge atomically so a
//!    captured signature cannot be replayed.
//!
//! ## Addresses
//!
//! Addresses are normalized to their EIP-55 checksummed form everywhere:
//! storage, lookups, and responses. Input casing never matters.
//!
//! ## Sessions
//!
//! Sessions are opaque bearer tokens. The database stores only a SHA-256
//! hash of the token; the token itself is returned once, as a cookie and in
//! the response body.

pub mod api;
pub mod cli;
pub mod web3;
