//! Domain services over the SQLite store.
//!
//! `query` holds reads, `mutation` holds writes. Both route every access decision
//! through [`ledger`], which loads a caller's [`policy::Standing`] and asks [`policy`].

pub mod cascade;
pub mod ledger;
pub mod mutation;
pub mod policy;
pub mod query;
