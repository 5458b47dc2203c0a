//! Matching Engine Service
//!
//! In-memory central-limit order book for on-chain-settled spot markets.
//! Limit orders from 20-byte-address accounts either rest on a
//! price-ordered book or sweep the opposing side, with exact scaled-integer
//! debits and credits against an internal per-user asset ledger.
//!
//! **Key invariants:**
//! - Trades are zero-sum per asset (conservation across the ledger)
//! - `0 <= locked <= balance` for every user/asset pair
//! - The book stays sorted non-decreasing by price
//! - Rounding always truncates, in the book's favour
//!
//! The engine is single-writer: every mutation runs to completion before
//! the next is admitted. Quote and snapshot reads copy state out.

pub mod book;
pub mod engine;
pub mod ledger;
pub mod matching;
pub mod registry;

pub use engine::{Engine, Quote};
