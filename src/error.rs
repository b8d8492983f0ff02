//! Typed market errors.
//!
//! Trading errors are non-fatal: agents handle them by skipping the
//! action on that venue for the tick. Zero-quantity orders are dropped
//! before reaching a book, and cancels referring to unknown orders are
//! no-ops. Book invariant breaches are programming errors and panic.

/// Non-fatal errors surfaced by venue operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    /// A quote was requested while one side of the book is empty.
    #[error("no resting bid or ask orders")]
    EmptyBook,
    /// Order flow was routed to a halted venue.
    #[error("trading is stopped on this venue")]
    TradingStopped,
}

pub type Result<T> = std::result::Result<T, MarketError>;
