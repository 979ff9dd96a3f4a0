#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_docs_in_private_items,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`hexer`].
//!
//! # Overview
//!
//! This crate contains the low-level data layer of the [`hexer`] diagnostic
//! engine. It knows nothing about message text, queues or feedback handlers;
//! it only tracks *which* blocks are open, *where* they were opened, and how
//! a close event resolves against them.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`hexer`] crate, not
//! this one.
//!
//! # Architecture
//!
//! - **[`kind`]**: The packed severity/flag word shared with persisted
//!   messages
//!   - [`Severity`]: Info, Warning or Error, stored in the low 6 bits
//!   - [`MessageFlags`]: Internal, Protocol and Html, stored in the high bits
//!   - [`TypeAndFlags`]: The packed `u32` combining both
//!
//! - **[`block`]**: Block bookkeeping
//!   - [`FrameId`]/[`FrameCounter`]: Explicit activation identity. Two
//!     activations of the same function never share an id.
//!   - [`Disposition`]: How a block was exited
//!   - [`BlockStack`]: The per-context stack of open blocks, generic over the
//!     payload carried by each block
//!   - [`CloseOutcome`]: The result of resolving one close event, listing
//!     the matched block (if any) and every block that had to be abandoned
//!
//! - **[`location`]**: [`SourceLocation`], the file/function/line triple
//!   recorded at block open and close.
//!
//! # Matching Strategy
//!
//! A close event names the activation ([`FrameId`]) it happened in, and
//! optionally the exact block it targets. Resolution walks the stack from the
//! innermost block outward and stops at the first block that belongs to that
//! activation. Everything above that block was opened by an activation that
//! has already returned without closing its blocks, so those entries are
//! abandoned rather than committed. A close event that matches nothing leaves
//! the stack untouched.
//!
//! [`hexer`]: https://docs.rs/hexer/latest/hexer/
//! [`Severity`]: kind::Severity
//! [`MessageFlags`]: kind::MessageFlags
//! [`TypeAndFlags`]: kind::TypeAndFlags
//! [`FrameId`]: block::FrameId
//! [`FrameCounter`]: block::FrameCounter
//! [`Disposition`]: block::Disposition
//! [`BlockStack`]: block::BlockStack
//! [`CloseOutcome`]: block::CloseOutcome
//! [`SourceLocation`]: location::SourceLocation

extern crate alloc;

pub mod block;
pub mod kind;
pub mod location;

pub use block::{
    AbandonReason, AbandonedBlock, BlockSerial, BlockStack, CloseOutcome, CloseTarget,
    ClosedBlock, DepthExceeded, Disposition, FrameCounter, FrameId, OpenBlock,
};
pub use kind::{InvalidTypeAndFlags, MessageFlags, Severity, TypeAndFlags};
pub use location::SourceLocation;
