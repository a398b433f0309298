//! Fatal error reporting.
//!
//! Recoverable errors (truth-table parsing, I/O, configuration) are
//! `Result`s carried by [`crate::table::TableError`]. Everything else
//! listed below is an invariant violation: the process prints a
//! rank-tagged message and takes the whole world down with it, since
//! evolutionary state is never checkpointed and no single process can
//! continue without its peers.

/// Report a fatal condition and abort.
///
/// The message is tagged with the reporting process rank so that
/// multi-process logs remain attributable.
pub fn fatal(rank: u32, msg: impl AsRef<str>) -> ! {
    eprintln!("[proc:{rank}] {}", msg.as_ref());
    std::process::abort();
}
