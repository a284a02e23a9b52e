//! Collaborator seams: outbound peer messaging and trust scoring.

use serde_json::Value;

use crate::domain::Hash256;

/// Which side of a swap a pubkey played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapRole {
    Bob,
    Alice,
}

/// Outbound peer messaging. Delivery is the transport's concern; calls are
/// fire-and-forget and must never block the reconciliation pass.
pub trait Broadcast: Send + Sync {
    fn send(&self, msg: Value);
}

/// Trust-scoring collaborator, invoked when a live swap is first observed
/// so both counterparties' pubkeys get credited with it.
pub trait TrustHook: Send + Sync {
    fn register_swap(&self, pubkey: Hash256, aliceid: u64, role: SwapRole);
}

/// Logs outbound messages; used when no transport is wired in.
#[derive(Debug, Default)]
pub struct LogBroadcast;

impl Broadcast for LogBroadcast {
    fn send(&self, msg: Value) {
        tracing::info!(%msg, "outbound peer message");
    }
}

#[derive(Debug, Default)]
pub struct NoopTrustHook;

impl TrustHook for NoopTrustHook {
    fn register_swap(&self, pubkey: Hash256, aliceid: u64, role: SwapRole) {
        tracing::debug!(%pubkey, aliceid, ?role, "swap registered for trust scoring");
    }
}
