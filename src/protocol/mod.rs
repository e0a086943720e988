//! Wire protocol spoken with replicas

pub mod wire;

pub use wire::{Operation, Propose, ProposeReply, PROPOSE, PROPOSE_REPLY_SIZE, PROPOSE_SIZE};
