//! Auto-reply Scheduler
//!
//! Decides, times, and gates the sending of one auto-reply per eligible
//! inbound message. At most one timer is pending per chat; a newer message
//! in the same chat supersedes it, and a per-chat rate limit turns
//! too-frequent fires into silent drops.

pub mod scheduler;

pub use scheduler::ReplyScheduler;
