pub mod filestore;
pub mod memory;
pub mod record;
pub mod traits;

pub use filestore::FileMailbox;
pub use memory::MemoryMailbox;
pub use record::{
    DECLINED_CALL, PENDING_CALL, PendingCallRecord, PendingDecision, take_declined_call,
    take_pending_call, write_declined_call, write_pending_call,
};
pub use traits::{Mailbox, MailboxError};
