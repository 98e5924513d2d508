//! Caches of tickets and security snapshots and their invalidation.

mod accounts;
mod fanout;
mod info_cache;
mod ticket_store;

pub use accounts::{Account, AccountSource, InMemoryAccounts};
pub use fanout::InvalidationFanout;
pub use info_cache::SecurityInfoCache;
pub use ticket_store::TicketStore;
