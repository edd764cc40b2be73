//! Selectel Core
//!
//! Building blocks shared by every Selectel resource handler:
//!
//! - `mutex_kv` - named locks that serialize mutations of one backend object
//! - `waiter` - polling until an asynchronous state transition settles
//! - `retry` - transport retries beneath API reads
//! - `provider` / `resource` - the CRUD surface driven by the plugin host

pub mod mutex_kv;
pub mod provider;
pub mod resource;
pub mod retry;
pub mod waiter;

pub use mutex_kv::{MutexKv, MutexKvGuard};
pub use waiter::{StateChangeConf, WaitError, wait_for_state};
