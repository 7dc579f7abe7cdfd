//! tickr core library
//!
//! Everything the `tickr` client needs to keep a personal todo list in sync
//! with a Supabase-style backend, with a local snapshot to fall back on when
//! the network is gone.
//!
//! # Modules
//!
//! - `models`: todo rows, inserts, patches, filters
//! - `config`: application configuration
//! - `auth`: sign-up, sign-in and the persisted session
//! - `remote`: the row store trait, its REST/realtime client and an in-memory store
//! - `cache`: offline snapshots of the list
//! - `connectivity`: online/offline signal
//! - `sync`: the controller tying the above together

pub mod auth;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod models;
pub mod remote;
pub mod sync;

pub use auth::{AuthError, AuthProvider, GoTrueAuth, Session, SessionStore, User};
pub use cache::{CacheError, FileCache, MemoryCache, TodoCache};
pub use config::Config;
pub use connectivity::Connectivity;
pub use models::{Filter, NewTodo, Todo, TodoPatch, TodoStats};
pub use remote::{ChangeEvent, MemoryStore, RemoteError, RemoteStore, Subscription, SupabaseStore};
pub use sync::{Outcome, SyncController, ValidationError};
