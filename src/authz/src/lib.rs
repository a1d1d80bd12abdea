//! # Warden Authorization Engine
//!
//! Model-driven access control: a text model declares the request shape,
//! policy rows, role graphs, an effect rule and a matcher expression; the
//! enforcer evaluates requests against it.
//!
//! ## Features
//!
//! - **ACL, RBAC and ABAC** from the same model format
//! - **Role graphs** with domains, bounded hierarchy and pattern matching
//! - **Four effect rules**: allow-override, deny-override, allow-and-deny, priority
//! - **Explained decisions** naming the deciding policy row
//! - **Pluggable persistence** through the `Adapter` trait (file and memory included)
//! - **Async-first design** using the Tokio runtime
//!
//! ## Example
//!
//! ```rust
//! use warden_authz::{Enforcer, Model};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = Model::from_text(
//!         r#"
//! [request_definition]
//! r = sub, obj, act
//!
//! [policy_definition]
//! p = sub, obj, act
//!
//! [policy_effect]
//! e = some(where (p.eft == allow))
//!
//! [matchers]
//! m = r.sub == p.sub && r.obj == p.obj && r.act == p.act
//! "#,
//!     )?;
//!
//!     let mut enforcer = Enforcer::from_model(model)?;
//!     enforcer.add_policy(&["alice", "data1", "read"]).await?;
//!
//!     if enforcer.enforce(["alice", "data1", "read"])? {
//!         println!("Access granted!");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod effect;
pub mod enforcer;
pub mod error;
mod management;
pub mod matcher;
pub mod model;
pub mod persist;
pub mod rbac;
mod rbac_api;
pub mod synced;
pub mod types;

// Re-export commonly used types
pub use effect::{Effect, EffectKind, Effector};
pub use enforcer::{Enforcer, EnforcerConfig};
pub use error::{AuthzError, Result};
pub use matcher::{Function, Value};
pub use model::Model;
pub use persist::{Adapter, BroadcastWatcher, FileAdapter, Filter, MemoryAdapter, Watcher};
pub use rbac::{DefaultRoleManager, MatchingFn, RoleManager};
pub use synced::SyncedEnforcer;
pub use types::{to_rule, PolicyOp, Rule};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
