//! Fleetgate - role/permission/constraint authorization for logistics apps
//!
//! This library provides the authorization core for the Fleetgate logistics
//! manager: a KDL-defined role/permission catalog, a file-persisted login
//! session, a constraint-aware access evaluator, and guard/gate adapters
//! for route and UI gating.

pub mod authz;
pub mod errors;
pub mod guard;
pub mod session;
pub mod settings;
