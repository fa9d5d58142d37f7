//! Workspace facade crate.
//!
//! Exposes feature flags that pull in the engine crates without wiring each
//! one individually: `engine` enables `core-restore`, and the default
//! `local-backend` feature adds `backend-local` on top for restores from
//! locally mounted storage.
