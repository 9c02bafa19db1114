//! Integration tests for hashing, verification, copying and mirroring

mod cli_surface;
mod config_integration;
mod copy_fidelity;
mod verify_drift;
