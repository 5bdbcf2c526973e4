#![allow(unused_crate_dependencies)]

#[path = "integration/common/mod.rs"]
mod common;

#[path = "integration/collaborators.rs"]
mod collaborators;

#[path = "integration/guard.rs"]
mod guard;

#[path = "integration/pipeline.rs"]
mod pipeline;
