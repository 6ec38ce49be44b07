//! Local git introspection and operation progress for the gongfeng CLI.
//!
//! Everything goes through the `git` executable. Start with
//! [`git::Repository::at`], classify the path with
//! [`git::Repository::repository_type`], then query remotes, branches,
//! refs and working-directory status, or run a transfer with a progress
//! callback.

pub mod config;
pub mod git;
pub mod shell_exec;
pub mod styling;
