//! Change detection and task orchestration for incremental LLM generation.

pub mod command_validator;
pub mod config;
pub mod diff;
pub mod error;
pub mod hasher;
pub mod lock;
pub mod orchestrator;
pub mod prompt;
pub mod resolver;
pub mod runner;
pub mod task;

pub use command_validator::{CommandValidator, PROMPT_PLACEHOLDER};
pub use config::{Config, TaskConfig, DEFAULT_CONFIG_FILE};
pub use diff::{diff_task, TaskDiff};
pub use error::{Error, Result};
pub use hasher::{compute_merkle_root, hash_file, hash_files, FileDigest, FileSet, MerkleRoot};
pub use lock::{Lock, LockStore, TaskLockEntry, DEFAULT_LOCK_FILE, LOCK_VERSION};
pub use orchestrator::{
    decide_action, Orchestrator, RunFailure, RunMode, RunReport, TaskAction, TaskOutcome,
    TaskReport,
};
pub use prompt::{assemble_prompt, parse_prompt, PromptPayload};
pub use resolver::resolve_files;
pub use runner::{Runner, ShellRunner};
pub use task::TaskSpec;
