//! CLI binary for `team_todos`.
//!
//! This binary is a thin wrapper that resolves the environment and
//! delegates to the library.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let base_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_user = env::var("TODOS_USER").ok();

    let (exit_code, lines) = team_todos::cli::run(&args, &base_dir, env_user.as_deref());

    for line in lines {
        println!("{line}");
    }

    ExitCode::from(exit_code)
}
