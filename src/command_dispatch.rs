//! Purpose: Hold top-level CLI command dispatch for `n3-native`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every library call goes through `host`, so buffers are released on drop.
//! Invariants: Nothing reaches stdout unless the call returned OK.

use super::*;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "n3-native", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::EmbedCheck => {
            let digest = host::hash(EMBED_CHECK_INPUT)?;
            if digest.is_empty() {
                return Err(Error::new(ErrorKind::Internal)
                    .with_message("hash returned OK with an empty buffer"));
            }
            emit_buffer(digest)
        }
        Command::Info => emit_buffer(host::info()?),
        Command::Scan { input } => {
            let source = read_input(input.as_deref())?;
            emit_buffer(host::scan(&source)?)
        }
        Command::Hash { input } => {
            let bytes = read_input(input.as_deref())?;
            emit_buffer(host::hash(&bytes)?)
        }
        Command::Normalize { input } => {
            let text = read_input(input.as_deref())?;
            emit_buffer(host::normalize(&text)?)
        }
        Command::ChunkPlan {
            input,
            max_chars,
            overlap,
        } => {
            let text = read_input(input.as_deref())?;
            emit_buffer(host::chunk_plan(&text, max_chars, overlap)?)
        }
        Command::ExecIr { ir, config } => {
            let ir = read_input(Some(&ir))?;
            let config = config.as_deref().map(|path| read_input(Some(path))).transpose()?;
            emit_buffer(host::exec_ir(&ir, config.as_deref())?)
        }
    }
}
