//! 终端相关的输入输出

mod cli;
mod voice;

pub use cli::print_error_with_source;
pub use voice::TerminalVoice;
