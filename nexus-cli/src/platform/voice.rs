//! 终端语音：`say` 写到 stderr，`listen` 从 stdin 读一行

use nexus_core::runtime::stdlib::{ListenOptions, ServiceError, SpeakOptions, VoiceService};
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalVoice;

impl VoiceService for TerminalVoice {
    fn speak(&self, text: &str, options: &SpeakOptions) -> Result<(), ServiceError> {
        let voice = options.voice.as_deref().unwrap_or("default");
        eprintln!("[say:{}] {}", voice, text);
        Ok(())
    }

    /// 读取在超时内完成；超时后读线程留在后台，进程退出时结束
    fn listen(&self, options: &ListenOptions) -> Result<String, ServiceError> {
        if let Some(prompt) = &options.prompt {
            eprint!("{} ", prompt);
            io::stderr()
                .flush()
                .map_err(|e| ServiceError(e.to_string()))?;
        }

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut line = String::new();
            let result = io::stdin().lock().read_line(&mut line).map(|_| line);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(options.timeout) {
            Ok(Ok(line)) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
            Ok(Err(e)) => Err(ServiceError(format!("cannot read stdin: {}", e))),
            Err(_) => Err(ServiceError(format!(
                "no input within {} ms",
                options.timeout.as_millis()
            ))),
        }
    }
}
