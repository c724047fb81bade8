//! Nexus CLI - Command line interface
//!
//! Runs, compiles, analyzes and inspects NexusLang programs. Settings come
//! from an optional `nexus.json`; command-line flags override it.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};

mod config;
mod logging;
mod platform;

use crate::config::{parse_level, FileConfig, LogConfig, DEFAULT_CONFIG_FILE};
use crate::logging::LogFormat;
use crate::platform::{print_error_with_source, TerminalVoice};
use nexus_api::{
    compile_source, compile_to_program, parse_source, AnalyzeRequest, ExecutionMode,
    ExecutionOutcome, NexusError, RunConfig,
};
use nexus_core::binary::BINARY_EXT;
use nexus_core::personality::template;
use nexus_core::runtime::stdlib::{Services, StaticKnowledge};
use nexus_core::{load, BytecodeProgram, PersonalityProfile};

#[derive(Parser)]
#[command(
    name = "nexus",
    about = "NexusLang - run, compile and inspect personality-aware programs",
    version,
    propagate_version = true
)]
struct Cli {
    /// Configuration file (default: ./nexus.json when present)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    /// Also append logs to FILE
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Interpreted,
    Compiled,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Interpreted => ExecutionMode::Interpreted,
            ModeArg::Compiled => ExecutionMode::Compiled,
        }
    }
}

/// 运行相关的覆盖参数
#[derive(Debug, Args)]
struct ExecArgs {
    /// Wall-clock budget in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Output cap in bytes
    #[arg(long, value_name = "BYTES")]
    max_output: Option<usize>,

    /// Starting personality template
    #[arg(long, value_name = "NAME")]
    template: Option<String>,

    /// Static knowledge base (JSON array of entries)
    #[arg(long, value_name = "FILE")]
    knowledge: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a source file
    Run {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Execution mode (default from config: interpreted)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Run the static analyzer first and stop on errors
        #[arg(long)]
        analyze: bool,

        /// Print the disassembled bytecode before running
        #[arg(long)]
        dump_bytecode: bool,

        #[command(flatten)]
        exec: ExecArgs,
    },

    /// Compile a source file to a .nxb binary
    Compile {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output path (default: INPUT with the .nxb extension)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print the disassembled bytecode
        #[arg(long)]
        dump_bytecode: bool,
    },

    /// Load and run a compiled .nxb binary
    Exec {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[command(flatten)]
        exec: ExecArgs,
    },

    /// Statically analyze a source file
    Analyze {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Disassemble a source file or a .nxb binary
    Disasm {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Show a personality profile
    Personality {
        /// Template to show (default: all traits at 0.7)
        #[arg(long, value_name = "NAME")]
        template: Option<String>,

        /// Mix with another template
        #[arg(long, value_name = "NAME")]
        mix: Option<String>,

        /// Weight of the --mix template; the base gets 1 - WEIGHT
        #[arg(long, default_value_t = 0.5, requires = "mix")]
        weight: f64,

        /// List template names
        #[arg(long)]
        templates: bool,

        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(message) => {
            eprintln!("error: {}", message);
            process::exit(2);
        }
    }
}

/// `Ok(false)` 表示程序本身失败（错误已打印），`Err` 表示 CLI 使用错误
fn dispatch(cli: Cli) -> Result<bool, String> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path, true)?,
        None => FileConfig::load(Path::new(DEFAULT_CONFIG_FILE), false)?,
    };
    init_logging(&cli, &file_config)?;
    let mut run_config = file_config.run_config()?;

    match cli.command {
        Command::Run {
            input,
            mode,
            analyze,
            dump_bytecode,
            exec,
        } => {
            if let Some(mode) = mode {
                run_config.mode = mode.into();
            }
            run_config.analyze_before_run |= analyze;
            apply_exec_args(&mut run_config, &exec)?;
            let knowledge = load_knowledge(exec.knowledge.as_deref().or(file_config.knowledge.as_deref()))?;
            handle_run(&input, &run_config, knowledge.as_ref(), dump_bytecode)
        }
        Command::Compile {
            input,
            output,
            dump_bytecode,
        } => handle_compile(&input, output, &run_config, dump_bytecode),
        Command::Exec { input, exec } => {
            apply_exec_args(&mut run_config, &exec)?;
            let knowledge = load_knowledge(exec.knowledge.as_deref().or(file_config.knowledge.as_deref()))?;
            handle_exec(&input, &run_config, knowledge.as_ref())
        }
        Command::Analyze { input, json } => handle_analyze(&input, &run_config, json),
        Command::Disasm { input } => handle_disasm(&input, &run_config),
        Command::Personality {
            template,
            mix,
            weight,
            templates,
            json,
        } => handle_personality(template.as_deref(), mix.as_deref(), weight, templates, json),
    }
}

fn init_logging(cli: &Cli, file_config: &FileConfig) -> Result<(), String> {
    let mut log_config = LogConfig::from_section(&file_config.log)?;
    if let Some(level) = &cli.log_level {
        log_config.global = parse_level(level)?;
    }
    let format = match (cli.log_format, &file_config.log.format) {
        (Some(format), _) => format,
        (None, Some(name)) => LogFormat::from_name(name)?,
        (None, None) => LogFormat::Compact,
    };
    let file = cli.log_file.as_deref().or(file_config.log.file.as_deref());
    logging::init(&log_config, format, file)
}

fn apply_exec_args(config: &mut RunConfig, exec: &ExecArgs) -> Result<(), String> {
    if let Some(ms) = exec.timeout_ms {
        config.limits.execution_timeout_ms = ms;
    }
    if let Some(bytes) = exec.max_output {
        config.limits.max_output_bytes = bytes;
    }
    if let Some(name) = &exec.template {
        config.profile = PersonalityProfile::from_template(name).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn load_knowledge(path: Option<&Path>) -> Result<Option<StaticKnowledge>, String> {
    let Some(path) = path else {
        return Ok(None);
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read knowledge file '{}': {}", path.display(), e))?;
    let knowledge = StaticKnowledge::from_json(&content)
        .map_err(|e| format!("Invalid knowledge file '{}': {}", path.display(), e))?;
    info!(target: "nexus::cli", entries = knowledge.len(), "Loaded knowledge base");
    Ok(Some(knowledge))
}

fn services(knowledge: Option<&StaticKnowledge>) -> Services<'_> {
    let services = Services::default().with_voice(&TerminalVoice);
    match knowledge {
        Some(knowledge) => services.with_knowledge(knowledge),
        None => services,
    }
}

fn read_source(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("Cannot read '{}': {}", path.display(), e))
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == BINARY_EXT)
}

/// 打印程序输出，并报告截断与失败
fn finish_run(outcome: &ExecutionOutcome, config: &RunConfig) -> bool {
    print!("{}", outcome.output);
    if !outcome.output.is_empty() && !outcome.output.ends_with('\n') {
        println!();
    }
    let _ = std::io::stdout().flush();

    if outcome.output_truncated {
        eprintln!(
            "warning: output truncated at {} bytes",
            config.limits.max_output_bytes
        );
    }
    debug!(
        target: "nexus::cli",
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "Run finished"
    );
    match NexusError::from_outcome(outcome) {
        Some(error) => {
            eprintln!("error: {}", error.to_report());
            false
        }
        None => true,
    }
}

fn handle_run(
    input: &Path,
    config: &RunConfig,
    knowledge: Option<&StaticKnowledge>,
    dump_bytecode: bool,
) -> Result<bool, String> {
    let source = read_source(input)?;

    if dump_bytecode {
        match parse_source(&source, config).and_then(|program| compile_to_program(&program)) {
            Ok(program) => println!("{}", program.disassemble()),
            Err(e) => {
                print_error_with_source(&e, &source);
                return Ok(false);
            }
        }
    }

    match nexus_api::run(&source, config, services(knowledge)) {
        Ok(outcome) => Ok(finish_run(&outcome, config)),
        Err(e) => {
            print_error_with_source(&e, &source);
            Ok(false)
        }
    }
}

fn handle_compile(
    input: &Path,
    output: Option<PathBuf>,
    config: &RunConfig,
    dump_bytecode: bool,
) -> Result<bool, String> {
    let source = read_source(input)?;
    let bytes = match compile_source(&source, config) {
        Ok(bytes) => bytes,
        Err(e) => {
            print_error_with_source(&e, &source);
            return Ok(false);
        }
    };

    if dump_bytecode {
        let program = load(&bytes).map_err(|e| e.to_string())?;
        println!("{}", program.disassemble());
    }

    let output = output.unwrap_or_else(|| input.with_extension(BINARY_EXT));
    std::fs::write(&output, &bytes)
        .map_err(|e| format!("Cannot write '{}': {}", output.display(), e))?;
    println!(
        "Compiled {} -> {} ({} bytes, ratio {:.2})",
        input.display(),
        output.display(),
        bytes.len(),
        source.len() as f64 / bytes.len() as f64
    );
    Ok(true)
}

fn handle_exec(
    input: &Path,
    config: &RunConfig,
    knowledge: Option<&StaticKnowledge>,
) -> Result<bool, String> {
    let bytes =
        std::fs::read(input).map_err(|e| format!("Cannot read '{}': {}", input.display(), e))?;
    match nexus_api::run_binary(&bytes, config, services(knowledge)) {
        Ok(outcome) => Ok(finish_run(&outcome, config)),
        Err(e) => {
            eprintln!("error: {}", e.to_report());
            Ok(false)
        }
    }
}

fn handle_analyze(input: &Path, config: &RunConfig, json: bool) -> Result<bool, String> {
    let source = read_source(input)?;
    let response = nexus_api::analyze(&AnalyzeRequest { code: source }, config);

    if json {
        let text = serde_json::to_string_pretty(&response).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        let groups = [
            ("error", &response.errors),
            ("warning", &response.warnings),
            ("suggestion", &response.suggestions),
        ];
        for (label, diagnostics) in groups {
            for d in diagnostics {
                println!("{}: {}:{} {}", label, input.display(), d.line, d.message);
            }
        }
        println!(
            "{} error(s), {} warning(s), {} suggestion(s)",
            response.errors.len(),
            response.warnings.len(),
            response.suggestions.len()
        );
    }
    Ok(response.errors.is_empty())
}

fn handle_disasm(input: &Path, config: &RunConfig) -> Result<bool, String> {
    let program: BytecodeProgram = if is_binary(input) {
        let bytes = std::fs::read(input)
            .map_err(|e| format!("Cannot read '{}': {}", input.display(), e))?;
        match load(&bytes) {
            Ok(program) => program,
            Err(e) => {
                eprintln!("error: {}", NexusError::from(e).to_report());
                return Ok(false);
            }
        }
    } else {
        let source = read_source(input)?;
        match parse_source(&source, config).and_then(|program| compile_to_program(&program)) {
            Ok(program) => program,
            Err(e) => {
                print_error_with_source(&e, &source);
                return Ok(false);
            }
        }
    };
    print!("{}", program.disassemble());
    Ok(true)
}

fn handle_personality(
    template_name: Option<&str>,
    mix: Option<&str>,
    weight: f64,
    list_templates: bool,
    json: bool,
) -> Result<bool, String> {
    if list_templates {
        for name in template::names() {
            println!("{}", name);
        }
        return Ok(true);
    }

    let from_template =
        |name: &str| PersonalityProfile::from_template(name).map_err(|e| e.to_string());
    let mut profile = match template_name {
        Some(name) => from_template(name)?,
        None => PersonalityProfile::default(),
    };
    if let Some(other) = mix {
        profile = profile
            .mix(&from_template(other)?, (1.0 - weight, weight))
            .map_err(|e| e.to_string())?;
    }

    if json {
        let text = serde_json::to_string_pretty(&profile).map_err(|e| e.to_string())?;
        println!("{}", text);
    } else {
        for (t, value) in profile.iter() {
            println!(
                "{:<22} {:<11} {:.2}  {}",
                t.name(),
                t.category().as_str(),
                value,
                profile.describe(t)
            );
        }
    }
    Ok(true)
}
