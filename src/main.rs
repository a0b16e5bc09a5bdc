use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

mod config;
mod vm;

use config::{DEFAULT_STACK_LIMIT, RuntimeConfig, TimingsFormat};
use vm::{Chunk, InterpretError, OpCode, VM, Value, debug};

// Wrapper type for clap ValueEnum support
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum TimingsFormatArg {
    #[default]
    Human,
    Json,
}

impl From<TimingsFormatArg> for TimingsFormat {
    fn from(arg: TimingsFormatArg) -> Self {
        match arg {
            TimingsFormatArg::Human => TimingsFormat::Human,
            TimingsFormatArg::Json => TimingsFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(name = "brio")]
#[command(about = "A stack-based bytecode virtual machine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the built-in sample chunk
    Run {
        /// Trace each instruction and the stack to stderr
        #[arg(long)]
        trace: bool,

        /// Maximum operand stack depth
        #[arg(long, default_value_t = DEFAULT_STACK_LIMIT)]
        stack_limit: usize,

        /// Dump bytecode to stderr, or to a file with --dump-bytecode=path
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        dump_bytecode: Option<Option<PathBuf>>,

        /// Print heap registry statistics after the run
        #[arg(long)]
        heap_stats: bool,

        /// Print run timings (human or json format)
        #[arg(long, value_enum, require_equals = true, num_args = 0..=1, default_missing_value = "human")]
        timings: Option<TimingsFormatArg>,
    },
    /// Disassemble the built-in sample chunk
    Dump,
}

/// Timing report for a single run.
#[derive(Serialize)]
struct RunTimings {
    assemble_us: u64,
    interpret_us: u64,
}

/// Hand-assemble the sample program: negate((1.2 + 3.4) / 5.6).
///
/// This stands in for a front end until the compiler exists; it exercises
/// every opcode the core defines except Multiply.
fn sample_chunk() -> Chunk {
    let mut chunk = Chunk::new();

    let constant = chunk.add_constant(Value::Number(1.2));
    chunk.write_op(OpCode::Constant, 1);
    chunk.write(constant as u8, 1);

    let constant = chunk.add_constant(Value::Number(3.4));
    chunk.write_op(OpCode::Constant, 1);
    chunk.write(constant as u8, 1);

    chunk.write_op(OpCode::Add, 1);

    let constant = chunk.add_constant(Value::Number(5.6));
    chunk.write_op(OpCode::Constant, 2);
    chunk.write(constant as u8, 2);

    chunk.write_op(OpCode::Divide, 2);
    chunk.write_op(OpCode::Negate, 3);
    chunk.write_op(OpCode::Return, 3);

    chunk
}

fn print_timings(format: TimingsFormat, timings: &RunTimings) {
    match format {
        TimingsFormat::Human => {
            eprintln!(
                "[TIMINGS] assemble: {}us, interpret: {}us",
                timings.assemble_us, timings.interpret_us
            );
        }
        TimingsFormat::Json => {
            let json = serde_json::to_string(timings)
                .expect("timings serialize to JSON cannot fail");
            eprintln!("{}", json);
        }
    }
}

fn run(
    config: RuntimeConfig,
    dump_bytecode: Option<Option<PathBuf>>,
    timings: Option<TimingsFormat>,
) -> Result<(), InterpretError> {
    let assemble_start = Instant::now();
    let chunk = sample_chunk();
    let assemble_us = assemble_start.elapsed().as_micros() as u64;

    if let Some(target) = dump_bytecode {
        let listing = debug::disassemble_chunk(&chunk, "sample chunk");
        match target {
            Some(path) => {
                if let Err(e) = fs::write(&path, &listing) {
                    eprintln!("failed to write bytecode dump to {}: {}", path.display(), e);
                }
            }
            None => eprint!("{}", listing),
        }
    }

    let heap_stats = config.heap_stats;
    let mut vm = VM::with_config(config);

    let interpret_start = Instant::now();
    let result = vm.interpret(&chunk);
    let interpret_us = interpret_start.elapsed().as_micros() as u64;

    vm.shutdown();
    if heap_stats {
        eprintln!(
            "[HEAP] objects allocated: {}, freed: {}",
            vm.heap().allocated(),
            vm.heap().freed()
        );
    }

    if let Some(format) = timings {
        print_timings(
            format,
            &RunTimings {
                assemble_us,
                interpret_us,
            },
        );
    }

    result
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            trace,
            stack_limit,
            dump_bytecode,
            heap_stats,
            timings,
        } => {
            let config = RuntimeConfig {
                trace_execution: trace,
                stack_limit,
                heap_stats,
            };

            match run(config, dump_bytecode, timings.map(|t| t.into())) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e @ InterpretError::Compile(_)) => {
                    eprintln!("{}", e);
                    ExitCode::from(65)
                }
                Err(e @ InterpretError::Runtime { .. }) => {
                    eprintln!("{}", e);
                    ExitCode::from(70)
                }
            }
        }
        Commands::Dump => {
            print!("{}", debug::disassemble_chunk(&sample_chunk(), "sample chunk"));
            ExitCode::SUCCESS
        }
    }
}
