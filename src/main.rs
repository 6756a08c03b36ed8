use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap_num::maybe_hex;
use inkwell::context::Context;
use tracing_subscriber::EnvFilter;

use rvdbt::cpu::CpuState;
use rvdbt::elf_utils::load_elf;
use rvdbt::jit::{Jit, JitError, RunExit};

/// Execute a 32-bit RISC-V program by dynamic binary translation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the input RV32I ELF executable
    #[arg(long)]
    input_elf: PathBuf,

    /// LLVM IR module (.ll or .bc) supplying the memory helpers
    /// read8..write32
    #[arg(long)]
    memory_impl: PathBuf,

    /// Maximum number of guest instructions per translated block
    /// (use 0x prefix for hexadecimal)
    #[arg(long, default_value = "64", value_parser = maybe_hex::<u32>)]
    threshold: u32,

    /// Stop after this many block invocations instead of running
    /// until the guest exits
    #[arg(long)]
    max_blocks: Option<u64>,

    /// Dump translated IR and the CPU state after every block
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error(transparent)]
    Elf(#[from] rvdbt::elf_utils::ElfError),
    #[error(transparent)]
    Jit(#[from] JitError),
}

fn run(args: &Args) -> Result<RunExit, MainError> {
    let (image, entry) = load_elf(&args.input_elf)?;
    // Box the image so the pointer held by the CPU state stays valid
    // for the whole run
    let mut image = Box::new(image);
    let mut cpu = CpuState::new(image.as_mut(), entry);
    tracing::debug!("entry point 0x{entry:08x}");

    let context = Context::create();
    let mut jit = Jit::new(
        &context,
        &args.memory_impl,
        args.threshold as usize,
        args.debug,
    )?;
    let exit = jit.run(&mut cpu, args.max_blocks)?;
    if args.debug {
        println!("{cpu}");
    }
    Ok(exit)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("rvdbt=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if args.threshold == 0 {
        eprintln!("error: --threshold must be at least 1");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(RunExit::Exited(code)) => ExitCode::from(code as u8),
        Ok(RunExit::BlockBudget) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
