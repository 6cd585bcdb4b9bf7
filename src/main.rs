use std::fs;
use std::io::{stdin, stdout, IsTerminal, Read, Stdin, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Term;
use miette::{bail, IntoDiagnostic, Result};

use lc3vm::dump::{LabelDump, MemoryDump, RegisterDump};
use lc3vm::queue::IoQueue;
use lc3vm::{env, LabelRegistry, LiteralMode, StepOutcome, Vm};

/// A virtual machine and two-pass assembler for the LC3 assembly language.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.asm` file and run it in the terminal
    Run {
        /// `.asm` file to run
        name: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
        /// Stop after this many instructions
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Check a `.asm` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Assemble a `.asm` file and print its labels and memory
    Dump {
        /// `.asm` file to dump
        name: PathBuf,
        /// Write literals in decimal rather than hex
        #[arg(short, long)]
        dec: bool,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(lc3vm::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    match args.command {
        Some(Command::Run {
            name,
            minimal,
            limit,
        }) => run(&name, minimal, limit),
        Some(Command::Check { name }) => {
            file_message(Green, "Checking", &name);
            let _ = assemble(&name)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        Some(Command::Dump { name, dec }) => {
            file_message(Green, "Assembling", &name);
            let (vm, labels) = assemble(&name)?;
            let mode = if dec {
                LiteralMode::Dec
            } else {
                env::literal_mode()
            };
            print!("{}", RegisterDump { vm: &vm, mode });
            if !labels.is_empty() {
                print!("{}", LabelDump(&labels));
            }
            print!("{}", MemoryDump { vm: &vm, mode });
            Ok(())
        }
        None => match args.path {
            Some(path) => run(&path, false, None),
            None => {
                println!("\n~ lc3vm v{VERSION} ~");
                println!("{}", "LC3 virtual machine & assembler".truecolor(255, 183, 197).bold());
                println!("{SHORT_INFO}");
                Ok(())
            }
        },
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &Path, minimal: bool, limit: Option<u64>) -> Result<()> {
    let limit = limit.or_else(env::step_limit);
    if !minimal {
        file_message(MsgColor::Green, "Assembling", name);
    }
    let (mut vm, _) = assemble(name)?;

    if !minimal {
        message(MsgColor::Green, "Running", "assembled program");
    }
    let mut input = HostInput::new();
    loop {
        let remaining = limit.map(|limit| limit.saturating_sub(vm.executed()));
        let outcome = vm.run(remaining);
        flush_output(&mut vm)?;
        match outcome.into_diagnostic()? {
            StepOutcome::Halted => break,
            StepOutcome::Executed => {
                bail!("Program did not halt within {} instructions", vm.executed())
            }
            StepOutcome::WaitingForInput => {
                if !input.feed(vm.input())? {
                    bail!("Program is waiting for input but stdin is closed")
                }
            }
            // Output queue was just drained
            StepOutcome::WaitingForOutput => (),
        }
    }

    if !minimal {
        println!("\n{:>12}", "Halted".cyan());
        print!(
            "{}",
            RegisterDump {
                vm: &vm,
                mode: env::literal_mode()
            }
        );
        file_message(MsgColor::Green, "Completed", name);
    }
    Ok(())
}

/// Machine and labels for a source file, with diagnostics pointing into it.
fn assemble(name: &Path) -> Result<(Vm, LabelRegistry)> {
    let src = fs::read_to_string(name).into_diagnostic()?;
    lc3vm::assemble(&src).map_err(|err| err.to_report(&src))
}

/// Write everything the program has output so far.
fn flush_output(vm: &mut Vm) -> Result<()> {
    let bytes: Vec<u8> = vm.output().drain().map(|word| word as u8).collect();
    let mut out = stdout().lock();
    out.write_all(&bytes).into_diagnostic()?;
    out.flush().into_diagnostic()
}

/// Unbuffered terminal, or bytes piped into stdin.
enum HostInput {
    Term(Term),
    Piped(Stdin),
}

impl HostInput {
    fn new() -> Self {
        if stdin().is_terminal() {
            HostInput::Term(Term::stdout())
        } else {
            HostInput::Piped(stdin())
        }
    }

    /// Queue at least one more word of input. Returns false once input is exhausted.
    fn feed(&mut self, queue: &mut IoQueue) -> Result<bool> {
        match self {
            HostInput::Term(term) => {
                let ch = term.read_char().into_diagnostic()?;
                let mut buf = [0; 4];
                Ok(queue.push_str(ch.encode_utf8(&mut buf)) > 0)
            }
            HostInput::Piped(stdin) => {
                let mut buf = vec![0; queue.free()];
                let len = stdin.lock().read(&mut buf).into_diagnostic()?;
                for &byte in &buf[..len] {
                    let _ = queue.push(byte.into());
                }
                Ok(len > 0)
            }
        }
    }
}

const SHORT_INFO: &str = r"
Welcome to lc3vm, an assembler and virtual machine for LC3 assembly code.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
