//! Order Machine Emulator - CLI Entry Point
//!
//! Commands:
//! - `ordermachine-emu run <image>` - Load an image straight into the store and run it
//! - `ordermachine-emu boot <image>` - Punch an image to tape and load it with the initial orders
//! - `ordermachine-emu punch <image>` - Print the tape codes for an image
//! - `ordermachine-emu disasm <image>` - Disassemble an image
//! - `ordermachine-emu initial` - List the initial orders

use std::error::Error;

use clap::{Args, Parser, Subcommand};
use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use ordermachine::asm::{disassemble, load_image, punch_tape, ProgramImage};
use ordermachine::asm::disasm::disassemble_word;
use ordermachine::cpu::hooks::{Observer, Output, Peripheral, VecTape, TAPE_CODE_MASK};
use ordermachine::cpu::initial::INITIAL_ORDERS_VERSION;
use ordermachine::cpu::{Machine, MachineConfig, Order, Registers, Status, StopReason};

#[derive(Parser)]
#[command(name = "ordermachine-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of a 20-bit single-accumulator order machine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an image into the main store and run it
    Run {
        /// Path to the image file
        image: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Punch an image to tape and load it through the initial orders
    Boot {
        /// Path to the image file
        image: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the tape codes for an image
    Punch {
        /// Path to the image file
        image: String,
    },
    /// Disassemble an image
    Disasm {
        /// Path to the image file
        image: String,
    },
    /// List the initial orders
    Initial,
}

#[derive(Args)]
struct RunArgs {
    /// File of tape codes for the program to read
    #[arg(long)]
    tape: Option<String>,
    /// Maximum number of orders to obey
    #[arg(short, long, default_value = "100000")]
    max_orders: u64,
    /// Print every order as it is obeyed
    #[arg(short, long)]
    trace: bool,
    /// Stop on stop-check orders that name a B-register
    #[arg(long)]
    optional_stop: bool,
    /// Print the final machine state as JSON
    #[arg(long)]
    dump: bool,
    /// List COUNT main-store cells from START after the run
    #[arg(long, num_args = 2, value_names = ["START", "COUNT"])]
    cells: Option<Vec<usize>>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // RUST_LOG selects which events are printed.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    match cli.command {
        Commands::Run { image, run } => {
            let image = load_image(&image)?;
            let tape = read_tape_file(run.tape.as_deref())?;
            let mut machine = build_machine(&run, tape);
            machine.load_program(image.origin, &image.resolved())?;
            run_machine(&mut machine, &run)
        }
        Commands::Boot { image, run } => {
            let image = load_image(&image)?;
            let mut tape = punch_tape(&image);
            tape.extend(read_tape_file(run.tape.as_deref())?);
            event!(
                Level::INFO,
                codes = tape.len(),
                version = INITIAL_ORDERS_VERSION,
                "booting from tape"
            );
            let mut machine = build_machine(&run, tape);
            run_machine(&mut machine, &run)
        }
        Commands::Punch { image } => {
            let image = load_image(&image)?;
            print_tape(&image);
            Ok(())
        }
        Commands::Disasm { image } => {
            let image = load_image(&image)?;
            println!("{}", disassemble(image.origin, &image.resolved()));
            Ok(())
        }
        Commands::Initial => {
            let words: Vec<u64> = Machine::default()
                .initial_orders()
                .iter()
                .map(|word| word.raw())
                .collect();
            println!("; Initial orders, version {}", INITIAL_ORDERS_VERSION);
            println!("{}", disassemble(0, &words));
            Ok(())
        }
    }
}

fn build_machine(args: &RunArgs, tape: Vec<u8>) -> Machine {
    let config = MachineConfig {
        optional_stop: args.optional_stop,
    };
    let machine = Machine::new(config)
        .with_tape(VecTape::new(tape))
        .with_output(Console)
        .with_peripheral(Console);
    if args.trace {
        machine.with_observer(Console)
    } else {
        machine
    }
}

fn run_machine(machine: &mut Machine, args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let executed = match machine.run(args.max_orders) {
        Ok(executed) => executed,
        Err(e) => {
            eprintln!("{}", e);
            machine.orders_executed()
        }
    };

    println!();
    println!("Orders obeyed: {}", executed);
    match machine.status.stop_reason {
        Some(reason) => println!("Stopped: {}", reason),
        None => println!("Still running after {} orders", args.max_orders),
    }
    println!("Accumulator: {}", machine.regs.accumulator());

    if let Some([start, count]) = args.cells.as_deref() {
        for (addr, word) in machine.store.dump(*start, *count) {
            println!("{:03}: {}  ; {:07o}", addr, disassemble_word(word), word);
        }
    }

    if args.dump {
        println!("{}", serde_json::to_string_pretty(&machine.snapshot())?);
    }

    Ok(())
}

/// Read whitespace-separated decimal tape codes.
fn read_tape_file(path: Option<&str>) -> Result<Vec<u8>, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path)?;
    let mut codes = Vec::new();
    for token in text.split_whitespace() {
        let code: u8 = token.parse()?;
        if code > TAPE_CODE_MASK {
            return Err(format!("tape code {} is wider than five bits", code).into());
        }
        codes.push(code);
    }
    Ok(codes)
}

fn print_tape(image: &ProgramImage) {
    let codes: Vec<String> = punch_tape(image).iter().map(u8::to_string).collect();
    for line in codes.chunks(16) {
        println!("{}", line.join(" "));
    }
}

/// Prints output, wire activity and (when tracing) every order.
struct Console;

impl Output for Console {
    fn output(&mut self, value: i64) {
        println!("OUT {}", value);
    }
}

impl Peripheral for Console {
    fn connect(&mut self, channel: u8, frequency: i64) {
        println!("WIRE {} on {}", channel, frequency);
    }

    fn disconnect(&mut self, channel: u8) {
        println!("WIRE {} off", channel);
    }
}

impl Observer for Console {
    fn order_executed(&mut self, order: &Order, regs: &Registers, status: &Status) {
        let flags = match (status.overflowed, status.underflowed) {
            (true, _) => " OVF",
            (_, true) => " UNF",
            _ => "",
        };
        println!(
            "{}  A={} next={:04}{}",
            disassemble_word(order.encode()),
            regs.accumulator(),
            regs.counter.raw(),
            flags
        );
    }

    fn stopped(&mut self, reason: StopReason) {
        println!("-- {}", reason);
    }
}
