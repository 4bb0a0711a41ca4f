//! Programmable Controller - CLI Entry Point
//!
//! Commands:
//! - `pcd-emu run <program>` - Run a listing or image on a simulated board
//! - `pcd-emu edit [image]` - Interactive front panel
//! - `pcd-emu asm <listing>` - Assemble a listing to an image
//! - `pcd-emu disasm <image>` - Disassemble an image

use clap::{Parser, Subcommand};
use pcd::{DeviceConfig, Memory};

#[derive(Parser)]
#[command(name = "pcd-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "Interpreter, program editor and front panel for a keyboard-programmable controller")]
struct Cli {
    /// Device configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it ends
    Run {
        /// Path to the listing or image (.img/.bin) to execute
        program: String,
        /// Maximum number of instructions to run (default: from config)
        #[arg(short, long)]
        max_steps: Option<u64>,
        /// Print every executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(short, long)]
        state: bool,
    },
    /// Edit and run a program on the interactive front panel
    Edit {
        /// Program image, created on exit if missing
        #[arg(default_value = "program.img")]
        image: String,
    },
    /// Assemble a listing to an image
    Asm {
        /// Path to the listing
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble an image to readable text
    Disasm {
        /// Path to the image
        image: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run { program, max_steps, trace, state }) => {
            let limit = max_steps.unwrap_or(config.step_limit);
            run_program(&program, &config, limit, trace, state);
        }
        Some(Commands::Edit { image }) => {
            edit_program(&image, &config);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("Programmable Controller v0.1.0");
            println!();
            println!("Use --help for available commands");
            println!();
            print_instruction_set();
        }
    }
}

fn load_config(path: Option<&str>) -> DeviceConfig {
    let Some(path) = path else {
        return DeviceConfig::default();
    };
    match DeviceConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn is_image(path: &str) -> bool {
    path.ends_with(".img") || path.ends_with(".bin")
}

/// Load a program from a listing or an image.
fn load_program(path: &str) -> Memory {
    use pcd::{assemble, load_image};

    if is_image(path) {
        return match load_image(path) {
            Ok(mem) => {
                println!("📂 Loaded {} instructions", mem.program().len());
                mem
            }
            Err(e) => {
                eprintln!("❌ Failed to load image: {}", e);
                std::process::exit(1);
            }
        };
    }

    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let program = match assemble(&source) {
        Ok(program) => {
            println!("📝 Assembled {} instructions", program.len());
            program
        }
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    match Memory::from_program(&program) {
        Ok(mem) => mem,
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(path: &str, config: &DeviceConfig, max_steps: u64, trace: bool, state: bool) {
    use pcd::{Device, RunOutcome, SimBoard};

    println!("🔧 Running: {}", path);
    let store = load_program(path);

    let mut board = SimBoard::running();
    config.apply(&mut board);
    let mut device = Device::new(store, board).with_step_limit(max_steps);

    println!();
    println!("━━━ Execution ━━━");

    let outcome = device.run_traced(|step, regs| {
        if trace {
            println!(
                "{:03}: {:<8} R{:02}={}",
                step.position,
                step.instruction.to_string(),
                regs.pointer,
                regs.pointed()
            );
        }
    });

    println!();
    println!("━━━ Result ━━━");
    match &outcome {
        RunOutcome::Terminated { steps } => println!("Terminated after {} steps", steps),
        RunOutcome::Interrupted { steps } => println!("Interrupted after {} steps", steps),
        RunOutcome::StepLimit { steps } => println!("Stopped after {} steps", steps),
        RunOutcome::Faulted { error } => println!("Error: {}", error),
    }
    println!("Display:");
    print!("{}", device.board.screen);
    println!("Output:  {}", device.board.written_text().trim_end());
    println!(
        "LEDs:    LD1={} LD2={}",
        device.board.leds[0].letter(),
        device.board.leds[1].letter()
    );
    println!("Buzzer:  {}", device.board.tone);
    println!("Waited:  {}.{}s", device.board.elapsed_tenths / 10, device.board.elapsed_tenths % 10);
    println!("Pointer: R{:02}", device.cpu.regs.pointer);

    if state {
        match serde_json::to_string_pretty(&device.cpu) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("❌ Failed to serialize state: {}", e),
        }
    }

    match outcome {
        RunOutcome::StepLimit { .. } => {
            println!();
            println!("⚠️  Reached step limit ({}). Use --max-steps to increase.", max_steps);
        }
        RunOutcome::Faulted { .. } => std::process::exit(1),
        _ => {}
    }
}

#[cfg(feature = "tui")]
fn edit_program(path: &str, config: &DeviceConfig) {
    use pcd::{load_image, save_image, run_front_panel};

    let store = if std::path::Path::new(path).exists() {
        match load_image(path) {
            Ok(mem) => mem,
            Err(e) => {
                eprintln!("❌ Failed to load image: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("📂 Starting with an empty program");
        Memory::new()
    };

    let store = match run_front_panel(store, config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ Front panel error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = save_image(path, &store) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }
    println!("✓ Saved {} instructions to {}", store.program().len(), path);
}

#[cfg(not(feature = "tui"))]
fn edit_program(_path: &str, _config: &DeviceConfig) {
    eprintln!("❌ The front panel needs the `tui` feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use pcd::save_image;

    let out_path = output.unwrap_or_else(|| {
        std::path::Path::new(source_path)
            .with_extension("img")
            .to_string_lossy()
            .into_owned()
    });

    println!("📝 Assembling: {} → {}", source_path, out_path);

    let store = load_program(source_path);

    if let Err(e) = save_image(&out_path, &store) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(path: &str) {
    use pcd::disassemble;

    println!("📖 Disassembling: {}", path);
    println!();

    let store = load_program(path);
    println!("{}", disassemble(store.program()));
}

fn print_instruction_set() {
    use pcd::cpu::OPCODE_TABLE;

    println!("━━━ Instruction Set ━━━");
    for row in OPCODE_TABLE.iter().skip(1).collect::<Vec<_>>().chunks(4) {
        let line: Vec<String> = row
            .iter()
            .map(|e| format!("{} {:<9}", String::from_utf8_lossy(&e.mnemonic), format!("{:?}", e.operand)))
            .collect();
        println!("  {}", line.join(" "));
    }
}

fn run_self_test() {
    use pcd::{assemble, Device, Instruction, InstructionStore, Opcode, RunOutcome, SimBoard};
    use pcd::hal::LedColour;

    println!("━━━ Controller Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let run = |listing: &str| -> Option<Device<Memory, SimBoard>> {
        let program = assemble(listing).ok()?;
        let store = Memory::from_program(&program).ok()?;
        let mut device = Device::new(store, SimBoard::running()).with_step_limit(1000);
        device.enter_running_mode();
        Some(device)
    };

    // Test 1: Literal encoding roundtrip
    print!("Literal encoding roundtrip... ");
    let ok = (0..=999u16).all(|v| {
        Instruction::with_literal(Opcode::Set, v).operand() == pcd::cpu::Operand::Literal(v)
    });
    if ok { println!("✓"); passed += 1; }
    else { println!("✗"); failed += 1; }

    // Test 2: Insert/remove inverse
    print!("Insert then remove restores program... ");
    let mut mem = Memory::with_capacity(8);
    let program: Vec<Instruction> = (1..=5).map(|v| Instruction::with_literal(Opcode::Inc, v)).collect();
    let ok = mem.load_program(0, &program).is_ok()
        && mem.insert_empty(2).is_ok()
        && mem.remove(2).is_ok()
        && mem.program() == program.as_slice();
    if ok { println!("✓"); passed += 1; }
    else { println!("✗"); failed += 1; }

    // Test 3: Register output
    print!("PTR prints three digits... ");
    match run("PIC R0\nSET 5\nPTR R0\n") {
        Some(dev) if dev.board.written_text().starts_with("005") => { println!("✓"); passed += 1; }
        _ => { println!("✗"); failed += 1; }
    }

    // Test 4: Nested block skipping
    print!("False condition skips nested blocks... ");
    match run("VEQ 1\nBEG\nBEG\nLD1 R\nEND\nLD1 G\nEND\nLD2 B\n") {
        Some(dev) if dev.board.leds == [LedColour::Off, LedColour::Blue] => { println!("✓"); passed += 1; }
        _ => { println!("✗"); failed += 1; }
    }

    // Test 5: Errors report their position
    print!("Operand mismatch reports position... ");
    match run("CLR\nCLR\nSET R1\n").and_then(|dev| dev.last_run().cloned()) {
        Some(RunOutcome::Faulted { error }) if error.position() == Some(2) => { println!("✓"); passed += 1; }
        _ => { println!("✗"); failed += 1; }
    }

    // Test 6: Editor keystrokes
    print!("Editor writes typed lines... ");
    let mut board = SimBoard::typing(b"PIC R4]INC 7]");
    board.power_budget = Some(30);
    let mut device = Device::new(Memory::new(), board);
    device.enter_editing_mode();
    if device.store.program() == [Instruction::with_register(Opcode::Pic, 4), Instruction::with_literal(Opcode::Inc, 7)] {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
