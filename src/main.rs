// Zdisasm - A static Z80 disassembler reconstructing control flow of binaries
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Zdisasm CLI
//!
//! Disassembles Z80 binaries and snapshots into an assembler listing, with
//! optional call graph and flow chart output.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use zdisasm::error::{format_error, format_warning, DisasmError, ErrorCode};
use zdisasm::input::{load_file, parse_address, read_comment_file, use_mame_trace_file};
use zdisasm::{
    CallGraphRenderer, DisasmConfig, Disassembler, FlowChartRenderer, GraphTarget, ListingRenderer,
};

/// Zdisasm - A static Z80 disassembler
#[derive(Parser, Debug)]
#[command(name = "zdisasm")]
#[command(author = "Zdisasm Team")]
#[command(version)]
#[command(about = "A static Z80 disassembler reconstructing control flow of binaries")]
#[command(long_about = r#"
Zdisasm turns Z80 machine code into an assembler listing. Starting from
known entry points it follows all branches and calls, tells code from data
and names subroutines, jump labels, loops and data areas.

The input can be either:
  - a raw binary, loaded at --org (default 0)
  - a ZX Spectrum snapshot (.sna), started at the address on its stack

Addresses accept 0x8000, $8000, 8000h or decimal.

Example usage:
  zdisasm rom.bin -o rom.asm
  zdisasm game.bin --org 0x8000 --start 0x8000 -o game.asm
  zdisasm game.sna --callgraph game.dot --flowchart flow.dot --flowchart-start 0x8000
"#)]
struct Cli {
    /// Binary or snapshot (.sna) to disassemble
    input: PathBuf,

    /// Load address of a raw binary
    #[arg(long, default_value = "0", value_parser = address_arg)]
    org: u16,

    /// Code entry point (repeatable)
    #[arg(long, value_parser = address_arg)]
    start: Vec<u16>,

    /// Jump table as ADDR:COUNT (repeatable)
    #[arg(long, value_parser = jmp_table_arg)]
    jmp_table: Vec<(u16, usize)>,

    /// MAME trace whose addresses are known code
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Comment and label file
    #[arg(long)]
    comments: Option<PathBuf>,

    /// Restart address that is not followed (repeatable)
    #[arg(long, value_parser = address_arg)]
    no_follow_rst: Vec<u16>,

    /// Output file for the listing (stdout if not given)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output file for the call graph (.dot)
    #[arg(long)]
    callgraph: Option<PathBuf>,

    /// Restrict the call graph to a label and its callees (address or name)
    #[arg(long)]
    graph_label: Option<String>,

    /// Output file for the flow chart (.dot)
    #[arg(long)]
    flowchart: Option<PathBuf>,

    /// Subroutine to draw in the flow chart (repeatable, default: all)
    #[arg(long, value_parser = address_arg)]
    flowchart_start: Vec<u16>,

    /// Output file for the list of main labels
    #[arg(long)]
    main_labels: Option<PathBuf>,

    /// Write opcodes in upper case
    #[arg(long)]
    uppercase: bool,

    /// Leave out the opcode bytes
    #[arg(long)]
    no_opcode_bytes: bool,

    /// Leave out all comments
    #[arg(long)]
    no_comments: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_module("zdisasm", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let config = DisasmConfig {
        opcodes_lower_case: !cli.uppercase,
        add_opcode_bytes: !cli.no_opcode_bytes,
        disable_comments: cli.no_comments,
        rst_dont_follow: cli.no_follow_rst.iter().copied().collect(),
        ..DisasmConfig::default()
    };

    let mut disasm = Disassembler::with_config(config);
    disasm.on_warning(|warning| eprint!("{}", format_warning(warning)));

    // Inputs
    if let Err(e) = load_inputs(&mut disasm, &cli) {
        eprint!("{}", format_error(&e));
        return match e.code {
            ErrorCode::UnknownInputFormat => ExitCode::from(2),
            _ => ExitCode::from(3),
        };
    }

    log::info!("Disassembling {}...", cli.input.display());
    disasm.disassemble();

    // Listing
    let mut listing = disasm.disassembly_text();
    listing.push('\n');
    match &cli.output {
        Some(path) => {
            if !write_text(path, &listing) {
                return ExitCode::from(1);
            }
        }
        None => print!("{}", listing),
    }

    // Call graph
    if let Some(path) = &cli.callgraph {
        let labels = match &cli.graph_label {
            Some(target) => {
                let target = match parse_address(target) {
                    Ok(address) => GraphTarget::Address(address),
                    Err(_) => GraphTarget::Name(target.clone()),
                };
                match disasm.graph_labels(target) {
                    Ok(labels) => labels,
                    Err(e) => {
                        eprint!("{}", format_error(&e));
                        return ExitCode::from(1);
                    }
                }
            }
            None => disasm.labels.ids(),
        };
        if !write_text(path, &disasm.call_graph(&labels)) {
            return ExitCode::from(1);
        }
    }

    // Flow chart
    if let Some(path) = &cli.flowchart {
        let starts: Vec<u16> = if cli.flowchart_start.is_empty() {
            disasm
                .labels
                .iter()
                .filter(|label| !label.is_equ && label.label_type.is_top_level())
                .map(|label| label.address)
                .collect()
        } else {
            cli.flowchart_start.clone()
        };
        if !write_text(path, &disasm.flow_chart(&starts)) {
            return ExitCode::from(1);
        }
    }

    // Main labels
    if let Some(path) = &cli.main_labels {
        if !write_text(path, &disasm.main_labels()) {
            return ExitCode::from(1);
        }
    }

    if let Some(path) = &cli.output {
        log::info!(
            "Disassembled {} -> {} ({} labels)",
            cli.input.display(),
            path.display(),
            disasm.labels.len()
        );
    }

    ExitCode::SUCCESS
}

/// Load the memory image and everything that seeds the analysis.
fn load_inputs(disasm: &mut Disassembler, cli: &Cli) -> Result<(), DisasmError> {
    load_file(disasm, &cli.input, cli.org)?;

    for address in &cli.start {
        disasm.set_fixed_code_label(*address, None);
    }
    for (address, count) in &cli.jmp_table {
        disasm.set_jmp_table(*address, *count);
    }
    if let Some(path) = &cli.trace {
        use_mame_trace_file(disasm, path)?;
    }
    if let Some(path) = &cli.comments {
        let entries = read_comment_file(path)?;
        log::debug!("Read {} comment entries", entries.len());
        disasm.set_address_comments(entries);
    }
    Ok(())
}

fn write_text(path: &Path, text: &str) -> bool {
    match std::fs::write(path, text) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Error: Cannot write {}: {}", path.display(), e);
            false
        }
    }
}

fn address_arg(text: &str) -> Result<u16, String> {
    parse_address(text).map_err(|e| e.to_string())
}

fn jmp_table_arg(text: &str) -> Result<(u16, usize), String> {
    let (address, count) = text
        .split_once(':')
        .ok_or_else(|| format!("expected ADDR:COUNT, got \"{}\"", text))?;
    let count = count
        .parse()
        .map_err(|_| format!("invalid count \"{}\"", count))?;
    Ok((address_arg(address)?, count))
}
