use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use log::debug;
use rst_core::core_api::{CoreError, Engine, Session, UnpackOptions, UnpackReport};
use rst_core::layout::{FileLayout, read_result_layout};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a saved turn document into spec tables, result, util and
    /// combat files.
    Unpack {
        #[arg(value_name = "DOC")]
        path: PathBuf,
        /// Fallback directory for baseline spec tables.
        #[arg(long, env = "NU_RST_ROOT", value_name = "DIR")]
        root: Option<PathBuf>,
        #[arg(long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long = "no-vcr")]
        no_vcr: bool,
        #[arg(long = "no-result")]
        no_result: bool,
    },
    /// Write only the combat recordings file.
    Vcr {
        #[arg(value_name = "DOC")]
        path: PathBuf,
        #[arg(long, env = "NU_RST_ROOT", value_name = "DIR")]
        root: Option<PathBuf>,
        #[arg(long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },
    /// Print the parsed document in canonical form.
    Dump {
        #[arg(value_name = "DOC")]
        doc: PathBuf,
        /// Dotted path of a subtree, e.g. `rst.player`.
        #[arg(long, value_name = "a.b.c")]
        path: Option<String>,
    },
    /// Print the section table of an existing result file.
    Layout {
        #[arg(value_name = "FILE.rst")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .filter_level(cli.verbose.log_level_filter())
        .target(env_logger::fmt::Target::Stderr)
        .init();

    match cli.command {
        Command::Unpack {
            path,
            root,
            output,
            json,
            no_vcr,
            no_result,
        } => {
            let session = open_session(&path);
            let options = UnpackOptions {
                root_dir: root,
                output_dir: output,
                write_vcr_file: !no_vcr,
                write_result: !no_result,
            };
            debug!("unpack options: {options:?}");
            let report = session.unpack(&options).unwrap_or_else(|e| fail(&path, &e));
            if json {
                print_json(&serde_json::to_value(&report).unwrap_or_else(|e| {
                    eprintln!("Error encoding report: {e}");
                    process::exit(1);
                }));
            } else {
                print_report(&report);
            }
        }
        Command::Vcr { path, root, output } => {
            let session = open_session(&path);
            let options = UnpackOptions {
                root_dir: root,
                output_dir: output,
                ..UnpackOptions::default()
            };
            debug!("vcr options: {options:?}");
            let file = session
                .write_combat_file(&options)
                .unwrap_or_else(|e| fail(&path, &e));
            println!("{} ({} bytes)", file.path, file.bytes);
        }
        Command::Dump { doc, path } => {
            let session = open_session(&doc);
            let text = session
                .dump(path.as_deref())
                .unwrap_or_else(|e| fail(&doc, &e));
            println!("{text}");
        }
        Command::Layout { path, json } => {
            let layout = read_layout(&path);
            if json {
                print_json(&layout_json(&layout));
            } else {
                print_layout(&layout);
            }
        }
    }
}

fn open_session(path: &Path) -> Session {
    let session = Engine::new()
        .open_path(path)
        .unwrap_or_else(|e| fail(path, &e));
    let identity = session.identity();
    debug!(
        "{}: player {} (race {})",
        path.display(),
        identity.player_id,
        identity.race
    );
    session
}

fn fail(path: &Path, err: &CoreError) -> ! {
    eprintln!("Error processing {}", path.display());
    eprintln!("  {err}");
    process::exit(1);
}

fn read_layout(path: &Path) -> FileLayout {
    let file = File::open(path).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", path.display());
        process::exit(1);
    });
    read_result_layout(BufReader::new(file)).unwrap_or_else(|e| {
        eprintln!("Error reading result header of {}: {e}", path.display());
        process::exit(1);
    })
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error encoding JSON: {e}");
            process::exit(1);
        }
    }
}

fn print_report(report: &UnpackReport) {
    println!(
        "player {} (race {}), turn {}",
        report.player_id, report.race, report.turn
    );
    for file in &report.files {
        println!("  {:<40} {:>8} bytes", file.path, file.bytes);
    }
    if !report.sections.is_empty() {
        println!("result sections:");
        for section in &report.sections {
            println!(
                "  {:<10} offset {:>7}  length {:>6}",
                section.name, section.offset, section.length
            );
        }
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
}

fn layout_json(layout: &FileLayout) -> serde_json::Value {
    let sections: Vec<serde_json::Value> = layout
        .sections
        .iter()
        .map(|s| {
            json!({
                "name": s.id.as_str(),
                "start": s.range.start,
                "end": s.range.end,
                "length": s.range.len(),
            })
        })
        .collect();
    json!({
        "file_len": layout.file_len,
        "sections": sections,
    })
}

fn print_layout(layout: &FileLayout) {
    println!("file length {}", layout.file_len);
    for s in &layout.sections {
        println!(
            "  {:<10} {:>7}..{:<7} {:>6} bytes",
            s.id.as_str(),
            s.range.start,
            s.range.end,
            s.range.len()
        );
    }
}
