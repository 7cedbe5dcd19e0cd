use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use scorelog::event::Lifecycle;
use scorelog::{convert, LogConfig};

/// Inputs above this size are routed to the large-file exception directory
/// instead of being converted.
const MAX_FILESIZE: u64 = 1_000_000;

fn usage() -> ! {
    eprintln!("Usage: scorelog --input-dir <dir> --output-dir <dir> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <file>            YAML file with conversion options");
    eprintln!("  --lifecycles <list>        comma-separated: start,complete");
    eprintln!("  --include-rests            emit rest events");
    eprintln!("  --intervals                name events after semitone intervals");
    eprintln!("  --show-octave              octave-sensitive names");
    eprintln!("  --measure-as-event         one event per measure and lifecycle");
    eprintln!("  --harmony-shift-as-event   emit harmonic shifts instead of notes");
    eprintln!("  --multi-case               one case per part");
    eprintln!("  --lead-part-only           keep only the first part");
    process::exit(1);
}

struct Args {
    input_dir: PathBuf,
    output_dir: PathBuf,
    config: LogConfig,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut input_dir: Option<PathBuf> = None;
    let mut output_dir: Option<PathBuf> = None;
    let mut config = LogConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input-dir" => {
                i += 1;
                input_dir = args.get(i).map(PathBuf::from);
            }
            "--output-dir" => {
                i += 1;
                output_dir = args.get(i).map(PathBuf::from);
            }
            "--config" => {
                i += 1;
                let Some(path) = args.get(i) else { usage() };
                let source = match fs::read_to_string(path) {
                    Ok(source) => source,
                    Err(e) => {
                        eprintln!("Error reading config '{}': {}", path, e);
                        process::exit(1);
                    }
                };
                config = match serde_yaml::from_str(&source) {
                    Ok(config) => config,
                    Err(e) => {
                        eprintln!("Invalid config '{}': {}", path, e);
                        process::exit(1);
                    }
                };
            }
            "--lifecycles" => {
                i += 1;
                let Some(list) = args.get(i) else { usage() };
                config.lifecycles = parse_lifecycles(list);
            }
            "--include-rests" => config.include_rests = true,
            "--intervals" => config.intervals = true,
            "--show-octave" => config.show_octave = true,
            "--measure-as-event" => config.measure_as_event = true,
            "--harmony-shift-as-event" => config.harmony_shift_as_event = true,
            "--multi-case" => config.multi_case = true,
            "--lead-part-only" => config.lead_part_only = true,
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
            }
        }
        i += 1;
    }

    let (Some(input_dir), Some(output_dir)) = (input_dir, output_dir) else {
        usage()
    };

    Args {
        input_dir,
        output_dir,
        config,
    }
}

fn parse_lifecycles(list: &str) -> Vec<Lifecycle> {
    list.split(',')
        .map(|item| match item.trim() {
            "start" => Lifecycle::Start,
            "complete" => Lifecycle::Complete,
            other => {
                eprintln!("Unknown lifecycle: {}", other);
                process::exit(1);
            }
        })
        .collect()
}

/// Copy a failing input into the exception directory so a batch can be
/// triaged afterwards; a failure on one score never stops the batch.
fn route_to_exceptions(src: &Path, exception_dir: &Path) {
    if let Some(file_name) = src.file_name() {
        if let Err(e) = fs::copy(src, exception_dir.join(file_name)) {
            eprintln!("Could not copy {} to exceptions: {}", src.display(), e);
        }
    }
}

fn main() {
    let args = parse_args();

    let exception_dir = args.output_dir.join("exceptions");
    let too_big_dir = exception_dir.join("large_files");
    for dir in [&args.output_dir, &exception_dir, &too_big_dir] {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("Error creating '{}': {}", dir.display(), e);
            process::exit(1);
        }
    }

    let entries = match fs::read_dir(&args.input_dir) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error reading '{}': {}", args.input_dir.display(), e);
            process::exit(1);
        }
    };

    let mut good = 0u32;
    let mut bad = 0u32;

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }

        println!("{}", path.display());

        let output_path = args.output_dir.join(format!("{}.xes", stem));
        if output_path.exists() {
            println!("Song {} already processed.", stem);
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size > MAX_FILESIZE {
            println!("Song {} file too big", stem);
            route_to_exceptions(&path, &too_big_dir);
            bad += 1;
            continue;
        }

        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("Song {} could not be read: {}", stem, e);
                route_to_exceptions(&path, &exception_dir);
                bad += 1;
                continue;
            }
        };

        match convert(&source, &args.config) {
            Ok(xes) => {
                if let Err(e) = fs::write(&output_path, xes) {
                    eprintln!("Error writing '{}': {}", output_path.display(), e);
                    bad += 1;
                    continue;
                }
                good += 1;
            }
            Err(e) => {
                eprintln!("Song {} could not be converted: {}", stem, e);
                route_to_exceptions(&path, &exception_dir);
                bad += 1;
            }
        }

        println!("{} {}", good, bad);
    }

    println!("Finished: {} converted, {} failed", good, bad);
}
