use merisier::exchange::ExchangeSchema;
use merisier::generator::to_sql;
use merisier::logical::to_logical;
use merisier::markdown::{self, ValidateOptions};
use merisier::mpd::{Dialect, to_physical};
use merisier::sql::{analyze_sql, suggest_optimizations, validate_schema};
use std::env;
use std::fs;
use std::process;

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <input.md> [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  -o, --output <file>      Output file (default: stdout)");
        eprintln!("  -d, --dialect <name>     mysql, postgresql or sqlite (default: mysql)");
        eprintln!("      --validate           Print MCD validation errors and exit");
        eprintln!("      --exchange           Emit the canvas exchange JSON instead of SQL");
        eprintln!("      --inspect            Treat input as SQL DDL and print the report");
        process::exit(1);
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut dialect = Dialect::MySql;
    let mut validate = false;
    let mut exchange = false;
    let mut inspect = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            "-d" | "--dialect" => {
                i += 1;
                if i < args.len() {
                    dialect = Dialect::parse(&args[i]).unwrap_or_else(|e| {
                        eprintln!("{e}");
                        process::exit(1);
                    });
                }
            }
            "--validate" => validate = true,
            "--exchange" => exchange = true,
            "--inspect" => inspect = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input = match fs::read_to_string(input_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {input_path}: {e}");
            process::exit(1);
        }
    };

    let output = if inspect {
        inspect_report(&input)
    } else {
        compile(&input, dialect, validate, exchange)
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &output) {
                eprintln!("Failed to write {path}: {e}");
                process::exit(1);
            }
        }
        None => print!("{output}"),
    }
}

fn compile(input: &str, dialect: Dialect, validate: bool, exchange: bool) -> String {
    let outcome = markdown::parse(input);
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }

    if validate {
        let errors = markdown::validate(&outcome.schema, &ValidateOptions::default());
        if errors.is_empty() {
            return format!("schema valid (precision {:.1}%)\n", outcome.schema.precision);
        }
        for error in &errors {
            eprintln!("error: {error}");
        }
        process::exit(1);
    }

    if exchange {
        let payload = ExchangeSchema::from_conceptual(&outcome.schema);
        return serde_json::to_string_pretty(&payload)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .unwrap_or_else(|e| {
                eprintln!("Failed to serialize exchange format: {e}");
                process::exit(1);
            });
    }

    let logical = match to_logical(&outcome.schema) {
        Ok(logical) => logical,
        Err(e) => {
            eprintln!("Conversion error: {e}");
            process::exit(1);
        }
    };
    to_sql(&to_physical(&logical, dialect))
}

fn inspect_report(input: &str) -> String {
    let schema = analyze_sql(input);
    let report = serde_json::json!({
        "issues": validate_schema(&schema),
        "suggestions": suggest_optimizations(&schema),
    });
    match serde_json::to_string_pretty(&report) {
        Ok(mut s) => {
            s.push('\n');
            s
        }
        Err(e) => {
            eprintln!("Failed to serialize report: {e}");
            process::exit(1);
        }
    }
}
