//! Headless `--compile` mode: compile a building spec once and print the report
//! JSON. Messages go to stderr so stdout stays machine-readable.

use std::io::Write;
use std::path::Path;

use facade::{compile, CompileOutput, FacadeError};

use crate::cli::{Cli, Inputs};

/// Exit status of a headless run.
pub const EXIT_OK: i32 = 0;
pub const EXIT_INVALID_SPEC: i32 = 1;
pub const EXIT_IO: i32 = 2;

pub fn compile_inputs(inputs: &Inputs) -> Result<CompileOutput, FacadeError> {
    compile(&inputs.spec, &inputs.placement, &inputs.registry, &inputs.params)
}

fn write_report(json: &str, output: Option<&Path>) -> std::io::Result<()> {
    match output {
        Some(path) => std::fs::write(path, json),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
            stdout.flush()
        }
    }
}

pub fn run_compile_mode(cli: &Cli) -> i32 {
    let inputs = match cli.load() {
        Ok(inputs) => inputs,
        Err(err) => {
            eprintln!("facade-viewer: {err}");
            return EXIT_IO;
        }
    };

    let output = match compile_inputs(&inputs) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("facade-viewer: {err}");
            return EXIT_INVALID_SPEC;
        }
    };

    let report = &output.report;
    for diagnostic in &report.diagnostics {
        eprintln!("facade-viewer: warning: {diagnostic}");
    }
    eprintln!(
        "facade-viewer: {} openings, {} triangles, fingerprint {:08x}",
        report.openings.len(),
        report.triangle_count,
        report.fingerprint
    );

    let json = match report.to_json() {
        Ok(json) => json,
        Err(err) => {
            eprintln!("facade-viewer: report serialization failed: {err}");
            return EXIT_IO;
        }
    };
    match write_report(&json, cli.output.as_deref()) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            eprintln!("facade-viewer: writing report: {err}");
            EXIT_IO
        }
    }
}
