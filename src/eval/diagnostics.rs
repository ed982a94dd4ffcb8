//! Diagnostics
//!
//! Maps interpreter errors raised while running a generated
//! compile-time program back to positions in the original source. The
//! interpreter reports `luajit: <path>:<line>: <message>`; the line
//! points into the generated program, which carries `--LINE:<n>`
//! comments recording the original line each statement came from.
//! Walking backward from the failing line to the nearest marker
//! recovers the source position. Without a marker the raw interpreter
//! output is surfaced unchanged.

use regex_lite::Regex;

use crate::emitter::errors::CompileError;

lazy_static::lazy_static! {
    /// `<path>:<line>: <message>` tail of an interpreter error line.
    static ref ERROR_LINE: Regex = Regex::new(r":(\d+): (.*)$").unwrap();

    /// Line marker emitted before statements in generated programs.
    static ref MARKER: Regex = Regex::new(r"^--LINE:(\d+)").unwrap();
}

/// Map captured interpreter stderr to a compile error.
pub fn map_interpreter_error(stderr: &str, program: &str, input_name: &str) -> CompileError {
    for line in stderr.lines() {
        let Some(caps) = ERROR_LINE.captures(line) else {
            continue;
        };
        let Ok(generated_line) = caps[1].parse::<usize>() else {
            continue;
        };
        let message = caps[2].to_string();
        if let Some(source_line) = nearest_marker(program, generated_line) {
            return CompileError::Diagnostic {
                file: input_name.to_string(),
                line: source_line,
                message,
            };
        }
        break;
    }
    CompileError::Interpreter(stderr.trim_end().to_string())
}

/// Find the nearest `--LINE:<n>` marker at or above `line` (1-based)
/// in the generated program.
pub fn nearest_marker(program: &str, line: usize) -> Option<usize> {
    let lines: Vec<&str> = program.lines().collect();
    let start = line.min(lines.len());
    for i in (0..start).rev() {
        if let Some(caps) = MARKER.captures(lines[i]) {
            return caps[1].parse().ok();
        }
    }
    None
}
