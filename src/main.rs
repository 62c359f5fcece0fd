// main.rs - Mieliepit REPL

use mieliepit::bootstrap::{LineError, Machine};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result};
use std::env;
use std::fs;
use std::process;

fn main() -> Result<()> {
    println!("Mieliepit v0.1.0");
    println!("Type guide for an introduction, exit to leave");
    println!();

    let mut machine = Machine::new();
    if let Err(e) = machine.install_prelude() {
        eprintln!("Error loading prelude: {}", e);
        process::exit(1);
    }

    // Evaluate files named on the command line before the REPL starts
    let args: Vec<String> = env::args().collect();
    for path in args.iter().skip(1) {
        if let Err(code) = eval_file(&mut machine, path) {
            process::exit(code);
        }
        println!("Loaded: {}", path);
        if machine.quit_requested() {
            return Ok(());
        }
    }

    // Create readline editor with history
    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".mieliepit_history");
        p
    });

    if let Some(ref path) = history_file {
        let _ = rl.load_history(path);
    }

    loop {
        let readline = rl.readline("> ");

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                let result = machine.eval_line(&line);
                print!("{}", machine.take_output());
                match result {
                    Ok(()) => println!("ok"),
                    Err(e) => print_line_error(&line, &e),
                }

                if machine.quit_requested() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_file {
        let _ = rl.save_history(path);
    }

    Ok(())
}

fn eval_file(machine: &mut Machine, path: &str) -> std::result::Result<(), i32> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            return Err(1);
        }
    };
    for line in contents.lines() {
        let result = machine.eval_line(line);
        print!("{}", machine.take_output());
        if let Err(e) = result {
            print_line_error(line, &e);
            return Err(1);
        }
        if machine.quit_requested() {
            break;
        }
    }
    Ok(())
}

/// The error, the line, and a caret under the token the interpreter stopped
/// on.
fn print_line_error(line: &str, error: &LineError) {
    println!("{}", error.message);
    match &error.token {
        Some((offset, text)) => {
            println!("  {}", line);
            println!("  {}^ {}", " ".repeat(*offset), text);
        }
        None => println!("  @ end of line"),
    }
}
