use anyhow::Result;
use clap::Parser;
use std::io::{BufRead, Write};

use crate::cli::{Cli, Commands};
use crate::handlers::App;
use crate::style;

const HELP: &str = "\
Commands are the same as on the command line, without the leading `svcmgr`:
  domain list | select <name> | delete <name>
  subdomain list | select <label> | delete <label>
  module list | add <type> | get | up | down | status | log <service>
         command <service> [cmd...] | delete | import-db <dump> | mysql | copy-web <dir>
`exit` or `quit` leaves the shell.";

/// Reads commands from `input` until EOF or `exit`.
///
/// A failing command prints its error and the prompt comes back.
pub fn run(app: &mut App, input: impl BufRead) -> Result<()> {
    let mut stdout = std::io::stdout();
    print_prompt(app, &mut stdout)?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        match trimmed {
            "" => {}
            "exit" | "quit" => break,
            "help" | "?" => println!("{HELP}"),
            _ => execute(app, trimmed),
        }
        print_prompt(app, &mut stdout)?;
    }
    println!();
    Ok(())
}

fn execute(app: &mut App, line: &str) {
    let Some(words) = shlex::split(line) else {
        println!("{} Unbalanced quotes", style::CROSS);
        return;
    };
    let argv = std::iter::once("svcmgr".to_string()).chain(words);
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(e) => {
            // Help and usage errors are rendered by clap itself.
            let _ = e.print();
            return;
        }
    };
    if matches!(cli.command, Commands::Shell) {
        return;
    }
    if let Err(e) = app.run(&cli.command) {
        println!("{} {:#}", style::CROSS, e);
    }
}

fn print_prompt(app: &App, out: &mut impl Write) -> Result<()> {
    let label = app.prompt();
    if label.is_empty() {
        write!(out, "svcmgr> ")?;
    } else {
        write!(out, "svcmgr [{label}]> ")?;
    }
    out.flush()?;
    Ok(())
}
