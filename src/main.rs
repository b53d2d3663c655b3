use std::fs;
use std::io::{self, Read};

use anyhow::{Context as _, Result, bail};
use mython::interpreter;
use mython::lexer::Lexer;
use mython::parser::Parser;
use mython::runtime::object::StreamContext;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next();
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let lexer = Lexer::new(&source).context("Tokenizing input")?;
    let program = Parser::new(lexer)
        .parse_program()
        .context("Parsing input")?;

    let stdout = io::stdout();
    let mut context = StreamContext::new(stdout.lock());
    interpreter::run(&program, &mut context).context("Executing program")?;
    Ok(())
}
