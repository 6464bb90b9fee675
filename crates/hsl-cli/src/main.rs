//! HSL compiler driver - compiles HSL shaders into GPU dialect text.

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use colored::Colorize;
use hsl_codegen::CompileTarget;

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None => print_usage(),
        Some("lex") => match args.get(2) {
            Some(path) => cmd_lex(path),
            None => fail("usage: hslc lex <file.hsl>"),
        },
        Some("parse") => match args.get(2) {
            Some(path) => cmd_parse(path),
            None => fail("usage: hslc parse <file.hsl>"),
        },
        Some("help" | "--help" | "-h") => print_usage(),
        Some("version" | "--version" | "-V") => println!("hslc 0.1.0"),
        Some(_) if args.len() == 4 => cmd_compile(&args[1], &args[2], &args[3]),
        Some(other) => {
            eprintln!("{} unknown command `{}`", "error:".red().bold(), other);
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("hslc 0.1.0 - HSL shader cross-compiler");
    println!();
    println!("Usage: hslc <input.hsl> <target> <output>");
    println!();
    println!("Targets: opengl, vulkan, hlsl");
    println!();
    println!("Commands:");
    println!("  lex <file>    Tokenize a file and print tokens");
    println!("  parse <file>  Parse a file and print the node tree");
    println!("  help          Show this help");
    println!("  version       Show version");
}

fn cmd_compile(input: &str, target: &str, output: &str) {
    let target: CompileTarget = match target.parse() {
        Ok(target) => target,
        Err(message) => fail(&message),
    };
    match hsl_codegen::compile_from_file(Path::new(input), target) {
        Ok(text) => {
            if let Err(e) = fs::write(output, text) {
                fail(&format!("cannot write {}: {}", output, e));
            }
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn cmd_lex(path: &str) {
    let source = read_source(path);
    let tokens = hsl_lexer::lex(&source);
    for (i, token) in tokens.iter().enumerate() {
        println!("{:4} {:<12} {}", i, format!("{:?}", token.kind), token.text);
    }
    println!("\n{} tokens", tokens.len());
}

fn cmd_parse(path: &str) {
    let source = read_source(path);
    let tokens = hsl_lexer::lex(&source);
    match hsl_parser::parse(tokens) {
        Ok(root) => println!("{:#?}", root),
        Err(e) => fail(&format!("parse error at token {}: {}", e.token, e)),
    }
}

fn read_source(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => fail(&format!("cannot read {}: {}", path, e)),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", "error:".red().bold(), message);
    process::exit(1);
}
