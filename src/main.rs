use std::path::PathBuf;

use anyhow::{Result, anyhow};
use kernelforge::diagnostics::StderrSink;

#[derive(Debug, Default, Clone)]
struct Cli {
    input: Option<PathBuf>,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --input"));
                };
                cli.input = Some(PathBuf::from(v));
                i += 2;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --input <source.ts>)"
                ));
            }
        }
    }
    Ok(cli)
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&args)?;
    let Some(input) = cli.input else {
        return Err(anyhow!("usage: kernelforge --input <source.ts>"));
    };

    let src = std::fs::read_to_string(&input)
        .map_err(|e| anyhow!("failed to read {}: {e}", input.display()))?;

    let mut sink = StderrSink;
    let rewritten = kernelforge::compile_source(&src, &mut sink)?;
    println!("{rewritten}");
    Ok(())
}
