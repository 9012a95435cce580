use anyhow::Result;
use is_terminal::IsTerminal;
use std::io::{self, BufWriter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use setkeeper::commands::execute;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = setkeeper::args::parsed();
    let stdout = anstream::AutoStream::new(io::stdout().lock(), args.color.into());
    if io::stdout().is_terminal() {
        let mut stdout = stdout;
        execute(args, &mut stdout)
    } else {
        execute(args, &mut BufWriter::new(stdout))
    }
}
