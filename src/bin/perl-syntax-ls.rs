use anyhow::Result;
use clap::Parser;
use perl_syntax_validator::lsp::server::serve;
use perl_syntax_validator::{init_logging, Config, ConfigArgs};

/// Language server reporting Perl syntax errors as diagnostics
#[derive(Debug, Parser)]
#[command(name = "perl-syntax-ls")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.config.log_level);

    let config = Config::from_args(cli.config)?;
    serve(config).await
}
