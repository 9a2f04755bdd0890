// crates.io
use clap::Parser;
// self
use skos_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	skos_eval::run(args).await
}
