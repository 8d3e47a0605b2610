use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = inst_api::Args::parse();

	inst_api::run(args).await
}
