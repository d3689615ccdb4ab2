use chorus::{
    app::{App, cli::Cli},
    errors::AppError,
    logging,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<(), AppError> {
    let cli = Cli::parse();
    if cli.args.print_log_dir {
        println!("Log directory: {}", logging::get_data_dir().display());
        return Ok(());
    }
    if let Some(ref token) = cli.args.set_token {
        App::store_token(token)?;
        return Ok(());
    }

    let mut app = App::new(cli).await?;
    app.run().await
}
