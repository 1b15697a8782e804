use std::process;
use std::sync::Arc;

use brezza::{
    application::error::AppError,
    application::search::builder::SearchIndexBuilder,
    config,
    infra::{content::FsContentStore, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let store = FsContentStore::new(settings.content.dir.clone());
    let builder = SearchIndexBuilder::new(Arc::new(store), settings.content.prefix.clone());

    let documents = builder.build().await?;
    builder
        .write_index(&documents, &settings.content.output)
        .await?;

    info!(
        documents = documents.len(),
        output = %settings.content.output.display(),
        "search index written"
    );
    Ok(())
}
