use std::future::Future;
use std::io;
use std::process::ExitCode;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use super::app::{App, Commands, DownloadArg, GetArg, UploadArg};
use crate::{
    ArtifactClient, ArtifactError, CancellationToken, ClientConfig, DownloadOptions, HttpClient, TransferResult,
    UploadOptions,
};

/// Execute one parsed command line. Results go to stdout as JSON; a failed
/// operation prints its failure record and exits non-zero.
pub async fn run(app: App) -> anyhow::Result<ExitCode> {
    let config_path = app.config.as_deref();

    if let Commands::Config = app.cmd {
        let config: ClientConfig = ClientConfig::figment(config_path)
            .extract()
            .context("failed to read configuration")?;
        print!("{}", config.to_redacted_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    let config = ClientConfig::load(config_path).context("failed to load configuration")?;
    let cancel = CancellationToken::new();
    let client = ArtifactClient::from_config(config)
        .context("failed to set up the artifact client")?
        .with_cancellation(cancel.clone());

    let stop = stop_requested().context("failed to install signal handlers")?;
    tokio::spawn(async move {
        let signal = stop.await;
        warn!(signal, "interrupted, stopping after the current attempt");
        cancel.cancel();
    });

    match execute(&client, app.cmd).await {
        Ok(value) => {
            emit(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(kind = %err.kind(), "{err}");
            emit(&TransferResult::failed(&err))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Resolves with the signal's name once the process is asked to stop.
#[cfg(unix)]
fn stop_requested() -> io::Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        }
    })
}

#[cfg(not(unix))]
fn stop_requested() -> io::Result<impl Future<Output = &'static str>> {
    Ok(async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    })
}

async fn execute<C: HttpClient + 'static>(
    client: &ArtifactClient<C>,
    cmd: Commands,
) -> Result<Value, ArtifactError> {
    match cmd {
        Commands::Upload(UploadArg {
            name,
            patterns,
            retention_days,
            compress,
            working_dir,
        }) => {
            let mut options = UploadOptions::default().compress(compress);
            if let Some(days) = retention_days {
                options = options.retention_days(days);
            }
            if let Some(dir) = working_dir {
                options = options.working_dir(dir);
            }
            to_value(&client.upload(&name, &patterns, options).await?)
        }
        Commands::List(arg) => to_value(&client.list_all(arg.pattern.as_deref()).await?),
        Commands::Get(GetArg { id: Some(id), .. }) => to_value(&client.get(&id).await?),
        Commands::Get(GetArg { name: Some(name), .. }) => match client.find(&name).await? {
            Some(descriptor) => to_value(&descriptor),
            None => Err(ArtifactError::NotFound { id: name }),
        },
        Commands::Get(GetArg { id: None, name: None }) => {
            Err(ArtifactError::InvalidRequest { reason: "an artifact id or --name is required".into() })
        }
        Commands::Download(DownloadArg {
            id,
            destination,
            no_verify,
            checksum,
            extract,
        }) => {
            let mut options = DownloadOptions::default().verify_checksum(!no_verify).extract(extract);
            if let Some(checksum) = checksum {
                options = options.expected_checksum(checksum);
            }
            to_value(&client.download(&id, &destination, options).await?)
        }
        Commands::Delete(arg) => to_value(&client.delete(&arg.id).await?),
        Commands::Config => Err(ArtifactError::InvalidRequest { reason: "config is handled before the client is built".into() }),
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ArtifactError> {
    serde_json::to_value(value).map_err(|err| ArtifactError::Protocol {
        operation: "output",
        reason:    err.to_string(),
    })
}

fn emit(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
