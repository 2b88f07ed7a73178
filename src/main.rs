use anyhow::anyhow;
use keyrelay::app::*;
use keyrelay::domain_model::ApiRequest;
use keyrelay::logger::*;
use keyrelay::settings::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    let logger_config = LogConfig::with_verbosity(&project_settings.log.filter, cli.verbose);
    logger.reload_from_config(&logger_config)?;

    let app = App::try_new(&project_settings, Arc::new(LoggingSessionEvents))?;

    let result = run(&app, cli.command).await;

    let shutdown_timeout = Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, app.shutdown()).await {
        Ok(_) => debug!("shutdown complete"),
        Err(_) => error!("shutdown timed out"),
    }

    result
}

async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    let session = &app.session;

    match command {
        Command::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Whoami => match session.bootstrap().await? {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None => return Err(anyhow!("not signed in")),
        },
        Command::Get { path } => {
            let response = session.client().send(ApiRequest::get(path)).await?;
            let status = response.status();
            let body = response.text().await?;
            println!("{body}");
            if !status.is_success() {
                return Err(anyhow!("request failed with status {status}"));
            }
        }
        Command::Logout => {
            session.logout().await?;
            info!("credentials cleared");
        }
    }

    Ok(())
}
