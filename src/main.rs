use discord_sso::domain_model::UserId;
use discord_sso::logger::*;
use discord_sso::provider::parse_profile;
use discord_sso::server::*;
use discord_sso::settings::*;
use std::fs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap()?;

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let server = Server::try_new(&project_settings).await?;

    let result = run(&server, cli.command).await;

    server.shutdown().await;
    result
}

async fn run(server: &Server, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Strategy => {
            let menu = discord_sso::provider::DiscordStrategy::admin_menu_item();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "strategy": server.strategy.descriptor(),
                    "admin_menu": menu,
                }))?
            );
        }
        Command::Resolve { profile } => {
            let body = fs::read_to_string(&profile)?;
            let profile = parse_profile(&body)?;
            let user_id = server.identity_service.resolve(&profile).await?;
            println!("{user_id}");
        }
        Command::Unlink { uid } => {
            let user_id: UserId = uid.parse()?;
            server.identity_service.unlink(user_id).await?;
            info!(%user_id, "unlinked");
        }
        Command::Association { uid } => {
            let user_id: UserId = uid.parse()?;
            let linked = server
                .identity_service
                .linked_external_id(user_id)
                .await?
                .is_some();
            println!(
                "{}",
                serde_json::to_string_pretty(&server.strategy.association(linked))?
            );
        }
    }
    Ok(())
}
