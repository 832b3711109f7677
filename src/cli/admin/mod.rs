//! Admin commands - one store operation per invocation

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::cli::Command;
use crate::config::{AppConfig, StorageBackend};
use crate::domain::{RoleName, UserId};
use crate::infrastructure::identity::IdentityService;
use crate::infrastructure::logging;

/// Load configuration, open the store and run `command`
pub async fn run(command: Command) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    if command == Command::Init && config.storage.backend == StorageBackend::Postgres {
        let store = crate::connect_postgres(&config.storage).await?;
        store.init_schema().await?;
    }

    let service = crate::create_identity_service(&config).await?;
    execute(&service, command).await
}

/// Run a single command against an open service
pub async fn execute(service: &IdentityService, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init | Command::SeedRoles => {
            let roles = service.seed_roles().await?;
            print_json(&roles)
        }
        Command::CreateUser {
            username,
            email,
            password,
        } => {
            let user = service.register(&username, &email, &password).await?;
            info!(user_id = %user.id(), "User registered");
            print_json(&user)
        }
        Command::ShowUser { username } => {
            let user = service.find_by_username(&username).await?;
            let mut roles: Vec<RoleName> = service
                .roles_of(user.id())
                .await?
                .iter()
                .map(|r| r.name())
                .collect();
            roles.sort();

            print_json(&json!({ "user": user, "roles": roles }))
        }
        Command::ListUsers => print_json(&service.list_users().await?),
        Command::DeleteUser { id } => {
            let deleted = service.delete_user(UserId::new(id)).await?;
            print_json(&json!({ "deleted": deleted }))
        }
        Command::FindRole { name } => {
            let name = name.parse::<RoleName>()?;
            print_json(&service.find_role_by_name(name).await?)
        }
        Command::Assign { user_id, role } => {
            let role = service.resolve_role(&role).await?;
            service.assign(UserId::new(user_id), role.id()).await?;
            print_json(&json!({ "user_id": user_id, "assigned": role }))
        }
        Command::Revoke { user_id, role } => {
            let role = service.resolve_role(&role).await?;
            service.revoke(UserId::new(user_id), role.id()).await?;
            print_json(&json!({ "user_id": user_id, "revoked": role }))
        }
        Command::Roles { user_id } => {
            let mut roles: Vec<_> = service
                .roles_of(UserId::new(user_id))
                .await?
                .into_iter()
                .collect();
            roles.sort_by_key(|r| r.id());

            print_json(&roles)
        }
        Command::Members { role } => {
            let role = service.resolve_role(&role).await?;
            let mut users = service.users_of(role.id()).await?;
            users.sort_by_key(|u| u.id());

            print_json(&users)
        }
        Command::Verify { username, password } => {
            let user = service.authenticate(&username, &password).await?;
            print_json(&json!({
                "authenticated": user.is_some(),
                "user_id": user.map(|u| u.id()),
            }))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
