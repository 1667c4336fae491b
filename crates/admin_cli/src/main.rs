use std::error::Error;

use clap::{Args, Parser, Subcommand};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub username: String,
        pub password: String,
        pub display_name: String,
        pub phone_number: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "tabsplit_admin")]
#[command(about = "Admin utilities for Tabsplit (bootstrap users)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./tabsplit.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    /// Also read from `TABSPLIT_PASSWORD` to keep it out of shell history.
    #[arg(long, env = "TABSPLIT_PASSWORD")]
    password: String,
    #[arg(long)]
    display_name: Option<String>,
    #[arg(long)]
    phone_number: Option<String>,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            if args.password.is_empty() {
                eprintln!("password must not be empty");
                std::process::exit(2);
            }

            if users::Entity::find_by_id(args.username.clone())
                .one(&db)
                .await?
                .is_some()
            {
                eprintln!("user already exists: {}", args.username);
                std::process::exit(1);
            }

            let user = users::ActiveModel {
                username: Set(args.username.clone()),
                password: Set(args.password),
                display_name: Set(args
                    .display_name
                    .unwrap_or_else(|| args.username.clone())),
                phone_number: Set(args.phone_number),
            };
            users::Entity::insert(user).exec(&db).await?;

            println!("created user: {}", args.username);
        }
    }

    Ok(())
}
