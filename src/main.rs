use std::sync::Arc;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dotenv::dotenv;
use uuid::Uuid;

use trotro::api::DynAPI;
use trotro::auth::TokenKeys;
use trotro::config::Config;
use trotro::db::{self, seed};
use trotro::engine::Engine;
use trotro::entities::Role;
use trotro::error::Error;
use trotro::server::serve;

fn cli() -> Command {
    Command::new("trotro")
        .about("Shared-minibus ride matching service")
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP and push server (default)")
                .arg(
                    Arg::new("no-seed")
                        .long("no-seed")
                        .help("Skip seeding reference data")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("seed").about("Insert the reference routes and demo members"))
        .subcommand(
            Command::new("clear-rides").about("Delete trips and bookings and park every vehicle"),
        )
        .subcommand(
            Command::new("token")
                .about("Issue a bearer token for a member")
                .arg(
                    Arg::new("role")
                        .long("role")
                        .required(true)
                        .value_parser(["driver", "passenger", "admin"]),
                )
                .arg(
                    Arg::new("member")
                        .long("member")
                        .help("Member id, defaults to the demo member for the role")
                        .value_parser(value_parser!(Uuid)),
                )
                .arg(
                    Arg::new("hours")
                        .long("hours")
                        .default_value("24")
                        .value_parser(value_parser!(i64)),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("seed", _)) => {
            config.require_persistent_store()?;

            let repo = db::connect(&config).await?;
            seed::seed(repo.as_ref()).await
        }
        Some(("clear-rides", _)) => {
            config.require_persistent_store()?;

            let repo = db::connect(&config).await?;
            repo.clear_rides().await?;

            tracing::info!("rides cleared");
            Ok(())
        }
        Some(("token", args)) => token(&config, args),
        Some(("serve", args)) => run(&config, !args.get_flag("no-seed")).await,
        _ => run(&config, true).await,
    }
}

async fn run(config: &Config, allow_seed: bool) -> Result<(), Error> {
    let repo = db::connect(config).await?;

    if config.seed && allow_seed {
        seed::seed(repo.as_ref()).await?;
    }

    let engine = Engine::new(repo)?;

    serve(Arc::new(engine) as DynAPI, config).await
}

fn token(config: &Config, args: &ArgMatches) -> Result<(), Error> {
    let (role, demo_id) = match args.get_one::<String>("role").map(String::as_str) {
        Some("driver") => (Role::Driver, seed::DEMO_DRIVER_ID),
        Some("admin") => (Role::Admin, seed::DEMO_ADMIN_ID),
        _ => (Role::Passenger, seed::DEMO_PASSENGER_ID),
    };

    let member = args.get_one::<Uuid>("member").copied().unwrap_or(demo_id);
    let hours = args.get_one::<i64>("hours").copied().unwrap_or(24);

    let keys = TokenKeys::new(&config.jwt_secret);
    let token = keys.issue(member, role, chrono::Duration::hours(hours))?;

    println!("{}", token);

    Ok(())
}
