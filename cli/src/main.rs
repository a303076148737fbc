use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use movies_client::config::{ClientConfig, ConfigError};
use movies_client::net::client::ApiClient;
use movies_client::net::error::{ApiError, AuthError};
use movies_client::net::types::{Credentials, RegisterRequest, ReviewCreate, UserUpdate};
use movies_client::net::{admin, movies};
use movies_client::router::{Navigation, RouteMatch, Router};
use movies_client::state::session::SessionStore;
use movies_client::state::token_store::FileTokenStore;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Api(String),
    #[error("{requested} is not available to this session (redirected to {target}); try `movies login`")]
    Redirected { requested: String, target: String },
    #[error("no page at {0}")]
    NotFound(String),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

fn api_error(err: ApiError) -> CliError {
    CliError::Api(err.display_message(&err.to_string()))
}

#[derive(Parser, Debug)]
#[command(name = "movies", about = "Movie service client")]
struct Cli {
    #[arg(long, env = "MOVIES_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "MOVIES_TOKEN_PATH")]
    token_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MOVIES_PASSWORD")]
        password: String,
    },
    /// Log in and remember the token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "MOVIES_PASSWORD")]
        password: String,
    },
    Logout,
    /// Show the current profile.
    Me,
    /// Update the current profile.
    UpdateMe(UpdateArgs),
    Movies(MoviesCommand),
    Reviews(ReviewsCommand),
    /// Show aggregate movie statistics.
    Stats,
    Admin(AdminCommand),
    /// Print where navigating to a page would land.
    Navigate { path: String },
}

#[derive(Args, Debug, Clone, Default)]
struct UpdateArgs {
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    avatar: Option<String>,
    #[arg(long)]
    bio: Option<String>,
}

impl From<UpdateArgs> for UserUpdate {
    fn from(args: UpdateArgs) -> Self {
        Self { username: args.username, email: args.email, password: args.password, avatar: args.avatar, bio: args.bio }
    }
}

#[derive(Args, Debug)]
struct MoviesCommand {
    #[command(subcommand)]
    command: MoviesSubcommand,
}

#[derive(Subcommand, Debug)]
enum MoviesSubcommand {
    Hot {
        #[arg(long, default_value_t = movies::DEFAULT_LIST_LIMIT)]
        limit: u32,
    },
    Rank {
        #[arg(long, default_value_t = movies::DEFAULT_LIST_LIMIT)]
        limit: u32,
    },
    Recommend {
        #[arg(long, default_value_t = movies::DEFAULT_LIST_LIMIT)]
        limit: u32,
    },
    Show {
        movie_id: i64,
    },
}

#[derive(Args, Debug)]
struct ReviewsCommand {
    #[command(subcommand)]
    command: ReviewsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReviewsSubcommand {
    Submit {
        movie_id: i64,
        #[arg(long)]
        rating: f64,
        #[arg(long)]
        content: Option<String>,
    },
    Show {
        movie_id: i64,
    },
    Delete {
        movie_id: i64,
    },
    Mine,
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Users,
    UpdateUser {
        user_id: i64,
        #[command(flatten)]
        update: UpdateArgs,
    },
    DeleteUser {
        user_id: i64,
    },
    UserReviews {
        user_id: i64,
    },
    DeleteReview {
        review_id: i64,
    },
}

struct CliContext {
    session: Arc<SessionStore>,
    router: Router<SessionStore>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.base_url.as_deref(), cli.token_path.clone())?;
    tracing::debug!(base_url = %config.base_url, token_path = %config.token_path.display(), "client configured");

    let api = Arc::new(ApiClient::from_config(&config).map_err(api_error)?);
    let session = Arc::new(SessionStore::new(api, Box::new(FileTokenStore::new(&config.token_path))));
    let ctx = CliContext { router: Router::new(session.clone()), session };

    match cli.command {
        Command::Register { username, email, password } => {
            let user = ctx.session.register(&RegisterRequest { username, email, password }).await?;
            print_json(&user)
        }
        Command::Login { username, password } => {
            ctx.session.login(&Credentials::new(username, password)).await?;
            print_json(&ctx.session.profile())
        }
        Command::Logout => {
            ctx.session.logout().await?;
            println!("logged out");
            Ok(())
        }
        Command::Me => {
            enter(&ctx, "/user", false).await?;
            print_json(&ctx.session.fetch_user_info().await?)
        }
        Command::UpdateMe(update) => {
            enter(&ctx, "/user", false).await?;
            print_json(&ctx.session.update_user_info(&update.into()).await?)
        }
        Command::Movies(cmd) => run_movies(&ctx, cmd).await,
        Command::Reviews(cmd) => run_reviews(&ctx, cmd).await,
        Command::Stats => {
            enter(&ctx, "/statistics", false).await?;
            print_json(&movies::statistics(ctx.session.api()).await.map_err(api_error)?)
        }
        Command::Admin(cmd) => run_admin(&ctx, cmd).await,
        Command::Navigate { path } => {
            refresh_profile(&ctx).await;
            println!("{}", describe(&ctx.router.navigate(&path)));
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_config(base_url: Option<&str>, token_path: Option<PathBuf>) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(token_path) = token_path {
        config = config.with_token_path(token_path);
    }
    Ok(config)
}

// =============================================================================
// NAVIGATION
// =============================================================================

/// The profile is memory-only, so role checks need a fresh fetch per process.
async fn refresh_profile(ctx: &CliContext) {
    if ctx.session.is_logged_in() {
        if let Err(e) = ctx.session.fetch_user_info().await {
            tracing::warn!(error = %e, "could not refresh profile");
        }
    }
}

/// Navigate to `path` and fail unless the guard lets the session in.
async fn enter(ctx: &CliContext, path: &str, needs_role: bool) -> Result<RouteMatch, CliError> {
    if needs_role {
        refresh_profile(ctx).await;
    }
    match ctx.router.navigate(path) {
        Navigation::Allowed(route) => Ok(route),
        Navigation::Redirected { requested, target } => Err(CliError::Redirected {
            requested: requested.route.path.to_owned(),
            target: target.route.path.to_owned(),
        }),
        Navigation::NotFound(path) => Err(CliError::NotFound(path)),
    }
}

fn describe(nav: &Navigation) -> String {
    match nav {
        Navigation::Allowed(route) => format!("allowed: {}{}", route.route.name, format_params(route)),
        Navigation::Redirected { requested, target } => {
            format!("redirected: {} -> {}", requested.route.name, target.route.name)
        }
        Navigation::NotFound(path) => format!("not found: {path}"),
    }
}

fn format_params(route: &RouteMatch) -> String {
    route.params.iter().map(|(key, value)| format!(" {key}={value}")).collect()
}

// =============================================================================
// PAGES
// =============================================================================

async fn run_movies(ctx: &CliContext, cmd: MoviesCommand) -> Result<(), CliError> {
    let api = ctx.session.api();
    match cmd.command {
        MoviesSubcommand::Hot { limit } => {
            enter(ctx, "/hot", false).await?;
            print_json(&movies::hot_movies(api, limit).await.map_err(api_error)?)
        }
        MoviesSubcommand::Rank { limit } => {
            enter(ctx, "/rank", false).await?;
            print_json(&movies::ranked_movies(api, limit).await.map_err(api_error)?)
        }
        MoviesSubcommand::Recommend { limit } => {
            enter(ctx, "/recommend", false).await?;
            print_json(&movies::recommended_movies(api, limit).await.map_err(api_error)?)
        }
        MoviesSubcommand::Show { movie_id } => {
            enter(ctx, &format!("/movie/{movie_id}"), false).await?;
            print_json(&movies::movie_detail(api, movie_id).await.map_err(api_error)?)
        }
    }
}

async fn run_reviews(ctx: &CliContext, cmd: ReviewsCommand) -> Result<(), CliError> {
    let api = ctx.session.api();
    match cmd.command {
        ReviewsSubcommand::Submit { movie_id, rating, content } => {
            enter(ctx, &format!("/movie/{movie_id}"), false).await?;
            let review = ReviewCreate { rating, content };
            print_json(&movies::submit_review(api, movie_id, &review).await.map_err(api_error)?)
        }
        ReviewsSubcommand::Show { movie_id } => {
            enter(ctx, &format!("/movie/{movie_id}"), false).await?;
            print_json(&movies::my_review(api, movie_id).await.map_err(api_error)?)
        }
        ReviewsSubcommand::Delete { movie_id } => {
            enter(ctx, &format!("/movie/{movie_id}"), false).await?;
            movies::delete_my_review(api, movie_id).await.map_err(api_error)?;
            println!("review deleted");
            Ok(())
        }
        ReviewsSubcommand::Mine => {
            enter(ctx, "/user", false).await?;
            print_json(&movies::my_reviews(api).await.map_err(api_error)?)
        }
    }
}

async fn run_admin(ctx: &CliContext, cmd: AdminCommand) -> Result<(), CliError> {
    enter(ctx, "/admin", true).await?;
    let api = ctx.session.api();
    match cmd.command {
        AdminSubcommand::Users => print_json(&admin::list_users(api).await.map_err(api_error)?),
        AdminSubcommand::UpdateUser { user_id, update } => {
            print_json(&admin::update_user(api, user_id, &update.into()).await.map_err(api_error)?)
        }
        AdminSubcommand::DeleteUser { user_id } => {
            admin::delete_user(api, user_id).await.map_err(api_error)?;
            println!("user {user_id} deleted");
            Ok(())
        }
        AdminSubcommand::UserReviews { user_id } => {
            print_json(&admin::user_reviews(api, user_id).await.map_err(api_error)?)
        }
        AdminSubcommand::DeleteReview { review_id } => {
            admin::delete_review(api, review_id).await.map_err(api_error)?;
            println!("review {review_id} deleted");
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
