use super::*;
use clap::CommandFactory;
use movies_client::router::{AccessState, ROUTES};

struct Anonymous;

impl AccessState for Anonymous {
    fn is_logged_in(&self) -> bool {
        false
    }

    fn is_super_user(&self) -> bool {
        false
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn parses_login_and_global_overrides() {
    let cli = Cli::try_parse_from([
        "movies",
        "--base-url",
        "http://127.0.0.1:8000",
        "login",
        "--username",
        "a",
        "--password",
        "b",
    ])
    .unwrap();
    assert_eq!(cli.base_url.as_deref(), Some("http://127.0.0.1:8000"));
    assert!(matches!(cli.command, Command::Login { ref username, ref password } if username == "a" && password == "b"));
}

#[test]
fn movies_limit_defaults_to_list_size() {
    let cli = Cli::try_parse_from(["movies", "movies", "hot"]).unwrap();
    match cli.command {
        Command::Movies(MoviesCommand { command: MoviesSubcommand::Hot { limit } }) => {
            assert_eq!(limit, movies::DEFAULT_LIST_LIMIT);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn admin_update_user_flattens_fields() {
    let cli = Cli::try_parse_from(["movies", "admin", "update-user", "7", "--bio", "hi"]).unwrap();
    match cli.command {
        Command::Admin(AdminCommand { command: AdminSubcommand::UpdateUser { user_id, update } }) => {
            assert_eq!(user_id, 7);
            let patch: UserUpdate = update.into();
            assert_eq!(patch, UserUpdate { bio: Some("hi".into()), ..UserUpdate::default() });
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn describe_reports_guard_outcomes() {
    let router = Router::with_table(ROUTES, Arc::new(Anonymous));
    assert_eq!(describe(&router.navigate("/movie/3")), "allowed: movie-detail id=3");
    assert_eq!(describe(&router.navigate("/admin")), "redirected: admin -> home");
    assert_eq!(describe(&router.navigate("/nowhere")), "not found: /nowhere");
}

#[test]
fn load_config_applies_flag_overrides() {
    let config = load_config(Some("https://movies.test/"), Some(PathBuf::from("/tmp/t"))).unwrap();
    assert_eq!(config.base_url, "https://movies.test");
    assert_eq!(config.token_path, PathBuf::from("/tmp/t"));
    assert!(load_config(Some("movies.test"), None).is_err());
}
