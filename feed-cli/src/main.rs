use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use feed_client::{
    ComposeTarget, Composer, FeedClient, FeedClientError, FeedFilter, FeedPaginator,
    FileTokenStore, FindUserInput, LoadStatus, SignInForm, SignUpForm, Tweet, TweetInteraction,
    User,
};
use tracing::{debug, warn};

mod logging;
mod output;
mod settings;

use logging::init_logging;
use output::{format_field_errors, print_counters, print_feed, print_tweet, print_user};
use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "feed-cli", version, about = "CLI клиент социальной ленты")]
struct Cli {
    /// Адрес GraphQL эндпоинта (перекрывает FEED_API_URL).
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Вход по email и паролю.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Регистрация.
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Дата рождения в формате YYYY-MM-DD.
        #[arg(long)]
        birthday: NaiveDate,
    },
    /// Выход: удаляет сохранённые токены.
    Logout,
    /// Текущий пользователь.
    Whoami,
    /// Лента твитов.
    ///
    /// Без флагов показывается глобальная лента.
    Timeline {
        /// Только подписки (требует вход).
        #[arg(long, conflicts_with_all = ["user", "replies_to"])]
        following: bool,
        /// Твиты и ретвиты пользователя.
        #[arg(long, conflicts_with = "replies_to")]
        user: Option<String>,
        /// Ответы на твит.
        #[arg(long)]
        replies_to: Option<String>,
        /// Сколько страниц загрузить.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Новый твит (требует вход).
    Tweet {
        #[arg(long)]
        text: String,
    },
    /// Ответ на твит (требует вход).
    Reply {
        #[arg(long)]
        id: String,
        #[arg(long)]
        text: String,
    },
    /// Лайк или снятие лайка (требует вход).
    Like {
        #[arg(long)]
        id: String,
    },
    /// Ретвит или его отмена (требует вход).
    Retweet {
        #[arg(long)]
        id: String,
    },
    /// Удаление своего твита (требует вход).
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Подписка на пользователя или отписка (требует вход).
    Follow {
        #[arg(long)]
        username: String,
    },
    /// Твит и ответы на него.
    ShowTweet {
        #[arg(long)]
        id: String,
    },
    /// Профиль пользователя и его твиты.
    ShowUser {
        #[arg(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;
    init_logging(&settings.log_level)?;

    let endpoint = resolve_endpoint(cli.server, &settings.api_url);
    debug!(%endpoint, token_file = %settings.token_file.display(), "starting");
    let store = Arc::new(FileTokenStore::new(settings.token_file.clone()));
    let client = FeedClient::http(
        endpoint,
        Duration::from_secs(settings.http_timeout_secs),
        store,
    )
    .context("не удалось создать HTTP клиент")?;

    if !matches!(
        cli.command,
        Command::Login { .. } | Command::Signup { .. } | Command::Logout
    ) {
        match client.restore_session().await {
            Ok(_) => {}
            Err(err) if !requires_session(&cli.command) => {
                warn!(error = %err, "session not restored, continuing anonymously");
            }
            Err(err) => return Err(map_client_error(err)),
        }
    }

    match cli.command {
        Command::Login { email, password } => {
            let mut form = SignInForm::new();
            form.set_email(email);
            form.set_password(password);
            let user = form.submit(&client).await.map_err(map_client_error)?;
            print_user("Вход выполнен", &user);
        }
        Command::Signup {
            name,
            email,
            username,
            password,
            birthday,
        } => {
            let mut form = SignUpForm::new();
            form.set_name(name);
            form.set_email(&email);
            form.set_username(&username);
            form.set_password(&password);
            form.set_birthday(birthday);

            let email_taken = form.check_email(&client).await.map_err(map_client_error)?;
            let username_taken = form
                .check_username(&client)
                .await
                .map_err(map_client_error)?;
            if email_taken || username_taken {
                let errors: Vec<_> = form.errors().iter().cloned().collect();
                return Err(anyhow!(
                    "регистрация невозможна: {}",
                    format_field_errors(&errors)
                ));
            }

            match form.submit(&client).await {
                Ok(user) => print_user("Регистрация успешна", &user),
                Err(FeedClientError::InvalidInput(_)) => {
                    let errors: Vec<_> = form.errors().iter().cloned().collect();
                    return Err(anyhow!(
                        "некорректные данные: {}",
                        format_field_errors(&errors)
                    ));
                }
                Err(err) => return Err(map_client_error(err)),
            }
        }
        Command::Logout => {
            client.logout().map_err(map_client_error)?;
            println!("Выход выполнен");
        }
        Command::Whoami => match client.session().current_user() {
            Some(user) => print_user("Вы вошли как", &user),
            None => println!("Вход не выполнен"),
        },
        Command::Timeline {
            following,
            user,
            replies_to,
            pages,
        } => {
            let filter = if following {
                FeedFilter::following(&require_user(&client)?)
            } else if let Some(username) = user {
                FeedFilter::Profile {
                    username: username.to_lowercase(),
                }
            } else if let Some(tweet_id) = replies_to {
                FeedFilter::Replies { tweet_id }
            } else {
                FeedFilter::Global
            };
            let feed = load_feed(&client, filter, settings.page_size, pages).await?;
            let viewer = client.session().current_user();
            print_feed("Твиты", feed.tweets(), feed.total_count(), viewer.as_ref());
        }
        Command::Tweet { text } => {
            require_user(&client)?;
            let tweet = publish(&client, ComposeTarget::Tweet, text).await?;
            println!("Твит опубликован");
            print_tweet(&tweet, client.session().current_user().as_ref(), Utc::now());
        }
        Command::Reply { id, text } => {
            require_user(&client)?;
            let tweet = publish(&client, ComposeTarget::Reply { tweet_id: id }, text).await?;
            println!("Ответ опубликован");
            print_tweet(&tweet, client.session().current_user().as_ref(), Utc::now());
        }
        Command::Like { id } => {
            let mut state = interaction(&client, &id).await?;
            state.like(&client).await.map_err(map_client_error)?;
            println!(
                "{}: {id}",
                if state.is_liked() { "Лайк поставлен" } else { "Лайк снят" }
            );
            print_counters(&state);
        }
        Command::Retweet { id } => {
            let mut state = interaction(&client, &id).await?;
            state.retweet(&client).await.map_err(map_client_error)?;
            println!(
                "{}: {id}",
                if state.is_retweeted() { "Ретвит сделан" } else { "Ретвит отменён" }
            );
            print_counters(&state);
        }
        Command::Delete { id } => {
            let state = interaction(&client, &id).await?;
            state.delete(&client, None).await.map_err(map_client_error)?;
            println!("Твит удалён: id={id}");
        }
        Command::Follow { username } => {
            let me = require_user(&client)?;
            let target = find_user(&client, &username).await?;
            if target.id == me.id {
                return Err(anyhow!("нельзя подписаться на самого себя"));
            }
            let target = client
                .follow_user(&target.id)
                .await
                .map_err(map_client_error)?;
            if target.is_followed_by(&me.id) {
                println!("Вы подписаны на @{}", target.username);
            } else {
                println!("Вы отписались от @{}", target.username);
            }
        }
        Command::ShowTweet { id } => {
            let tweet = find_tweet(&client, &id).await?;
            let viewer = client.session().current_user();
            print_tweet(&tweet, viewer.as_ref(), Utc::now());

            let replies = load_feed(
                &client,
                FeedFilter::Replies { tweet_id: tweet.id },
                settings.page_size,
                1,
            )
            .await?;
            println!();
            print_feed(
                "Ответы",
                replies.tweets(),
                replies.total_count(),
                viewer.as_ref(),
            );
        }
        Command::ShowUser { username } => {
            let user = find_user(&client, &username).await?;
            print_user("Профиль", &user);
            if let Some(me) = client.session().current_user()
                && me.id != user.id
            {
                let relation = if me.follows(&user.id) {
                    "вы подписаны"
                } else {
                    "вы не подписаны"
                };
                println!("{relation}");
            }

            let feed = load_feed(
                &client,
                FeedFilter::Profile {
                    username: user.username.clone(),
                },
                settings.page_size,
                1,
            )
            .await?;
            println!();
            let viewer = client.session().current_user();
            print_feed("Твиты", feed.tweets(), feed.total_count(), viewer.as_ref());
        }
    }

    Ok(())
}

fn resolve_endpoint(server: Option<String>, configured: &str) -> String {
    let raw = server.unwrap_or_else(|| configured.to_string());
    normalize_server(raw)
}

fn normalize_server(server: String) -> String {
    let server = if server.starts_with("http://") || server.starts_with("https://") {
        server
    } else {
        format!("http://{server}")
    };

    if server.trim_end_matches('/').ends_with("/graphql") {
        return server;
    }
    format!("{}/graphql", server.trim_end_matches('/'))
}

fn require_user(client: &FeedClient) -> Result<User> {
    client
        .session()
        .current_user()
        .ok_or_else(|| map_client_error(FeedClientError::NotSignedIn))
}

async fn load_feed(
    client: &FeedClient,
    filter: FeedFilter,
    page_size: u32,
    pages: u32,
) -> Result<FeedPaginator> {
    let mut feed = FeedPaginator::with_page_size(client.clone(), filter, page_size);
    for _ in 0..pages.max(1) {
        match feed.load().await.map_err(map_client_error)? {
            LoadStatus::Loaded { end: true, .. } | LoadStatus::Skipped => break,
            LoadStatus::Loaded { .. } | LoadStatus::Discarded => {}
        }
    }
    Ok(feed)
}

async fn publish(client: &FeedClient, target: ComposeTarget, text: String) -> Result<Tweet> {
    let mut composer = Composer::new(target);
    if !composer.set_text(text) {
        return Err(anyhow!(
            "текст длиннее {} символов",
            feed_client::MAX_TWEET_LENGTH
        ));
    }
    match composer.submit(client, None).await {
        Ok(tweet) => Ok(tweet),
        Err(err) if err.is_validation() => {
            let errors: Vec<_> = composer.errors().iter().cloned().collect();
            Err(anyhow!("твит отклонён: {}", format_field_errors(&errors)))
        }
        Err(err) => Err(map_client_error(err)),
    }
}

async fn interaction(client: &FeedClient, tweet_id: &str) -> Result<TweetInteraction> {
    let viewer = require_user(client)?;
    let tweet = find_tweet(client, tweet_id).await?;
    Ok(TweetInteraction::new(tweet, Some(&viewer)))
}

async fn find_tweet(client: &FeedClient, tweet_id: &str) -> Result<Tweet> {
    client
        .find_tweet(tweet_id)
        .await
        .map_err(map_client_error)?
        .ok_or_else(|| anyhow!("твит не найден: id={tweet_id}"))
}

async fn find_user(client: &FeedClient, username: &str) -> Result<User> {
    let username = username.trim_start_matches('@').to_lowercase();
    client
        .find_user(&FindUserInput::Username(username.clone()))
        .await
        .map_err(map_client_error)?
        .ok_or_else(|| anyhow!("пользователь не найден: @{username}"))
}

/// Команды, которые без профиля пользователя не имеют смысла.
fn requires_session(command: &Command) -> bool {
    match command {
        Command::Whoami
        | Command::Tweet { .. }
        | Command::Reply { .. }
        | Command::Like { .. }
        | Command::Retweet { .. }
        | Command::Delete { .. }
        | Command::Follow { .. } => true,
        Command::Timeline { following, .. } => *following,
        Command::Login { .. }
        | Command::Signup { .. }
        | Command::Logout
        | Command::ShowTweet { .. }
        | Command::ShowUser { .. } => false,
    }
}

fn map_client_error(err: FeedClientError) -> anyhow::Error {
    if err.is_unauthorized() {
        return anyhow!(
            "требуется авторизация: выполните `feed-cli login ...` или `feed-cli signup ...`"
        );
    }
    if err.is_validation() {
        return anyhow!(
            "некорректный запрос: {}",
            format_field_errors(&err.field_errors())
        );
    }

    let message = match err {
        FeedClientError::NotSignedIn => {
            "требуется авторизация: выполните `feed-cli login ...` или `feed-cli signup ...`"
                .to_string()
        }
        FeedClientError::Forbidden(reason) => format!("действие запрещено: {reason}"),
        FeedClientError::InvalidInput(message) => format!("некорректный ввод: {message}"),
        FeedClientError::Http(err) => format!("ошибка HTTP: {err}"),
        FeedClientError::HttpStatus(status) => format!("сервер ответил статусом {status}"),
        FeedClientError::Api(errors) => format!("ошибка API: {errors}"),
        FeedClientError::Cancelled => "запрос отменён".to_string(),
        FeedClientError::MissingData(field) => format!("в ответе нет данных: {field}"),
        FeedClientError::Decode(err) => format!("не удалось разобрать ответ: {err}"),
        FeedClientError::Storage(message) => format!("ошибка хранилища токенов: {message}"),
    };
    anyhow!(message)
}

#[cfg(test)]
mod tests {
    use feed_client::{ApiErrors, ErrorMessage, GraphqlError};

    use super::*;

    fn api_error(status: u16, message: ErrorMessage) -> FeedClientError {
        FeedClientError::Api(ApiErrors(vec![GraphqlError {
            status_code: Some(status),
            message,
            error: None,
        }]))
    }

    #[test]
    fn normalize_server_keeps_full_endpoint() {
        let s = normalize_server("https://api.example.com/graphql".to_string());
        assert_eq!(s, "https://api.example.com/graphql");
    }

    #[test]
    fn normalize_server_adds_scheme_and_path() {
        let s = normalize_server("127.0.0.1:3001".to_string());
        assert_eq!(s, "http://127.0.0.1:3001/graphql");

        let s = normalize_server("http://localhost:3001/".to_string());
        assert_eq!(s, "http://localhost:3001/graphql");
    }

    #[test]
    fn resolve_endpoint_prefers_flag() {
        let s = resolve_endpoint(Some("localhost:9999".to_string()), "http://x/graphql");
        assert_eq!(s, "http://localhost:9999/graphql");

        let s = resolve_endpoint(None, "http://x/graphql");
        assert_eq!(s, "http://x/graphql");
    }

    #[test]
    fn unauthorized_suggests_login() {
        let err = map_client_error(api_error(401, ErrorMessage::Text("Unauthorized".into())));
        assert!(err.to_string().contains("feed-cli login"));

        let err = map_client_error(FeedClientError::NotSignedIn);
        assert!(err.to_string().contains("feed-cli login"));
    }

    #[test]
    fn validation_lists_field_errors() {
        let err = map_client_error(api_error(
            400,
            ErrorMessage::Fields(vec![feed_client::FieldError::new("text", "too long")]),
        ));
        assert_eq!(err.to_string(), "некорректный запрос: text: too long");
    }

    #[test]
    fn http_status_is_reported() {
        let err = map_client_error(FeedClientError::HttpStatus(502));
        assert_eq!(err.to_string(), "сервер ответил статусом 502");
    }

    #[test]
    fn cli_parses_timeline_flags() {
        let cli = Cli::try_parse_from(["feed-cli", "timeline", "--user", "Bob", "--pages", "3"])
            .expect("must parse");
        match cli.command {
            Command::Timeline { user, pages, .. } => {
                assert_eq!(user.as_deref(), Some("Bob"));
                assert_eq!(pages, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["feed-cli"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("must parse").command
    }

    #[test]
    fn read_only_commands_work_without_session() {
        assert!(!requires_session(&parse(&["timeline"])));
        assert!(!requires_session(&parse(&["timeline", "--user", "bob"])));
        assert!(!requires_session(&parse(&["show-tweet", "--id", "t1"])));
        assert!(!requires_session(&parse(&["show-user", "--username", "bob"])));
    }

    #[test]
    fn personal_commands_need_session() {
        assert!(requires_session(&parse(&["timeline", "--following"])));
        assert!(requires_session(&parse(&["whoami"])));
        assert!(requires_session(&parse(&["like", "--id", "t1"])));
        assert!(requires_session(&parse(&["follow", "--username", "bob"])));
    }

    #[test]
    fn cli_rejects_conflicting_timeline_filters() {
        let parsed = Cli::try_parse_from(["feed-cli", "timeline", "--following", "--user", "bob"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_parses_birthday() {
        let cli = Cli::try_parse_from([
            "feed-cli",
            "signup",
            "--name",
            "Neo",
            "--email",
            "neo@example.com",
            "--username",
            "neo",
            "--password",
            "Password1",
            "--birthday",
            "1999-03-31",
        ])
        .expect("must parse");
        match cli.command {
            Command::Signup { birthday, .. } => {
                assert_eq!(birthday, NaiveDate::from_ymd_opt(1999, 3, 31).expect("date"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
