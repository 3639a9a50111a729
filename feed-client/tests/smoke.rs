use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use feed_client::{
    FeedClient, FeedFilter, FeedPaginator, MemoryTokenStore, SignUpInput, TweetInteraction,
};

fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock must be after unix epoch")
        .as_nanos();
    format!("{nanos}")
}

#[tokio::test]
#[ignore = "requires running GraphQL API"]
async fn graphql_smoke_flow() {
    let endpoint = std::env::var("FEED_API_URL")
        .unwrap_or_else(|_| "http://localhost:3001/graphql".to_string());
    let client = FeedClient::http(
        endpoint,
        Duration::from_secs(15),
        Arc::new(MemoryTokenStore::new()),
    )
    .expect("client must build");

    let suffix = unique_suffix();
    let username = format!("smoke_{}", &suffix[suffix.len() - 10..]);
    let email = format!("{username}@example.com");

    assert!(
        !client
            .is_username_taken(&username)
            .await
            .expect("username check must succeed")
    );

    let auth = client
        .sign_up(&SignUpInput {
            name: "Smoke".to_string(),
            email: email.clone(),
            username: username.clone(),
            password: "Password123".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 1, 1).expect("valid date"),
        })
        .await
        .expect("sign_up must succeed");
    assert_eq!(auth.user.username, username);
    assert!(client.session().is_authenticated());

    let me = client.authenticate().await.expect("profile must load");
    assert_eq!(me.id, auth.user.id);

    let created = client
        .create_tweet("smoke tweet")
        .await
        .expect("create_tweet must succeed");
    assert_eq!(created.text, "smoke tweet");

    let mut profile = FeedPaginator::new(
        client.clone(),
        FeedFilter::Profile {
            username: username.clone(),
        },
    );
    profile.load().await.expect("profile feed must load");
    assert!(profile.tweets().iter().any(|t| t.id == created.id));

    let mut state = TweetInteraction::new(created.clone(), Some(&me));
    state.like(&client).await.expect("like must succeed");
    assert_eq!(state.likes_count(), 1);
    state.retweet(&client).await.expect("retweet must succeed");
    assert_eq!(state.retweet_users(), [username.clone()]);

    let fetched = client
        .find_tweet(&created.id)
        .await
        .expect("find_tweet must succeed")
        .expect("tweet must exist");
    assert_eq!(fetched.likes.len(), 1);

    state
        .delete(&client, Some(&mut profile))
        .await
        .expect("delete must succeed");
    assert!(profile.tweets().iter().all(|t| t.id != created.id));

    let after_delete = client
        .find_tweet(&created.id)
        .await
        .expect("lookup must succeed");
    assert!(after_delete.is_none());

    client.logout().expect("logout must succeed");
    assert!(client.session().tokens().is_none());
}
