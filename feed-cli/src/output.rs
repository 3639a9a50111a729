use chrono::{DateTime, Utc};
use feed_client::{FieldError, Tweet, TweetInteraction, User};

/// Возраст записи как в ленте: `42s`, `5m`, `3h`, старше суток `07 Mar`.
pub fn format_relative(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds().max(0);
    match secs {
        0..60 => format!("{secs}s"),
        60..3_600 => format!("{}m", secs / 60),
        3_600..86_400 => format!("{}h", secs / 3_600),
        _ => created_at.format("%d %b").to_string(),
    }
}

pub fn author_label(tweet: &Tweet) -> String {
    let username = tweet.user.username.as_deref().unwrap_or(tweet.user.id.as_str());
    match tweet.user.name.as_deref() {
        Some(name) => format!("{name} @{username}"),
        None => format!("@{username}"),
    }
}

pub fn print_tweet(tweet: &Tweet, viewer: Option<&User>, now: DateTime<Utc>) {
    let state = TweetInteraction::new(tweet.clone(), viewer);

    println!(
        "[{}] {} · {}",
        tweet.id,
        author_label(tweet),
        format_relative(tweet.created_at, now)
    );
    if let Some(parent) = &tweet.reply_to {
        let to = parent
            .user
            .as_ref()
            .and_then(|user| user.username.as_deref())
            .unwrap_or(parent.id.as_str());
        println!("  в ответ @{to}");
    }
    if !state.retweet_users().is_empty() {
        println!("  ретвитнули: {}", state.retweet_users().join(", "));
    }
    println!("  {}", tweet.text);
    print_counters(&state);
}

pub fn print_counters(state: &TweetInteraction) {
    println!(
        "  ответов: {}  ретвитов: {}{}  лайков: {}{}",
        state.tweet().replies_count,
        state.retweets_count(),
        if state.is_retweeted() { " (вы)" } else { "" },
        state.likes_count(),
        if state.is_liked() { " (вы)" } else { "" },
    );
}

pub fn print_feed(title: &str, tweets: &[Tweet], total: Option<u64>, viewer: Option<&User>) {
    let now = Utc::now();
    match total {
        Some(total) => println!("{title}: {} из {total}", tweets.len()),
        None => println!("{title}: {}", tweets.len()),
    }
    for tweet in tweets {
        println!();
        print_tweet(tweet, viewer, now);
    }
}

pub fn print_user(title: &str, user: &User) {
    println!("{title}");
    println!("id: {}", user.id);
    println!("username: @{}", user.username);
    println!("name: {}", user.name);
    if let Some(email) = &user.email {
        println!("email: {email}");
    }
    if let Some(birthday) = user.birthday {
        println!("birthday: {}", birthday.format("%d %B %Y"));
    }
    println!("joined: {}", user.created_at.format("%B %Y"));
    println!(
        "following: {}  followers: {}",
        user.following.len(),
        user.followers.len()
    );
}

pub fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|err| {
            let message = err.message.as_deref().unwrap_or("invalid");
            if err.code.is_empty() {
                message.to_string()
            } else {
                format!("{}: {message}", err.code)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
