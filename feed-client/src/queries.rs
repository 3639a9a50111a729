//! Тексты GraphQL-операций, которые использует клиент.

const USER_FIELDS: &str = "
    id
    username
    email
    name
    birthday
    createdAt
    followers { id }
    following { id }
";

const TWEET_FIELDS: &str = "
    id
    text
    createdAt
    repliesCount
    replyTo { id user { id username name } }
    likes { id username }
    retweets { id username }
    user { id username name }
";

pub(crate) fn sign_in() -> String {
    format!(
        "mutation($email: String!, $password: String!) {{
            SignIn(email: $email, password: $password) {{
                accessToken
                refreshToken
                user {{ {USER_FIELDS} }}
            }}
        }}"
    )
}

pub(crate) fn sign_up() -> String {
    format!(
        "mutation($input: CreateUserInput!) {{
            SignUp(input: $input) {{
                accessToken
                refreshToken
                user {{ {USER_FIELDS} }}
            }}
        }}"
    )
}

pub(crate) fn profile() -> String {
    format!("query {{ Profile {{ {USER_FIELDS} }} }}")
}

pub(crate) const REFRESH_TOKENS: &str = "query {
    RefreshTokens {
        accessToken
        refreshToken
    }
}";

pub(crate) fn create_tweet() -> String {
    format!(
        "mutation($input: CreateTweetInput!) {{
            CreateTweet(input: $input) {{ {TWEET_FIELDS} }}
        }}"
    )
}

pub(crate) fn reply_tweet() -> String {
    format!(
        "mutation($input: ReplyTweetInput!) {{
            ReplyTweet(input: $input) {{ {TWEET_FIELDS} }}
        }}"
    )
}

pub(crate) const LIKE_TWEET: &str = "mutation($id: ID!) {
    LikeTweet(id: $id) { id }
}";

pub(crate) const RETWEET: &str = "mutation($id: ID!) {
    Retweet(id: $id) { id }
}";

pub(crate) const DELETE_TWEET: &str = "mutation($id: ID!) {
    DeleteTweet(id: $id)
}";

pub(crate) fn follow_user() -> String {
    format!(
        "mutation($id: ID!) {{
            FollowUser(id: $id) {{ {USER_FIELDS} }}
        }}"
    )
}

pub(crate) fn pagination_tweet() -> String {
    format!(
        "query($skip: Int!, $take: Int!, $sortBy: PaginationSortBy, $where: [PaginationTweetWhere]) {{
            PaginationTweet(skip: $skip, take: $take, sortBy: $sortBy, where: $where) {{
                totalCount
                nodes {{ {TWEET_FIELDS} }}
            }}
        }}"
    )
}

pub(crate) fn find_tweet() -> String {
    format!(
        "query($id: ID!) {{
            FindOneTweet(id: $id) {{ {TWEET_FIELDS} }}
        }}"
    )
}

pub(crate) fn find_user() -> String {
    format!(
        "query($input: FindOneUserInput!) {{
            FindOneUser(input: $input) {{ {USER_FIELDS} }}
        }}"
    )
}

pub(crate) const USER_EXISTS: &str = "query($input: FindOneUserInput!) {
    FindOneUser(input: $input) { id }
}";
