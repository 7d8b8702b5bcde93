diesel::table! {
    users (id) {
        id -> Text,
        username -> Text,
        email -> Text,
        display_name -> Text,
        auth_token -> Nullable<Text>,
        is_verified -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    user_profiles (id) {
        id -> BigInt,
        user_id -> Text,
        headline -> Text,
        bio -> Text,
        avatar_url -> Text,
        github_handle -> Text,
        twitter_handle -> Text,
        linkedin_handle -> Text,
        elo_rating -> Integer,
        current_streak -> Integer,
        total_xp -> Integer,
    }
}

diesel::table! {
    codeforces_profiles (id) {
        id -> BigInt,
        user_id -> Text,
        handle -> Text,
        rating -> Integer,
        max_rating -> Integer,
        rank -> Text,
        max_rank -> Text,
        avatar_url -> Text,
        contribution -> Integer,
        friend_count -> Integer,
        problems_solved -> Integer,
        last_synced -> Timestamptz,
    }
}

diesel::table! {
    github_profiles (id) {
        id -> BigInt,
        user_id -> Text,
        username -> Text,
        github_id -> Nullable<BigInt>,
        avatar_url -> Text,
        html_url -> Text,
        bio -> Text,
        company -> Text,
        location -> Text,
        blog -> Text,
        public_repos -> Integer,
        public_gists -> Integer,
        followers -> Integer,
        following -> Integer,
        total_commits -> Integer,
        total_prs -> Integer,
        total_issues -> Integer,
        total_stars_received -> Integer,
        top_languages -> Text,
        top_repos -> Text,
        access_token -> Text,
        last_synced -> Timestamptz,
        github_created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    posts (id) {
        id -> Text,
        author_id -> Text,
        content -> Text,
        code_snippet -> Text,
        image_url -> Text,
        post_type -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reactions (id) {
        id -> BigInt,
        post_id -> Text,
        user_id -> Text,
        reaction_type -> Text,
    }
}

diesel::table! {
    comments (id) {
        id -> BigInt,
        post_id -> Text,
        user_id -> Text,
        content -> Text,
        code_snippet -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    channels (id) {
        id -> BigInt,
        name -> Text,
        description -> Text,
        slug -> Text,
        color -> Text,
    }
}

diesel::table! {
    threads (id) {
        id -> BigInt,
        channel_id -> BigInt,
        author_id -> Text,
        title -> Text,
        content -> Text,
        pinned -> Bool,
        views -> Integer,
        tags -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    replies (id) {
        id -> BigInt,
        thread_id -> BigInt,
        author_id -> Text,
        content -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    votes (id) {
        id -> BigInt,
        thread_id -> BigInt,
        user_id -> Text,
        value -> Integer,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    repositories (id) {
        id -> BigInt,
        user_id -> Text,
        github_repo_id -> Text,
        full_name -> Text,
        html_url -> Text,
        is_active -> Bool,
        default_description -> Text,
    }
}

diesel::table! {
    challenges (id) {
        id -> Text,
        title -> Text,
        description -> Text,
        difficulty -> Text,
        points -> Integer,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    users,
    user_profiles,
    codeforces_profiles,
    github_profiles,
    posts,
    reactions,
    comments,
    channels,
    threads,
    replies,
    votes,
    repositories,
    challenges,
);
