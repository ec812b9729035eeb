use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::client::feed::FeedCursor;
use crate::comments::CommentResponse;
use crate::follows::UserSummary;
use crate::posts::PostResponse;
use crate::users::ProfileResponse;

pub const DEFAULT_AVATAR: &str = "https://via.placeholder.com/150/667eea/ffffff?text=U";

/// "Just now", "5m ago", "3h ago", "2d ago", then a plain date after 30 days.
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    match secs {
        s if s < 60 => "Just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s if s < 2_592_000 => format!("{}d ago", s / 86_400),
        _ => at.format("%-m/%-d/%Y").to_string(),
    }
}

pub fn avatar_url(profile_picture: Option<&str>) -> &str {
    profile_picture
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_AVATAR)
}

fn display_name<'a>(full_name: Option<&'a str>, username: &'a str) -> &'a str {
    full_name.filter(|n| !n.trim().is_empty()).unwrap_or(username)
}

fn avatar_img(profile_picture: Option<&str>, username: &str, class: &str) -> String {
    format!(
        r#"<img src="{}" alt="{}" class="{}">"#,
        encode_double_quoted_attribute(avatar_url(profile_picture)),
        encode_double_quoted_attribute(username),
        class
    )
}

/// Post card. The delete button appears only on the viewer's own posts.
pub fn render_post(post: &PostResponse, viewer_id: Option<i64>, now: DateTime<Utc>) -> String {
    let own = viewer_id == Some(post.user_id);
    let (liked_class, like_icon) = if post.is_liked {
        (" liked", "fas fa-heart")
    } else {
        ("", "far fa-heart")
    };

    let delete_button = if own {
        format!(
            r#"<button class="delete-post-btn" data-post-id="{}" title="Delete post"><i class="fas fa-trash"></i></button>"#,
            post.id
        )
    } else {
        String::new()
    };

    let image = post
        .image_url
        .as_deref()
        .map(|url| {
            format!(
                r#"<img src="{}" alt="Post image" class="post-image">"#,
                encode_double_quoted_attribute(url)
            )
        })
        .unwrap_or_default();

    format!(
        concat!(
            r#"<div class="post" data-post-id="{id}">"#,
            r#"<div class="post-header">{avatar}"#,
            r#"<div class="post-author-info"><h4>{name}</h4><span>@{username} &bull; {when}</span></div>"#,
            "{delete}</div>",
            r#"<div class="post-content">{content}</div>"#,
            "{image}",
            r#"<div class="post-actions">"#,
            r#"<div class="post-action like-action{liked}" data-post-id="{id}"><i class="{icon}"></i><span>{likes}</span></div>"#,
            r#"<div class="post-action comment-action" data-post-id="{id}"><i class="far fa-comment"></i><span>{comments}</span></div>"#,
            "</div></div>"
        ),
        id = post.id,
        avatar = avatar_img(post.profile_picture.as_deref(), &post.username, "post-author-pic"),
        name = encode_text(display_name(post.full_name.as_deref(), &post.username)),
        username = encode_text(&post.username),
        when = relative_time(post.created_at, now),
        delete = delete_button,
        content = encode_text(&post.content),
        image = image,
        liked = liked_class,
        icon = like_icon,
        likes = post.likes_count,
        comments = post.comments_count,
    )
}

/// Feed page, with an empty state on the first page and a load-more button
/// while the cursor hints at more posts. `cursor` is the state after the page
/// was recorded.
pub fn render_feed(
    posts: &[PostResponse],
    cursor: &FeedCursor,
    viewer_id: Option<i64>,
    now: DateTime<Utc>,
) -> String {
    if posts.is_empty() && cursor.next_page <= 2 {
        return concat!(
            r#"<div class="empty-state"><h3>No posts yet</h3>"#,
            "<p>Be the first to share something!</p></div>"
        )
        .to_string();
    }

    let mut html: String = posts
        .iter()
        .map(|post| render_post(post, viewer_id, now))
        .collect();
    if cursor.has_more_hint {
        html.push_str(&format!(
            r#"<button id="load-more-btn" data-page="{}">Load more</button>"#,
            cursor.next_page
        ));
    }
    html
}

pub fn render_comments(comments: &[CommentResponse]) -> String {
    comments
        .iter()
        .map(|c| {
            format!(
                concat!(
                    r#"<div class="comment">{avatar}<div class="comment-content">"#,
                    r#"<div class="comment-author">{name}</div>"#,
                    r#"<div class="comment-text">{content}</div></div></div>"#
                ),
                avatar = avatar_img(c.profile_picture.as_deref(), &c.username, "comment-author-pic"),
                name = encode_text(display_name(c.full_name.as_deref(), &c.username)),
                content = encode_text(&c.content),
            )
        })
        .collect()
}

fn follow_button(user_id: i64, is_following: bool) -> String {
    let (class, label) = if is_following {
        (" following", "Following")
    } else {
        ("", "Follow")
    };
    format!(r#"<button class="follow-btn{class}" data-user-id="{user_id}">{label}</button>"#)
}

/// User card for suggestions, search results and follower lists. No follow
/// button on the viewer's own card.
pub fn render_user_card(user: &UserSummary, viewer_id: Option<i64>) -> String {
    let button = if viewer_id == Some(user.id) {
        String::new()
    } else {
        follow_button(user.id, user.is_following)
    };
    format!(
        concat!(
            r#"<div class="suggested-user" data-user-id="{id}">{avatar}"#,
            r#"<div class="suggested-user-info"><div class="suggested-user-name">{name}</div>"#,
            r#"<div class="suggested-user-username">@{username}</div></div>{button}</div>"#
        ),
        id = user.id,
        avatar = avatar_img(user.profile_picture.as_deref(), &user.username, "suggested-user-pic"),
        name = encode_text(display_name(user.full_name.as_deref(), &user.username)),
        username = encode_text(&user.username),
        button = button,
    )
}

pub fn render_user_list(users: &[UserSummary], viewer_id: Option<i64>, empty: &str) -> String {
    if users.is_empty() {
        return format!(r#"<div class="no-suggestions">{}</div>"#, encode_text(empty));
    }
    users
        .iter()
        .map(|user| render_user_card(user, viewer_id))
        .collect()
}

pub fn render_profile_header(profile: &ProfileResponse, viewer_id: Option<i64>) -> String {
    let button = if viewer_id == Some(profile.id) {
        String::new()
    } else {
        follow_button(profile.id, profile.is_following)
    };
    let bio = profile
        .bio
        .as_deref()
        .filter(|b| !b.trim().is_empty())
        .unwrap_or("No bio yet");

    format!(
        concat!(
            r#"<div class="profile-header" data-user-id="{id}">{avatar}"#,
            "<h2>{name}</h2><p>{bio}</p>",
            r#"<div class="profile-stats"><span>{posts} posts</span>"#,
            "<span>{followers} followers</span><span>{following} following</span></div>",
            "{button}</div>"
        ),
        id = profile.id,
        avatar = avatar_img(profile.profile_picture.as_deref(), &profile.username, "profile-pic"),
        name = encode_text(display_name(profile.full_name.as_deref(), &profile.username)),
        bio = encode_text(bio),
        posts = profile.posts_count,
        followers = profile.followers_count,
        following = profile.following_count,
        button = button,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn post(user_id: i64, content: &str) -> PostResponse {
        PostResponse {
            id: 7,
            user_id,
            content: content.into(),
            image_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            username: "alice".into(),
            full_name: None,
            profile_picture: None,
            likes_count: 2,
            comments_count: 1,
            is_liked: true,
        }
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(relative_time(now - Duration::seconds(30), now), "Just now");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3h ago");
        assert_eq!(relative_time(now - Duration::days(2), now), "2d ago");
        assert_eq!(relative_time(now - Duration::days(45), now), "1/16/2024");
    }

    #[test]
    fn post_content_is_escaped() {
        let html = render_post(&post(1, "<script>alert(1)</script>"), None, Utc::now());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(DEFAULT_AVATAR.split('?').next().unwrap()));
    }

    #[test]
    fn delete_button_only_for_owner() {
        let p = post(1, "hello");
        assert!(render_post(&p, Some(1), Utc::now()).contains("delete-post-btn"));
        assert!(!render_post(&p, Some(2), Utc::now()).contains("delete-post-btn"));
        assert!(render_post(&p, Some(2), Utc::now()).contains("like-action liked"));
    }

    #[test]
    fn feed_shows_load_more_only_with_hint() {
        let posts = vec![post(1, "a")];
        let mut cursor = FeedCursor::default();
        cursor.record_page(1);
        assert!(!render_feed(&posts, &cursor, None, Utc::now()).contains("load-more-btn"));

        let mut full = FeedCursor::default();
        full.record_page(10);
        assert!(render_feed(&posts, &full, None, Utc::now()).contains(r#"data-page="2""#));

        let empty = render_feed(&[], &FeedCursor::default(), None, Utc::now());
        assert!(empty.contains("No posts yet"));
    }

    #[test]
    fn own_card_has_no_follow_button() {
        let user = UserSummary {
            id: 4,
            username: "bob".into(),
            full_name: Some("Bob".into()),
            profile_picture: None,
            is_following: true,
        };
        assert!(!render_user_card(&user, Some(4)).contains("follow-btn"));
        let other = render_user_card(&user, Some(1));
        assert!(other.contains("follow-btn following"));
        assert!(other.contains(">Following<"));
        assert!(other.contains("Bob"));
    }
}
