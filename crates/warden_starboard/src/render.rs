//! Showcase post content.

use warden_core::{StarboardEntry, jump_url};

/// Render the showcase post for `entry`.
///
/// ```text
/// ⭐ **5** <#10> by <@42>
/// > quoted excerpt
/// https://discord.com/channels/1/10/77
/// ```
pub fn render_post(emoji: &str, entry: &StarboardEntry, excerpt_chars: usize) -> String {
    let mut post = format!("{emoji} **{}** <#{}>", entry.star_count, entry.channel_id);
    if let Some(author) = entry.author_id {
        post.push_str(&format!(" by <@{author}>"));
    }
    if let Some(excerpt) = entry.excerpt.as_deref() {
        let excerpt = truncate(excerpt.trim(), excerpt_chars);
        if !excerpt.is_empty() {
            for line in excerpt.lines() {
                post.push_str("\n> ");
                post.push_str(line);
            }
        }
    }
    post.push('\n');
    post.push_str(&jump_url(entry.guild_id, entry.channel_id, entry.message_id));
    post
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{ChannelId, GuildId, MessageId, UserId};

    #[test]
    fn test_render_includes_count_and_link() {
        let mut entry = StarboardEntry::new(MessageId(77), GuildId(1), ChannelId(10));
        entry.add_reactor(UserId(5));
        entry.author_id = Some(UserId(42));
        entry.excerpt = Some("hello\nworld".to_string());

        let post = render_post("⭐", &entry, 300);
        assert_eq!(
            post,
            "⭐ **1** <#10> by <@42>\n> hello\n> world\nhttps://discord.com/channels/1/10/77"
        );
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("ééééé", 3), "ééé…");
        assert_eq!(truncate("short", 10), "short");
    }
}
