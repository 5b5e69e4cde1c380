//! Text-command grammar for the admin. One command maps to one admin
//! operation; anything unknown is ignored, malformed arguments produce an
//! explanatory reply instead of silence.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    ListFeeds,
    AddFeed(String),
    RemoveFeed(i64),
    Force,
    /// Prune delivery records older than the given days, or the configured
    /// maximum when absent.
    PruneOldNews(Option<u32>),
    AddCsv(String),
    Cleanup,
    Backup,
    ImportOpml(String),
}

/// Parse a chat message. `None` means "not a command we know" (ignored);
/// `Some(Err(text))` is a usage problem to report back verbatim.
pub fn parse(text: &str) -> Option<Result<AdminCommand, String>> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let mut parts = text.split_whitespace();
    let head = parts.next()?;
    // Group chats append the bot name: "/urllist@feedpost_bot"
    let command = head.trim_start_matches('/').split('@').next().unwrap_or("");
    let args: Vec<&str> = parts.collect();

    let parsed = match command {
        "urllist" => Ok(AdminCommand::ListFeeds),
        "force" => Ok(AdminCommand::Force),
        "dbcleanup" => Ok(AdminCommand::Cleanup),
        "sqlitebackup" => Ok(AdminCommand::Backup),

        "addfeed" => match args.as_slice() {
            [url] => Ok(AdminCommand::AddFeed(url.to_string())),
            _ => Err("Expecting only one argument: /addfeed <url>".to_string()),
        },

        "rmfeed" => match args.as_slice() {
            [id] => id
                .parse::<i64>()
                .map(AdminCommand::RemoveFeed)
                .map_err(|_| format!("[{}] is not a valid numeric index", id)),
            _ => Err("Expecting only one argument: /rmfeed <id>".to_string()),
        },

        "rmoldnews" => match args.as_slice() {
            [] => Ok(AdminCommand::PruneOldNews(None)),
            [days] => days
                .parse::<u32>()
                .map(|d| AdminCommand::PruneOldNews(Some(d)))
                .map_err(|_| "Invalid number of days to delete".to_string()),
            _ => Err("Expecting at most one argument: /rmoldnews [days]".to_string()),
        },

        "addcsv" => {
            let payload = text
                .strip_prefix(head)
                .unwrap_or("")
                .trim()
                .to_string();
            if payload.is_empty() {
                Err("Missing CSV list".to_string())
            } else {
                Ok(AdminCommand::AddCsv(payload))
            }
        }

        "importopml" => match args.as_slice() {
            [url] => Ok(AdminCommand::ImportOpml(url.to_string())),
            _ => Err("Expecting only one argument: /importopml <url>".to_string()),
        },

        _ => return None,
    };

    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse("/urllist"), Some(Ok(AdminCommand::ListFeeds)));
        assert_eq!(parse("/force"), Some(Ok(AdminCommand::Force)));
        assert_eq!(parse("/dbcleanup"), Some(Ok(AdminCommand::Cleanup)));
        assert_eq!(parse("/sqlitebackup"), Some(Ok(AdminCommand::Backup)));
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse("/addfeed https://example.com/feed"),
            Some(Ok(AdminCommand::AddFeed("https://example.com/feed".to_string())))
        );
        assert_eq!(parse("/rmfeed 12"), Some(Ok(AdminCommand::RemoveFeed(12))));
        assert_eq!(
            parse("/rmoldnews 7"),
            Some(Ok(AdminCommand::PruneOldNews(Some(7))))
        );
        assert_eq!(parse("/rmoldnews"), Some(Ok(AdminCommand::PruneOldNews(None))));
        assert_eq!(
            parse("/importopml https://example.com/subs.opml"),
            Some(Ok(AdminCommand::ImportOpml(
                "https://example.com/subs.opml".to_string()
            )))
        );
    }

    #[test]
    fn csv_payload_is_kept_verbatim() {
        assert_eq!(
            parse("/addcsv https://a.com/feed, https://b.com/feed"),
            Some(Ok(AdminCommand::AddCsv(
                "https://a.com/feed, https://b.com/feed".to_string()
            )))
        );
        assert!(matches!(parse("/addcsv"), Some(Err(_))));
    }

    #[test]
    fn strips_bot_name_suffix() {
        assert_eq!(parse("/urllist@feedpost_bot"), Some(Ok(AdminCommand::ListFeeds)));
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert!(matches!(parse("/rmfeed abc"), Some(Err(_))));
        assert!(matches!(parse("/rmfeed"), Some(Err(_))));
        assert!(matches!(parse("/addfeed one two"), Some(Err(_))));
        assert!(matches!(parse("/rmoldnews soon"), Some(Err(_))));
    }

    #[test]
    fn unknown_or_plain_text_is_ignored() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse("/unknowncmd"), None);
        assert_eq!(parse(""), None);
    }
}
