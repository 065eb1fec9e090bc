use anyhow::Context;

pub const DEFAULT_API_URL: &str =
    "https://perm-backend-production.up.railway.app/api/predictions/from-date";

/// Runtime configuration, resolved once from the environment and passed
/// explicitly to everything that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub chat_ids: Vec<String>,
    pub database_url: Option<String>,
    pub api_url: String,
    pub submit_date: String,
    pub employer_letter: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let telegram_bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN must be set to a Telegram bot token")?;
        let chat_ids = parse_chat_ids(&std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default());
        let database_url = std::env::var("DATABASE_URL").ok();
        let api_url =
            std::env::var("PERM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let submit_date =
            std::env::var("PERM_SUBMIT_DATE").unwrap_or_else(|_| "2024-12-19".to_string());
        let employer_letter =
            std::env::var("PERM_EMPLOYER_LETTER").unwrap_or_else(|_| "A".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);

        Ok(Config {
            telegram_bot_token,
            chat_ids,
            database_url,
            api_url,
            submit_date,
            employer_letter,
            port,
        })
    }
}

/// Split the comma-separated chat id list, trimming whitespace and dropping
/// empty entries.
pub fn parse_chat_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_chat_ids() {
        let ids = parse_chat_ids(" 123456, -987654 ,778899 ");
        assert_eq!(ids, vec!["123456", "-987654", "778899"]);
    }

    #[test]
    fn drops_empty_entries() {
        let ids = parse_chat_ids("123,, ,456,");
        assert_eq!(ids, vec!["123", "456"]);
    }

    #[test]
    fn empty_string_yields_no_ids() {
        assert!(parse_chat_ids("").is_empty());
        assert!(parse_chat_ids("  ").is_empty());
    }
}
