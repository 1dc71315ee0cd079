use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

pub const EXPIRE_NEVER: &str = "N";
pub const EXPIRE_TEN_MINUTES: &str = "10M";
pub const EXPIRE_HOUR: &str = "1H";
pub const EXPIRE_DAY: &str = "1D";
pub const EXPIRE_WEEK: &str = "1W";
pub const EXPIRE_TWO_WEEKS: &str = "2W";
pub const EXPIRE_MONTH: &str = "1M";

pub const PRIVACY_PUBLIC: &str = "0";
pub const PRIVACY_UNLISTED: &str = "1";
pub const PRIVACY_PRIVATE: &str = "2";

const API_BASE: &str = "https://pastebin.com/api";
const API_RESULTS_LIMIT: &str = "1000";

lazy_static! {
    static ref KEY_PARSER: Regex = Regex::new(r"^<paste_key>(.+)</paste_key>$").unwrap();
    static ref TITLE_PARSER: Regex = Regex::new(r"^<paste_title>(SG1 .+)</paste_title>$").unwrap();
}

/// A paste descriptor as returned by the list API.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct XmlPaste {
    pub key: String,
    pub title: String,
}

/// A paste to be created.
#[derive(Debug, Clone)]
pub struct Paste {
    pub text: String,
    pub name: String,
    pub privacy: &'static str,
    pub expire_date: &'static str,
}

/// Thin client for the pastebin developer API. Every call is a form
/// post carrying the developer and user keys.
pub struct PastebinApi {
    api_key: String,
    user_key: String,
    client: reqwest::Client,
}

impl PastebinApi {
    pub fn new(api_key: &str, user_key: &str) -> Self {
        PastebinApi {
            api_key: api_key.to_owned(),
            user_key: user_key.to_owned(),
            client: reqwest::Client::new(),
        }
    }

    async fn request(&self, page: &str, mut values: Vec<(&'static str, String)>) -> Result<String> {
        values.push(("api_dev_key", self.api_key.clone()));
        values.push(("api_user_key", self.user_key.clone()));

        log::debug!("pastebin api request to {page}");

        let response = self
            .client
            .post(format!("{API_BASE}/{page}"))
            .form(&values)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::ErrHttpStatus(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    /// The raw body of a single paste.
    pub async fn get_paste(&self, key: &str) -> Result<String> {
        self.request(
            "api_raw.php",
            vec![
                ("api_paste_key", key.to_owned()),
                ("api_option", "show_paste".to_owned()),
            ],
        )
        .await
    }

    /// Descriptors of the account's pastes, newest list the API gives
    /// us, capped at 1000.
    pub async fn get_pastes(&self) -> Result<Vec<XmlPaste>> {
        let body = self
            .request(
                "api_post.php",
                vec![
                    ("api_option", "list".to_owned()),
                    ("api_results_limit", API_RESULTS_LIMIT.to_owned()),
                ],
            )
            .await?;

        Ok(parse_xml_pastes(&body))
    }

    pub async fn delete_paste(&self, paste: &XmlPaste) -> Result<String> {
        self.request(
            "api_post.php",
            vec![
                ("api_paste_key", paste.key.clone()),
                ("api_option", "delete".to_owned()),
            ],
        )
        .await
    }

    pub async fn create_paste(&self, paste: &Paste) -> Result<String> {
        self.request(
            "api_post.php",
            vec![
                ("api_option", "paste".to_owned()),
                ("api_paste_code", paste.text.clone()),
                ("api_paste_name", paste.name.clone()),
                ("api_paste_private", paste.privacy.to_owned()),
                ("api_paste_expire_date", paste.expire_date.to_owned()),
            ],
        )
        .await
    }
}

/// The list endpoint answers with line-oriented XML; this picks the key
/// and title out of each `<paste>` element.
pub(crate) fn parse_xml_pastes(body: &str) -> Vec<XmlPaste> {
    let mut pastes = Vec::new();
    let mut paste = XmlPaste::default();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        } else if line == "<paste>" {
            paste = XmlPaste::default();
        } else if line == "</paste>" {
            pastes.push(paste.clone());
        } else if let Some(captures) = KEY_PARSER.captures(line) {
            paste.key = captures[1].to_owned();
        } else if let Some(captures) = TITLE_PARSER.captures(line) {
            paste.title = captures[1].to_owned();
        }
    }

    pastes
}
