//! Sensitive-data categories and their policy classes

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Prefix used for values whose category cannot be resolved.
pub const DEFAULT_ALIAS_PREFIX: &str = "VALUE_";

/// Kind of sensitive value a pattern detects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Database,
    Server,
    IpAddress,
    Hostname,
    ConnectionString,
    FilePath,
    Ssn,
    CreditCard,
    ApiKey,
    AwsKey,
    #[serde(rename = "github_token")]
    GitHubToken,
    #[serde(rename = "openai_key")]
    OpenAiKey,
    AnthropicKey,
    SlackToken,
    AzureKey,
    PrivateKey,
    Password,
    BearerToken,
    Email,
    Phone,
    Url,
    Custom,
}

/// Option gate a category belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyClass {
    Infrastructure,
    Pii,
    Custom,
}

#[derive(Debug, Clone, Copy)]
struct CategoryInfo {
    name: &'static str,
    prefix: &'static str,
    class: PolicyClass,
}

lazy_static! {
    static ref CATEGORY_TABLE: HashMap<Category, CategoryInfo> = {
        use Category::*;
        use PolicyClass::{Infrastructure as Infra, Pii};

        let rows: [(Category, &'static str, &'static str, PolicyClass); 22] = [
            (Database, "database", "DATABASE_", Infra),
            (Server, "server", "SERVER_", Infra),
            (IpAddress, "ip_address", "IP_ADDRESS_", Infra),
            (Hostname, "hostname", "HOSTNAME_", Infra),
            (ConnectionString, "connection_string", "CONN_STRING_", Infra),
            (FilePath, "file_path", "FILE_PATH_", Infra),
            (Ssn, "ssn", "SSN_", Pii),
            (CreditCard, "credit_card", "CREDIT_CARD_", Pii),
            (ApiKey, "api_key", "API_KEY_", Pii),
            (AwsKey, "aws_key", "AWS_KEY_", Pii),
            (GitHubToken, "github_token", "GITHUB_TOKEN_", Pii),
            (OpenAiKey, "openai_key", "OPENAI_KEY_", Pii),
            (AnthropicKey, "anthropic_key", "ANTHROPIC_KEY_", Pii),
            (SlackToken, "slack_token", "SLACK_TOKEN_", Pii),
            (AzureKey, "azure_key", "AZURE_KEY_", Pii),
            (PrivateKey, "private_key", "PRIVATE_KEY_", Pii),
            (Password, "password", "PASSWORD_", Pii),
            (BearerToken, "bearer_token", "BEARER_TOKEN_", Pii),
            (Email, "email", "EMAIL_", Pii),
            (Phone, "phone", "PHONE_", Pii),
            (Url, "url", "URL_", Pii),
            (Custom, "custom", "CUSTOM_", PolicyClass::Custom),
        ];

        rows.into_iter()
            .map(|(category, name, prefix, class)| (category, CategoryInfo { name, prefix, class }))
            .collect()
    };
}

impl Category {
    pub const ALL: [Category; 22] = [
        Category::Database,
        Category::Server,
        Category::IpAddress,
        Category::Hostname,
        Category::ConnectionString,
        Category::FilePath,
        Category::Ssn,
        Category::CreditCard,
        Category::ApiKey,
        Category::AwsKey,
        Category::GitHubToken,
        Category::OpenAiKey,
        Category::AnthropicKey,
        Category::SlackToken,
        Category::AzureKey,
        Category::PrivateKey,
        Category::Password,
        Category::BearerToken,
        Category::Email,
        Category::Phone,
        Category::Url,
        Category::Custom,
    ];

    fn info(&self) -> Option<&'static CategoryInfo> {
        CATEGORY_TABLE.get(self)
    }

    /// Alias prefix, e.g. `DATABASE_`
    pub fn alias_prefix(&self) -> &'static str {
        self.info().map_or(DEFAULT_ALIAS_PREFIX, |info| info.prefix)
    }

    pub fn policy_class(&self) -> PolicyClass {
        self.info().map_or(PolicyClass::Custom, |info| info.class)
    }

    /// Canonical snake_case name, as used in config files
    pub fn as_str(&self) -> &'static str {
        self.info().map_or("custom", |info| info.name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the snake_case name or the variant name, ignoring case and
    /// separators (`ip_address`, `IpAddress` and `ip-address` are equal).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Category::ALL
            .into_iter()
            .find(|c| normalize(c.as_str()) == wanted)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
