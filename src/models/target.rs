//! Target registry
//!
//! Static per-platform metadata: the service-start floor that bounds the
//! mailbox search and the ordered query tiers (strict first, broad fallback
//! second) used to detect the sign-up mail.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::window::SearchWindow;

/// A platform whose join date can be estimated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub key: String,
    pub display_name: String,
    pub metric_label: String,
    /// Earliest date a sign-up mail could plausibly exist.
    pub window_floor: NaiveDate,
    /// Ordered query patterns, strict first.
    pub query_tiers: Vec<String>,
}

impl Target {
    pub fn new(
        key: &str,
        display_name: &str,
        metric_label: &str,
        window_floor: NaiveDate,
        query_tiers: &[&str],
    ) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            metric_label: metric_label.to_string(),
            window_floor,
            query_tiers: query_tiers.iter().map(|q| q.to_string()).collect(),
        }
    }

    /// Window from the floor through `today` inclusive.
    pub fn search_window(&self, today: NaiveDate) -> Result<SearchWindow> {
        let end = today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::Validation(format!("date out of range: {}", today)))?;
        SearchWindow::new(self.window_floor, end)
    }
}

/// Immutable registry of known targets, keyed by `Target::key`.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, Arc<Target>>,
}

impl TargetRegistry {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            targets: targets
                .into_iter()
                .map(|t| (t.key.clone(), Arc::new(t)))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Target>> {
        self.targets.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.targets.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Target>> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Built-in platform set.
    pub fn builtin() -> Self {
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);

        Self::new(vec![
            // The mailbox itself: any message at all marks the account's age.
            Target::new("gmail", "Gmail", "active accounts", ymd(2004, 1, 1), &[""]),
            Target::new(
                "twitter",
                "Twitter/X",
                "monthly active users",
                ymd(2006, 7, 1),
                &[
                    "from:(verify@twitter.com OR info@twitter.com OR hello@twitter.com OR no-reply@twitter.com OR twitter.com) subject:(welcome OR confirm OR verify)",
                    "from:(twitter.com OR x.com) (welcome OR confirm OR verify OR \"Thanks for signing up\" OR activate OR \"confirm your email\")",
                ],
            ),
            Target::new(
                "linkedin",
                "LinkedIn",
                "members",
                ymd(2003, 5, 1),
                &[
                    "from:(linkedin.com OR messages-noreply@linkedin.com OR security-noreply@linkedin.com OR customer_service@linkedin.com OR news-noreply@linkedin.com) subject:(welcome OR confirm OR verify)",
                    "from:(linkedin.com) (welcome OR confirm OR verify OR \"confirm your email\" OR \"Thanks for joining\")",
                ],
            ),
            Target::new(
                "reddit",
                "Reddit",
                "daily active users",
                ymd(2005, 6, 1),
                &[
                    "from:(noreply@reddit.com OR do-not-reply@reddit.com OR noreply@redditmail.com) subject:(welcome OR confirm OR verify)",
                    "from:(reddit.com OR redditmail.com) (welcome OR confirm OR verify OR activate OR \"confirm your email\")",
                ],
            ),
            Target::new(
                "instagram",
                "Instagram",
                "monthly active users",
                ymd(2010, 10, 1),
                &[
                    "from:(mail.instagram.com OR security@mail.instagram.com) subject:(welcome OR confirm OR verify)",
                    "from:(instagram.com) (welcome OR confirm OR verify OR \"confirm your email\")",
                ],
            ),
            Target::new(
                "spotify",
                "Spotify",
                "monthly active users",
                ymd(2008, 10, 1),
                &[
                    "from:(no-reply@spotify.com) subject:(welcome OR confirm OR verify)",
                    "from:(spotify.com) (welcome OR confirm OR verify OR \"thanks for signing up\")",
                ],
            ),
            Target::new(
                "dropbox",
                "Dropbox",
                "registered users",
                ymd(2008, 6, 1),
                &[
                    "from:(no-reply@dropbox.com OR dropbox@mail.dropbox.com OR no-reply@dropboxmail.com) subject:(welcome OR confirm OR verify)",
                    "from:(dropbox.com OR dropboxmail.com) (welcome OR confirm OR verify OR activate)",
                ],
            ),
            Target::new(
                "amazonprime",
                "Amazon Prime",
                "subscribers",
                ymd(2005, 2, 1),
                &[
                    "from:(no-reply@amazon.com OR prime@amazon.com OR digital-no-reply@amazon.com OR prime-enroll@amazon.com) subject:(prime OR welcome OR confirm OR verify)",
                    "from:(amazon.com) (prime OR welcome OR confirm OR verify OR \"thanks for joining\")",
                ],
            ),
            Target::new(
                "openai",
                "ChatGPT",
                "weekly active users",
                ymd(2022, 11, 1),
                &[
                    "from:(noreply@openai.com OR team@openai.com OR no-reply@accounts.openai.com OR noreply@accounts.openai.com OR no-reply@chat.openai.com) subject:(welcome OR confirm OR verify OR \"ChatGPT\")",
                    "from:(openai.com OR accounts.openai.com OR chat.openai.com) (welcome OR confirm OR verify OR \"ChatGPT\")",
                ],
            ),
            Target::new(
                "facebook",
                "Facebook",
                "monthly active users",
                ymd(2004, 2, 1),
                &[
                    "from:(facebookmail.com OR notify@facebookmail.com) subject:(welcome OR confirm OR verify OR \"Just one more step\")",
                    "from:(facebookmail.com OR facebook.com) (\"confirm your email\" OR activate)",
                ],
            ),
        ])
    }
}
