use crate::traits::{Announcer, RunSummary};
use crate::types::{AggregatorError, JobRecord, Result};
use crate::utils::text::truncate_words;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

const BOT_USERNAME: &str = "Internship Tracker";
const NEW_JOB_COLOR: u32 = 0x00FF00;
const FRESH_SUMMARY_COLOR: u32 = 0x5865F2;
const QUIET_SUMMARY_COLOR: u32 = 0xFFA500;
const ERROR_COLOR: u32 = 0xFF0000;
const ERROR_DETAIL_CHARS: usize = 1000;
const DESCRIPTION_PREVIEW_CHARS: usize = 300;

/// Posts to Discord channels through their incoming webhooks
pub struct DiscordNotifier {
    client: Client,
    webhooks: HashMap<String, String>,
}

impl DiscordNotifier {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            webhooks: HashMap::new(),
        })
    }

    /// Route announcements for `channel_id` to `webhook_url`
    pub fn with_channel(mut self, channel_id: impl Into<String>, webhook_url: impl Into<String>) -> Self {
        self.webhooks.insert(channel_id.into(), webhook_url.into());
        self
    }

    pub fn channel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.webhooks.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn webhook_for(&self, channel_id: &str) -> Result<&str> {
        self.webhooks
            .get(channel_id)
            .map(String::as_str)
            .ok_or_else(|| AggregatorError::Announce {
                channel: channel_id.to_string(),
                message: "no webhook configured".to_string(),
            })
    }

    async fn send(&self, channel_id: &str, payload: &Value) -> Result<()> {
        let webhook = self.webhook_for(channel_id)?;
        let response = self.client.post(webhook).json(payload).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!("Discord accepted message for {} ({})", channel_id, status);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AggregatorError::Announce {
            channel: channel_id.to_string(),
            message: format!("HTTP {}: {}", status, truncate_words(&body, 200)),
        })
    }
}

#[async_trait]
impl Announcer for DiscordNotifier {
    async fn announce(&self, job: &JobRecord, channel_id: &str) -> Result<()> {
        self.send(channel_id, &job_payload(job)).await?;
        info!("Announced {} at {} on {}", job.title, job.company, channel_id);
        Ok(())
    }

    async fn announce_summary(&self, summary: &RunSummary, channel_id: &str) -> Result<()> {
        self.send(channel_id, &summary_payload(summary)).await?;
        info!("Sent daily summary to {}", channel_id);
        Ok(())
    }

    async fn announce_error(&self, message: &str, channel_id: &str) -> Result<()> {
        self.send(channel_id, &error_payload(message)).await?;
        info!("Reported run failure to {}", channel_id);
        Ok(())
    }
}

/// Webhook body announcing one listing
pub fn job_payload(job: &JobRecord) -> Value {
    let mut embed = json!({
        "title": job.company,
        "url": job.url,
        "description": format!("[{}]({})", job.title, job.url),
        "color": NEW_JOB_COLOR,
        "fields": [
            { "name": "Location", "value": job.location, "inline": true },
            { "name": "Salary", "value": job.salary.as_deref().unwrap_or("Not specified"), "inline": true },
            { "name": "Source", "value": job.source.as_str(), "inline": true },
            { "name": "Posted", "value": job.posted_label(), "inline": true },
            { "name": "Relevance", "value": job.relevance_score.to_string(), "inline": true },
        ],
    });

    if let Some(description) = &job.description {
        embed["footer"] = json!({ "text": truncate_words(description, DESCRIPTION_PREVIEW_CHARS) });
    }

    json!({
        "username": BOT_USERNAME,
        "content": "**New UI/UX internship found!**",
        "embeds": [embed],
    })
}

/// Webhook body for the end-of-run reminder
pub fn summary_payload(summary: &RunSummary) -> Value {
    let posted_today = summary.stats.jobs_posted_today;
    let content = if posted_today > 0 {
        format!(
            "**Daily Internship Reminder**\n\n**{} internships posted today by companies!**\n\nRemember to check and apply to today's fresh opportunities!",
            posted_today
        )
    } else {
        "**Daily Internship Reminder**\n\nNo new internships posted by companies today, but keep applying to existing opportunities!".to_string()
    };

    let (color, posted_value) = if posted_today > 0 {
        (FRESH_SUMMARY_COLOR, format!("{} new", posted_today))
    } else {
        (QUIET_SUMMARY_COLOR, "None today".to_string())
    };

    json!({
        "username": BOT_USERNAME,
        "content": content,
        "embeds": [{
            "title": "Internship Tracker Statistics",
            "color": color,
            "fields": [
                { "name": "Total Available", "value": format!("{} internships", summary.stats.total_jobs), "inline": true },
                { "name": "Posted Today", "value": posted_value, "inline": true },
                { "name": "New This Run", "value": summary.new_jobs.to_string(), "inline": true },
            ],
            "footer": { "text": format!("Updated on {}", summary.run_date.format("%A, %B %d, %Y")) },
            "timestamp": Utc::now().to_rfc3339(),
        }],
    })
}

/// Webhook body reporting a failed run
pub fn error_payload(message: &str) -> Value {
    let detail: String = message.chars().take(ERROR_DETAIL_CHARS).collect();

    json!({
        "username": BOT_USERNAME,
        "content": "**Internship run failed**",
        "embeds": [{
            "title": "Error Details",
            "description": format!("```{}```", detail),
            "color": ERROR_COLOR,
            "timestamp": Utc::now().to_rfc3339(),
        }],
    })
}
