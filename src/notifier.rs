//! Run report formatting and delivery.

use crate::error::NotifyError;
use crate::types::{AnomalyRecord, Direction, RunStats};
use async_trait::async_trait;
use colored::*;
use std::fmt;
use std::time::Duration;

pub const NTFY_API_BASE: &str = "https://ntfy.sh";

/// Delivers the ranked alerts and run statistics once per run
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, alerts: &[AnomalyRecord], stats: &RunStats) -> Result<(), NotifyError>;
}

/// Overall market mood derived from the alert directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
    Quiet,
}

impl Sentiment {
    pub fn from_alerts(alerts: &[AnomalyRecord]) -> Self {
        if alerts.is_empty() {
            return Sentiment::Quiet;
        }

        let up = alerts.iter().filter(|a| a.direction == Direction::Up).count();
        let down = alerts.len() - up;
        match up.cmp(&down) {
            std::cmp::Ordering::Greater => Sentiment::Bullish,
            std::cmp::Ordering::Less => Sentiment::Bearish,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Bullish => "Bullish",
            Sentiment::Bearish => "Bearish",
            Sentiment::Neutral => "Neutral",
            Sentiment::Quiet => "Quiet",
        };
        f.write_str(label)
    }
}

/// Round to a whole number and group thousands with commas
pub fn format_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && rounded != "0" {
        grouped.insert(0, '-');
    }
    grouped
}

pub fn format_title(alerts: &[AnomalyRecord]) -> String {
    let sentiment = Sentiment::from_alerts(alerts);
    if alerts.is_empty() {
        format!("Volume Scan Complete | {}", sentiment)
    } else {
        format!(
            "Volume Alert: {} pairs with high volume | {}",
            alerts.len(),
            sentiment
        )
    }
}

pub fn format_message(alerts: &[AnomalyRecord], stats: &RunStats) -> String {
    let mut message = String::from("Market Analysis Report\n\n");

    message.push_str("Stats:\n");
    message.push_str(&format!("• Pairs Analyzed: {}\n", stats.pairs_analyzed));
    message.push_str(&format!(
        "• Pairs with High Volume: {}\n",
        stats.pairs_with_alert
    ));
    if stats.pairs_failed > 0 {
        message.push_str(&format!("• Pairs Skipped: {}\n", stats.pairs_failed));
    }
    message.push_str(&format!("• API Calls Made: {}\n", stats.api_calls_made));

    if let Some(pair) = &stats.highest_increase_pair {
        message.push_str("\nHighest Volume Spike:\n");
        message.push_str(&format!("• {}: {:.1}%\n", pair, stats.highest_increase_pct));
    }

    if let Some(pair) = &stats.peak_volume_pair {
        message.push_str("\nBiggest Volume:\n");
        message.push_str(&format!(
            "• {}: {}\n",
            pair,
            format_thousands(stats.peak_volume)
        ));
    }

    if !alerts.is_empty() {
        message.push_str("\nHigh Volume Pairs:\n");
        let mut sorted = alerts.to_vec();
        sorted.sort_by(|a, b| b.percentage_increase.total_cmp(&a.percentage_increase));
        for alert in &sorted {
            message.push_str(&format!(
                "• {} ({})\n  Volume: +{:.1}% | Current: {}\n",
                alert.pair,
                alert.direction,
                alert.percentage_increase,
                format_thousands(alert.current_volume)
            ));
        }
    }

    let elapsed = stats.elapsed().num_milliseconds() as f64 / 1000.0;
    message.push_str(&format!("\nExecution Time: {:.2}s", elapsed));

    message
}

/// Push notifications through an ntfy topic
pub struct NtfyReporter {
    client: reqwest::Client,
    url: String,
}

impl NtfyReporter {
    pub fn new(base_url: &str, topic: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/{}", base_url.trim_end_matches('/'), topic),
        })
    }
}

#[async_trait]
impl Reporter for NtfyReporter {
    async fn report(&self, alerts: &[AnomalyRecord], stats: &RunStats) -> Result<(), NotifyError> {
        let priority = if alerts.is_empty() { "default" } else { "high" };

        let response = self
            .client
            .post(&self.url)
            .header("Title", format_title(alerts))
            .header("Priority", priority)
            .header("Tags", "crypto,volume,analysis")
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(format_message(alerts, stats))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("📨 ntfy notification sent ({} alerts)", alerts.len());
        Ok(())
    }
}

/// Colored terminal summary, used when no push channel is configured
pub struct ConsoleReporter;

#[async_trait]
impl Reporter for ConsoleReporter {
    async fn report(&self, alerts: &[AnomalyRecord], stats: &RunStats) -> Result<(), NotifyError> {
        println!();
        println!("{}", "=".repeat(60).bright_cyan());
        println!("{}", format!("  {}", format_title(alerts)).bright_cyan().bold());
        println!("{}", "=".repeat(60).bright_cyan());
        println!("• Pairs analyzed: {}", stats.pairs_analyzed);
        println!("• Pairs with high volume: {}", stats.pairs_with_alert);
        println!("• API calls made: {}", stats.api_calls_made);
        if let Some(pair) = &stats.highest_increase_pair {
            println!(
                "• Highest volume increase: {} ({:.1}%)",
                pair.cyan(),
                stats.highest_increase_pct
            );
        }

        for alert in alerts {
            let direction = match alert.direction {
                Direction::Up => alert.direction.to_string().green(),
                Direction::Down => alert.direction.to_string().red(),
            };
            println!(
                "{} {} ({}) +{:.1}% | Current: {}",
                "•".green(),
                alert.pair.bold(),
                direction,
                alert.percentage_increase,
                format_thousands(alert.current_volume)
            );
        }
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn alert(pair: &str, increase: f64, direction: Direction) -> AnomalyRecord {
        AnomalyRecord {
            pair: pair.to_string(),
            baseline_volume: 100.0,
            current_volume: 1_234_567.4,
            percentage_increase: increase,
            direction,
            timestamp: Utc::now(),
        }
    }

    fn stats() -> RunStats {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut stats = RunStats::new(start);
        stats.pairs_analyzed = 5;
        stats.pairs_with_alert = 1;
        stats.api_calls_made = 5;
        stats.highest_increase_pct = 150.0;
        stats.highest_increase_pair = Some("BTCUSDT".to_string());
        stats.peak_volume = 1_234_567.4;
        stats.peak_volume_pair = Some("BTCUSDT".to_string());
        stats.finish(start + chrono::Duration::milliseconds(10_250));
        stats
    }

    #[test]
    fn test_sentiment() {
        assert_eq!(Sentiment::from_alerts(&[]), Sentiment::Quiet);
        assert_eq!(
            Sentiment::from_alerts(&[alert("A", 1.0, Direction::Up)]),
            Sentiment::Bullish
        );
        assert_eq!(
            Sentiment::from_alerts(&[
                alert("A", 1.0, Direction::Up),
                alert("B", 1.0, Direction::Down)
            ]),
            Sentiment::Neutral
        );
        assert_eq!(
            Sentiment::from_alerts(&[alert("B", 1.0, Direction::Down)]),
            Sentiment::Bearish
        );
    }

    #[test]
    fn test_titles() {
        assert_eq!(format_title(&[]), "Volume Scan Complete | Quiet");
        assert_eq!(
            format_title(&[alert("A", 1.0, Direction::Down)]),
            "Volume Alert: 1 pairs with high volume | Bearish"
        );
    }

    #[test]
    fn test_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1_234_567.6), "1,234,568");
        assert_eq!(format_thousands(-12_345.0), "-12,345");
    }

    #[test]
    fn test_message_body() {
        let alerts = vec![
            alert("ETHUSDT", 60.0, Direction::Down),
            alert("BTCUSDT", 150.0, Direction::Up),
        ];
        let message = format_message(&alerts, &stats());

        assert!(message.starts_with("Market Analysis Report\n\n"));
        assert!(message.contains("• Pairs Analyzed: 5\n"));
        assert!(message.contains("• BTCUSDT: 150.0%\n"));
        assert!(message.contains("• BTCUSDT: 1,234,567\n"));
        assert!(message.contains("  Volume: +150.0% | Current: 1,234,567\n"));
        assert!(message.ends_with("Execution Time: 10.25s"));

        let btc = message.find("• BTCUSDT (UP)").unwrap();
        let eth = message.find("• ETHUSDT (DOWN)").unwrap();
        assert!(btc < eth);
    }

    #[test]
    fn test_quiet_message_omits_alert_section() {
        let mut quiet = RunStats::new(Utc::now());
        quiet.finish(quiet.start_time);
        let message = format_message(&[], &quiet);
        assert!(!message.contains("High Volume Pairs"));
        assert!(!message.contains("Highest Volume Spike"));
        assert!(message.ends_with("Execution Time: 0.00s"));
    }
}
