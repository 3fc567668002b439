use std::time::Duration;

use cn_core::{CycleReport, DatabaseStats, StoredArticle, DATETIME_FORMAT};

pub fn format_stats(stats: &DatabaseStats) -> String {
    let mut out = String::from("\n📊 Database Statistics:\n");
    out.push_str(&format!("Total articles: {}\n", stats.total_articles));
    out.push_str(&format!("Articles fetched today: {}\n", stats.articles_today));
    out.push_str("\nArticles by source:\n");
    for (source, count) in &stats.articles_by_source {
        out.push_str(&format!("  {}: {}\n", source, count));
    }
    out
}

pub fn format_report(report: &CycleReport) -> String {
    format!(
        "{} sources, {} candidates, {} stored, {} skipped, {} analysis failures, {} store failures",
        report.sources,
        report.fetched,
        report.stored,
        report.skipped,
        report.failed_analyses,
        report.failed_stores
    )
}

pub fn format_articles(articles: &[StoredArticle]) -> String {
    if articles.is_empty() {
        return "No articles stored yet.\n".to_string();
    }

    let mut out = String::new();
    for article in articles {
        let published = article
            .published_at
            .map(|d| d.format(DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| "unknown".to_string());
        out.push_str(&format!("📰 {} [{}] {}\n", article.title, article.source, published));
        if !article.sentiment.is_empty() {
            out.push_str(&format!("   Sentiment: {}\n", article.sentiment));
        }
        if !article.summary.is_empty() {
            out.push_str(&format!("   {}\n", article.summary));
        }
        out.push_str(&format!("   {}\n", article.url));
    }
    out
}

/// Compact form such as `4h`, `1h30m` or `45s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 || out.is_empty() {
        out.push_str(&format!("{}s", seconds));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_stats() {
        let stats = DatabaseStats {
            total_articles: 5,
            articles_today: 2,
            articles_by_source: BTreeMap::from([("decrypt".to_string(), 3), ("theblock".to_string(), 2)]),
        };
        assert_eq!(
            format_stats(&stats),
            "\n📊 Database Statistics:\nTotal articles: 5\nArticles fetched today: 2\n\
             \nArticles by source:\n  decrypt: 3\n  theblock: 2\n"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(4 * 3600)), "4h");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn test_format_empty_articles() {
        assert_eq!(format_articles(&[]), "No articles stored yet.\n");
    }
}
