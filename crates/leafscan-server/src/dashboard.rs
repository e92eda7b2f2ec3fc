//! HTML usage dashboard.
//!
//! A single self-refreshing page: lifetime totals on top, session cards
//! below, and a three-bar chart of how session scans were served.

use chrono::{DateTime, Utc};
use leafscan_store::UsageSnapshot;

/// Smallest bar height, percent, so empty bars stay visible.
const MIN_BAR: f64 = 5.0;

const STYLE: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
       background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
       padding: 20px; min-height: 100vh; }
.container { max-width: 1200px; margin: 0 auto; }
.header { text-align: center; color: white; margin-bottom: 30px; }
.header h1 { font-size: 2.5em; margin-bottom: 10px; }
.lifetime { background: rgba(255,255,255,0.1); border-radius: 15px; padding: 20px;
            border: 2px solid rgba(255,255,255,0.2); }
.lifetime h3 { color: white; margin-bottom: 15px; }
.lifetime-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 15px; }
.lifetime-stat { text-align: center; padding: 15px; background: rgba(255,255,255,0.1); border-radius: 10px; }
.lifetime-stat .value { font-size: 2em; font-weight: bold; color: white; }
.lifetime-stat .label { color: rgba(255,255,255,0.8); font-size: 0.85em; }
.stats-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(250px, 1fr));
              gap: 20px; margin: 30px 0; }
.stat-card { background: white; border-radius: 15px; padding: 25px; box-shadow: 0 10px 30px rgba(0,0,0,0.2); }
.stat-card .label { color: #666; font-size: 0.9em; text-transform: uppercase; letter-spacing: 1px; }
.stat-card .value { font-size: 2.5em; font-weight: bold; color: #333; }
.stat-card .subvalue { color: #999; font-size: 0.9em; }
.chart-card { background: white; border-radius: 15px; padding: 30px; }
.bar-chart { display: flex; gap: 20px; align-items: flex-end; height: 200px; padding-top: 30px; }
.bar { flex: 1; background: linear-gradient(to top, #667eea, #764ba2); border-radius: 8px 8px 0 0;
       position: relative; min-height: 20px; }
.bar-label { position: absolute; bottom: -25px; left: 0; right: 0; text-align: center; color: #666; }
.bar-value { position: absolute; top: -25px; left: 0; right: 0; text-align: center; font-weight: bold; }
.refresh { text-align: center; color: white; margin-top: 40px; opacity: 0.8; }
.purple { color: #8b5cf6; } .blue { color: #3b82f6; } .green { color: #10b981; } .red { color: #ef4444; }
"#;

/// Render the dashboard for `snapshot` as of `now`.
pub fn render(snapshot: &UsageSnapshot, now: DateTime<Utc>) -> String {
    let session = &snapshot.session;
    let lifetime = &snapshot.lifetime;

    let ai_pct = session.share_of_predictions(session.ai_takeovers);
    let ml_pct = session.share_of_predictions(session.ml_predictions);
    let chat_pct = session.share_of_predictions(session.chat_messages);
    let lifetime_ai_pct = lifetime.share_of_predictions(lifetime.ai_takeovers);

    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("<title>Plant AI Stats Dashboard</title>\n");
    html.push_str("<meta http-equiv=\"refresh\" content=\"5\">\n");
    html.push_str("<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n");
    html.push_str(
        "<div class=\"header\"><h1>Plant AI Stats Dashboard</h1>\
         <p>Real-time API Usage Monitoring</p></div>\n",
    );

    html.push_str("<div class=\"lifetime\">\n<h3>All-Time Statistics</h3>\n<div class=\"lifetime-grid\">\n");
    lifetime_stat(&mut html, &thousands(lifetime.tokens_used), "Total Tokens");
    lifetime_stat(&mut html, &thousands(lifetime.tokens_input), "Input Tokens");
    lifetime_stat(&mut html, &thousands(lifetime.tokens_output), "Output Tokens");
    lifetime_stat(&mut html, &lifetime.predictions.to_string(), "Total Scans");
    lifetime_stat(&mut html, &lifetime.chat_messages.to_string(), "Chat Messages");
    lifetime_stat(&mut html, &format!("{lifetime_ai_pct:.1}%"), "AI Usage Rate");
    html.push_str("</div>\n</div>\n");

    html.push_str("<div class=\"stats-grid\">\n");
    stat_card(&mut html, "Session Tokens", &thousands(session.tokens_used), "", "Total consumed");
    stat_card(&mut html, "Session Scans", &session.predictions.to_string(), "", "This session");
    stat_card(
        &mut html,
        "AI Takeovers",
        &session.ai_takeovers.to_string(),
        "purple",
        &format!("{ai_pct:.1}% of scans"),
    );
    stat_card(
        &mut html,
        "ML Predictions",
        &session.ml_predictions.to_string(),
        "blue",
        &format!("{ml_pct:.1}% of scans"),
    );
    stat_card(
        &mut html,
        "Chat Messages",
        &session.chat_messages.to_string(),
        "green",
        "Remote AI calls",
    );
    stat_card(&mut html, "Errors", &session.errors.to_string(), "red", "Failed requests");
    html.push_str("</div>\n");

    html.push_str("<div class=\"chart-card\">\n<h2>Current Session Distribution</h2>\n<div class=\"bar-chart\">\n");
    bar(&mut html, ai_pct, session.ai_takeovers, "AI Takeover");
    bar(&mut html, ml_pct, session.ml_predictions, "ML Model");
    bar(&mut html, chat_pct, session.chat_messages, "Chat Messages");
    html.push_str("</div>\n</div>\n");

    html.push_str(&format!(
        "<div class=\"refresh\">Auto-refreshing every 5 seconds | Uptime: {}</div>\n",
        uptime(snapshot.started_at, now)
    ));
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn lifetime_stat(html: &mut String, value: &str, label: &str) {
    html.push_str(&format!(
        "<div class=\"lifetime-stat\"><div class=\"value\">{value}</div><div class=\"label\">{label}</div></div>\n"
    ));
}

fn stat_card(html: &mut String, label: &str, value: &str, color: &str, sub: &str) {
    html.push_str(&format!(
        "<div class=\"stat-card\"><div class=\"label\">{label}</div>\
         <div class=\"value {color}\">{value}</div><div class=\"subvalue\">{sub}</div></div>\n"
    ));
}

fn bar(html: &mut String, pct: f64, count: u64, label: &str) {
    html.push_str(&format!(
        "<div class=\"bar\" style=\"height: {:.1}%\"><div class=\"bar-value\">{count}</div>\
         <div class=\"bar-label\">{label}</div></div>\n",
        bar_height(pct)
    ));
}

/// Bar height in percent: the share itself, floored at [`MIN_BAR`].
pub fn bar_height(pct: f64) -> f64 {
    pct.max(MIN_BAR)
}

/// `1234567` → `"1,234,567"`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// "N minutes" under an hour, "H.H hours" after.
pub fn uptime(started_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - started_at).num_seconds().max(0);
    if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{:.1} hours", secs as f64 / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use leafscan_store::UsageCounters;

    fn snapshot() -> UsageSnapshot {
        UsageSnapshot {
            session: UsageCounters {
                predictions: 4,
                ai_takeovers: 1,
                ml_predictions: 3,
                chat_messages: 2,
                errors: 1,
                tokens_used: 12_345,
                ..Default::default()
            },
            lifetime: UsageCounters {
                predictions: 200,
                ai_takeovers: 50,
                tokens_used: 1_234_567,
                tokens_input: 1_000_000,
                tokens_output: 234_567,
                ..Default::default()
            },
            started_at: Utc::now() - Duration::minutes(90),
        }
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1_234_567), "1,234,567");
        assert_eq!(thousands(100_000), "100,000");
    }

    #[test]
    fn uptime_formats() {
        let start = Utc::now();
        assert_eq!(uptime(start, start), "0 minutes");
        assert_eq!(uptime(start, start + Duration::seconds(59 * 60 + 59)), "59 minutes");
        assert_eq!(uptime(start, start + Duration::minutes(90)), "1.5 hours");
        assert_eq!(uptime(start, start - Duration::minutes(5)), "0 minutes");
    }

    #[test]
    fn bars_have_a_floor() {
        assert_eq!(bar_height(0.0), 5.0);
        assert_eq!(bar_height(2.5), 5.0);
        assert_eq!(bar_height(75.0), 75.0);
    }

    #[test]
    fn page_contents() {
        let snap = snapshot();
        let now = snap.started_at + Duration::minutes(90);
        let html = render(&snap, now);

        assert!(html.contains(r#"<meta http-equiv="refresh" content="5">"#));
        assert!(html.contains("1,234,567"));
        assert!(html.contains("12,345"));
        assert!(html.contains("25.0% of scans"));
        assert!(html.contains("75.0% of scans"));
        assert!(html.contains("Uptime: 1.5 hours"));
        // Lifetime AI rate: 50 / 200.
        assert!(html.contains(">25.0%<"));
        // Chat bar: 2 / 4 scans.
        assert!(html.contains("height: 50.0%"));
    }

    #[test]
    fn every_card_and_bar_is_rendered_once() {
        let html = render(&snapshot(), Utc::now());
        assert_eq!(html.matches("class=\"lifetime-stat\"").count(), 6);
        assert_eq!(html.matches("class=\"stat-card\"").count(), 6);
        assert_eq!(html.matches("class=\"bar\"").count(), 3);
        assert!(html.contains("<div class=\"value red\">1</div>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn empty_session_renders() {
        let snap = UsageSnapshot {
            session: UsageCounters::default(),
            lifetime: UsageCounters::default(),
            started_at: Utc::now(),
        };
        let html = render(&snap, snap.started_at);
        assert!(html.contains("0.0% of scans"));
        assert!(html.contains("height: 5.0%"));
        assert!(html.contains("Uptime: 0 minutes"));
    }
}
