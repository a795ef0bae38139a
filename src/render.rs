//! Plain-text rendering of widgets and messages

use url::Url;
use vox_intent_types::{IntentKind, InterpretPolicy};

use crate::conversation::{Message, MessageKind};
use crate::widget::{Phase, WidgetSnapshot, WidgetView};

const LINK_EDGE_CHARS: usize = 10;
const PROGRESS_WIDTH: usize = 20;

pub fn heading(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::Bridge => "Bridging Assets",
        IntentKind::Transfer => "Transferring Funds",
        IntentKind::Swap => "Swapping Tokens",
        IntentKind::Balance => "Balance Check",
    }
}

pub fn status_label(policy: InterpretPolicy, phase: Phase) -> &'static str {
    match (policy, phase) {
        (_, Phase::Pending) => "Pending",
        (InterpretPolicy::Balance, Phase::Processing) => "Fetching",
        (InterpretPolicy::Balance, Phase::Success) => "Updated",
        (InterpretPolicy::Transaction, Phase::Processing) => "Processing",
        (InterpretPolicy::Transaction, Phase::Success) => "Complete",
        (_, Phase::Fail) => "Failed",
    }
}

/// Last path segment of a transaction link, cut to `first10...last10`
pub fn shorten_transaction_link(link: &str) -> String {
    let segment = Url::parse(link)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            link.trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(link)
                .to_string()
        });

    let chars: Vec<char> = segment.chars().collect();
    if chars.len() <= LINK_EDGE_CHARS * 2 {
        return segment;
    }
    let head: String = chars[..LINK_EDGE_CHARS].iter().collect();
    let tail: String = chars[chars.len() - LINK_EDGE_CHARS..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn progress_bar(progress: u8) -> String {
    let filled = PROGRESS_WIDTH * usize::from(progress.min(100)) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        " ".repeat(PROGRESS_WIDTH - filled),
        progress.min(100)
    )
}

/// Multi-line card for one widget
pub fn render_widget(snapshot: &WidgetSnapshot, network_label: &str) -> String {
    let intent = match &snapshot.view {
        WidgetView::Intent(intent) => intent,
        WidgetView::Fallback {
            pretty_json,
            reason,
        } => {
            let mut out = format!("Unrecognized intent ({})\n", reason);
            for line in pretty_json.lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
            return out;
        }
    };

    let kind = intent.kind();
    let subtitle = match kind {
        IntentKind::Balance => format!("Checking balances on {}", network_label),
        _ => intent.summary(),
    };

    let mut lines = vec![
        format!(
            "{} - {}",
            heading(kind),
            status_label(kind.policy(), snapshot.phase)
        ),
        format!("  {}", subtitle),
        format!("  {}", progress_bar(snapshot.progress)),
    ];

    match kind.policy() {
        InterpretPolicy::Balance => {
            if snapshot.phase == Phase::Success {
                let balances = snapshot.balances();
                if balances.is_empty() {
                    lines.push("  No balances reported".to_string());
                }
                for (token, amount) in balances {
                    lines.push(format!("  {:<8} {}", token, amount));
                }
            }
        }
        InterpretPolicy::Transaction => {
            if let Some(url) = snapshot.transaction_url() {
                lines.push(format!(
                    "  Transaction: {} ({})",
                    shorten_transaction_link(url),
                    url
                ));
            }
        }
    }

    if let Some(failure) = &snapshot.failure {
        lines.push(format!("  Error: {}", failure));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// One transcript line. Intent messages show only a marker; their widget
/// is rendered separately.
pub fn render_message(message: &Message) -> String {
    match message.kind {
        MessageKind::User => format!("you> {}", message.content),
        MessageKind::Assistant => format!("assistant> {}", message.content),
        MessageKind::Status => format!("-- {} --", message.content),
        MessageKind::Intent => "assistant> [intent]".to_string(),
    }
}
