//! Chat commands (/start, /reset, /help, /stats)
//!
//! Each is accepted with or without the leading slash, case-insensitively,
//! and only when it is the whole message.

use crate::rate_limit::LimiterStatus;
use crate::stats::StatsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Reset,
    Help,
    Stats,
}

impl Command {
    pub fn parse(message: &str) -> Option<Self> {
        let lowered = message.trim().to_lowercase();
        let name = lowered.strip_prefix('/').unwrap_or(&lowered);
        match name {
            "start" => Some(Command::Start),
            "reset" => Some(Command::Reset),
            "help" => Some(Command::Help),
            "stats" => Some(Command::Stats),
            _ => None,
        }
    }
}

pub fn welcome_text(mode: &str) -> String {
    format!(
        "👋 *Welcome to Parley!*\n\n\
         Running in: {}\n\n\
         Try asking me:\n\
         • General questions\n\
         • To tell you a joke or fact\n\
         • Simple math problems\n\
         • Time and date\n\n\
         Type /help for commands!",
        mode
    )
}

pub fn help_text() -> &'static str {
    "🤖 *Available Commands:*\n\n\
     /start - Introduction\n\
     /reset - Clear chat history\n\
     /stats - View statistics\n\
     /help - This message\n\n\
     💡 *Try asking:*\n\
     • 'Tell me a joke'\n\
     • 'What time is it?'\n\
     • 'Calculate 25 * 4'\n\
     • 'Is USA in Africa?'\n\
     • 'Tell me a fact'"
}

/// `cleared` is `None` for a sender with no conversation yet
pub fn reset_text(cleared: Option<usize>) -> String {
    match cleared {
        Some(n) if n > 0 => format!(
            "✅ Cleared {} messages!\n\nFresh start! What's on your mind?",
            n
        ),
        _ => "✅ Already fresh! What can I help you with?".to_string(),
    }
}

/// One-line status of the remote backend
pub fn remote_status_text(configured: bool, status: LimiterStatus) -> String {
    if !configured {
        return "➖ Not configured".to_string();
    }
    match status {
        LimiterStatus::Active => "✅ Active".to_string(),
        LimiterStatus::CoolingDown { remaining } => {
            format!("⏸️ Cooldown ({}s)", remaining.as_secs())
        }
        LimiterStatus::Disabled { remaining } => {
            format!("🚫 Disabled ({}s)", remaining.as_secs())
        }
    }
}

pub fn stats_text(stats: &StatsSnapshot, sender_turns: usize, mode: &str, api_status: &str) -> String {
    format!(
        "📊 *Bot Statistics*\n\n\
         ⏱ Uptime: {} minutes\n\
         💬 Total Messages: {}\n\
         👥 Active Users: {}\n\
         🤖 Remote Responses: {}\n\
         🧠 Local Responses: {}\n\
         💾 Cached Responses: {}\n\
         ⏸️ Rate Limited: {}\n\
         📱 Your Messages: {}\n\
         ⚡ Mode: {}\n\
         🔌 API Status: {}",
        stats.uptime_minutes(),
        stats.total_messages,
        stats.total_users,
        stats.remote_replies,
        stats.local_replies(),
        stats.cache_hits,
        stats.rate_limited,
        sender_turns,
        mode,
        api_status
    )
}
