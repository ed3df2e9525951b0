use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use teloxide::{
    prelude::*,
    types::{Message, Recipient},
    RequestError,
};
use tracing::{info, warn};

use tgm_core::{
    domain::{normalize_handle, ChatId, NewTarget, UserId},
    errors::Error,
    export::{export_file_name, history_csv},
    filter::parse_filter_args,
    formatting::{display_handle, escape_html, filter_summary, format_timestamp, target_list},
    Result,
};

use crate::router::AppState;

const NOT_REGISTERED: &str = "❌ Please run /start first to register your account.";

const COMMANDS_HTML: &str = "\
• <code>/newtarget @username group</code> - Add a new target to monitor\n\
• <code>/viewtargets</code> - View all your active targets\n\
• <code>/removetarget @username</code> - Remove a target\n\
• <code>/setfilter @username [parameters]</code> - Set filters for a target\n\
• <code>/viewfilter @username</code> - View filters for a target\n\
• <code>/clearfilter @username</code> - Clear all filters for a target\n\
• <code>/export</code> - Export all relayed messages as CSV\n\
• <code>/help</code> - Show this help message";

const SETFILTER_HELP: &str = "🔧 <b>Set Target Filters</b>\n\n\
Usage: <code>/setfilter @username keywords:word1,word2 language:en media:text,photo</code>\n\n\
<b>Parameters:</b>\n\
• <code>keywords:</code> - Comma-separated keywords to match\n\
• <code>language:</code> - Language code (en, fa, ar, fr, de, es, it, ru, zh, ja, ko)\n\
• <code>media:</code> - Media types (text, photo, video, audio, image, document, media)\n\n\
<b>Examples:</b>\n\
• <code>/setfilter @johndoe keywords:bitcoin,crypto language:en</code>\n\
• <code>/setfilter @alice media:photo,video</code>";

/// A group as named by the watcher in `/newtarget`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupRef {
    Id(i64),
    Username(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: ChatId,
    pub title: String,
}

/// Resolves a group reference to a chat the bot can read.
#[async_trait]
pub trait GroupLookup: Send + Sync {
    /// `Ok(None)` when the chat does not exist, is not a group, or the bot
    /// cannot see it.
    async fn lookup_group(&self, group: &GroupRef) -> Result<Option<GroupInfo>>;
}

#[async_trait]
impl GroupLookup for Bot {
    async fn lookup_group(&self, group: &GroupRef) -> Result<Option<GroupInfo>> {
        let recipient = match group {
            GroupRef::Id(id) => Recipient::Id(teloxide::types::ChatId(*id)),
            GroupRef::Username(name) => Recipient::ChannelUsername(format!("@{name}")),
        };

        match self.get_chat(recipient).await {
            Ok(chat) if chat.is_group() || chat.is_supergroup() => Ok(Some(GroupInfo {
                id: ChatId(chat.id.0),
                title: chat.title().unwrap_or("Unknown").to_string(),
            })),
            Ok(_) | Err(RequestError::Api(_)) => Ok(None),
            Err(e) => Err(Error::Transport(format!("telegram error: {e}"))),
        }
    }
}

/// Who issued the command and where to answer.
#[derive(Clone, Debug)]
pub struct CommandContext {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub first_name: String,
}

pub async fn handle_private(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let ctx = CommandContext {
        user_id: UserId(user.id.0 as i64),
        chat_id: ChatId(msg.chat.id.0),
        first_name: user.first_name.clone(),
    };

    if !state.cfg.is_allowed(ctx.user_id.0) {
        reply(&state, &ctx, "Unauthorized. Contact the bot owner for access.").await;
        return Ok(());
    }

    if !text.starts_with('/') {
        reply(&state, &ctx, "Send /help for the list of commands.").await;
        return Ok(());
    }

    handle_command(&state, &bot, &ctx, text).await;
    Ok(())
}

/// Run one command; any fault becomes a declined-action reply.
pub async fn handle_command(
    state: &AppState,
    groups: &dyn GroupLookup,
    ctx: &CommandContext,
    text: &str,
) {
    let (cmd, arg) = parse_command(text);
    if let Err(e) = run_command(state, groups, ctx, &cmd, &arg).await {
        warn!(
            watcher_id = %ctx.user_id,
            command = %cmd,
            error = %e,
            "command failed"
        );
        reply(
            state,
            ctx,
            "❌ An error occurred while processing your request.",
        )
        .await;
    }
}

async fn run_command(
    state: &AppState,
    groups: &dyn GroupLookup,
    ctx: &CommandContext,
    cmd: &str,
    arg: &str,
) -> Result<()> {
    if !matches!(cmd, "start" | "help")
        && state.registry.get_watcher(ctx.user_id).await?.is_none()
    {
        return send(state, ctx, NOT_REGISTERED).await;
    }

    match cmd {
        "start" => {
            state
                .registry
                .ensure_watcher(ctx.user_id, &ctx.first_name)
                .await?;
            info!(watcher_id = %ctx.user_id, "watcher registered");

            let body = format!(
                "🚀 <b>Welcome to the group monitor!</b>\n\n\
Hello {}! Your account has been registered.\n\n\
<b>Available Commands:</b>\n{COMMANDS_HTML}\n\n\
<b>Example:</b>\n\
<code>/newtarget @johndoe https://t.me/cryptochat</code>\n\
<code>/setfilter @johndoe keywords:bitcoin,crypto language:en</code>\n\n\
Happy monitoring! 🎯",
                escape_html(&ctx.first_name)
            );
            send(state, ctx, &body).await
        }

        "help" => {
            let body = format!(
                "🚀 <b>Command Reference</b>\n\n{COMMANDS_HTML}\n\n\
The group may be a numeric chat id, an <code>@username</code> or a \
<code>t.me/username</code> link. The bot must be a member of the group.\n\n\
<b>Filter Examples:</b>\n\
• <code>/setfilter @johndoe keywords:bitcoin,crypto language:en</code>\n\
• <code>/setfilter @alice media:photo,video</code>\n\
• <code>/setfilter @bob keywords:important language:fa media:text</code>"
            );
            send(state, ctx, &body).await
        }

        "newtarget" => new_target(state, groups, ctx, arg).await,

        "viewtargets" => {
            let targets = state.registry.list_watcher_targets(ctx.user_id).await?;
            if targets.is_empty() {
                return send(
                    state,
                    ctx,
                    "📭 You have no active targets. Use <code>/newtarget @username group</code> to add one.",
                )
                .await;
            }
            let limit = state.cfg.telegram_safe_limit.max(200);
            for chunk in split_on_lines(&target_list(&targets), limit) {
                send(state, ctx, &chunk).await?;
            }
            Ok(())
        }

        "removetarget" => {
            let Some(handle) = first_handle(arg) else {
                return send(
                    state,
                    ctx,
                    "❌ Usage: <code>/removetarget @username</code>",
                )
                .await;
            };
            if state.registry.deactivate_target(ctx.user_id, &handle).await? {
                info!(watcher_id = %ctx.user_id, handle = %handle, "target removed");
                send(
                    state,
                    ctx,
                    &format!(
                        "✅ Target @{} has been removed from monitoring.",
                        escape_html(&handle)
                    ),
                )
                .await
            } else {
                send(state, ctx, &not_found(&handle)).await
            }
        }

        "setfilter" => set_filter(state, ctx, arg).await,

        "viewfilter" => {
            let Some(handle) = first_handle(arg) else {
                return send(state, ctx, "❌ Usage: <code>/viewfilter @username</code>").await;
            };
            match state.registry.find_target(ctx.user_id, &handle).await? {
                Some(target) => {
                    let body = format!(
                        "🔧 <b>Current Filters for @{}:</b>\n\n{}",
                        escape_html(&handle),
                        filter_summary(&target.filter)
                    );
                    send(state, ctx, &body).await
                }
                None => send(state, ctx, &not_found(&handle)).await,
            }
        }

        "clearfilter" => {
            let Some(handle) = first_handle(arg) else {
                return send(state, ctx, "❌ Usage: <code>/clearfilter @username</code>").await;
            };
            if state.registry.clear_filter(ctx.user_id, &handle).await? {
                send(
                    state,
                    ctx,
                    &format!(
                        "✅ All filters have been cleared for @{}.",
                        escape_html(&handle)
                    ),
                )
                .await
            } else {
                send(state, ctx, &not_found(&handle)).await
            }
        }

        "export" => {
            let history = state.registry.watcher_history(ctx.user_id).await?;
            if history.is_empty() {
                return send(state, ctx, "📭 No relayed messages found for export.").await;
            }
            let now = Utc::now();
            let caption = format!(
                "📊 <b>Export Complete!</b>\n\n<b>Total Messages:</b> {}\n<b>Export Date:</b> {}",
                history.len(),
                format_timestamp(&now)
            );
            state
                .messenger
                .send_document(
                    ctx.chat_id,
                    &export_file_name(&now),
                    history_csv(&history).into_bytes(),
                    &caption,
                )
                .await?;
            Ok(())
        }

        _ => send(state, ctx, "❓ Unknown command. Send /help for the list.").await,
    }
}

async fn new_target(
    state: &AppState,
    groups: &dyn GroupLookup,
    ctx: &CommandContext,
    arg: &str,
) -> Result<()> {
    let mut parts = arg.split_whitespace();
    let (Some(raw_handle), Some(raw_group)) = (parts.next(), parts.next()) else {
        return send(
            state,
            ctx,
            "❌ Usage: <code>/newtarget @username group</code>\n\
Example: <code>/newtarget @johndoe https://t.me/cryptochat</code>",
        )
        .await;
    };

    let handle = normalize_handle(raw_handle);
    let account = match handle.parse::<i64>() {
        Ok(id) if id > 0 => Some(UserId(id)),
        _ => state.registry.resolve_handle(&handle).await?,
    };
    let Some(account) = account else {
        return send(
            state,
            ctx,
            &format!(
                "❌ Could not find user @{}. They must have posted in a group the bot is in \
(or pass their numeric id).",
                escape_html(&handle)
            ),
        )
        .await;
    };

    let group = match parse_group_ref(raw_group) {
        Some(g) => groups.lookup_group(&g).await?,
        None => None,
    };
    let Some(group) = group else {
        return send(
            state,
            ctx,
            "❌ Could not access the group. Make sure the bot is a member and the link is correct.",
        )
        .await;
    };

    let target = state
        .registry
        .upsert_target(NewTarget {
            watcher_id: ctx.user_id,
            account_id: account,
            account_handle: handle,
            group_id: group.id,
            group_name: group.title,
        })
        .await?;
    info!(
        watcher_id = %ctx.user_id,
        target_id = %target.id,
        account_id = %target.account_id,
        group_id = %target.group_id,
        "target registered"
    );

    let shown = display_handle(&target.account_handle);
    let handle = escape_html(&target.account_handle);
    let body = format!(
        "✅ <b>Target Added Successfully!</b>\n\n\
<b>Target:</b> {shown}\n\
<b>Group:</b> {}\n\
<b>Group ID:</b> {}\n\n\
I will now monitor messages from {shown} in this group and forward them to you.\n\n\
Use <code>/setfilter @{handle}</code> to set specific filters for this target.",
        escape_html(&target.group_name),
        target.group_id,
    );
    send(state, ctx, &body).await
}

async fn set_filter(state: &AppState, ctx: &CommandContext, arg: &str) -> Result<()> {
    if arg.is_empty() {
        return send(state, ctx, SETFILTER_HELP).await;
    }

    let mut parts = arg.splitn(2, char::is_whitespace);
    let handle = normalize_handle(parts.next().unwrap_or(""));
    let params = parts.next().unwrap_or("").trim();
    if handle.is_empty() || params.is_empty() {
        return send(
            state,
            ctx,
            "❌ Usage: <code>/setfilter @username [filter_parameters]</code>",
        )
        .await;
    }

    if state
        .registry
        .find_target(ctx.user_id, &handle)
        .await?
        .is_none()
    {
        return send(state, ctx, &not_found(&handle)).await;
    }

    let input = parse_filter_args(params);
    if input.is_empty() {
        return send(state, ctx, SETFILTER_HELP).await;
    }
    let errors = input.validate();
    if !errors.is_empty() {
        let body = format!(
            "❌ <b>Filter Validation Errors:</b>\n{}",
            escape_html(&errors.join("\n"))
        );
        return send(state, ctx, &body).await;
    }

    let rule = input.to_rule();
    match state.registry.set_filter(ctx.user_id, &handle, &rule).await? {
        Some(target) => {
            info!(watcher_id = %ctx.user_id, target_id = %target.id, "filters updated");
            let body = format!(
                "✅ <b>Filters Updated for @{}!</b>\n\n{}",
                escape_html(&handle),
                filter_summary(&target.filter)
            );
            send(state, ctx, &body).await
        }
        None => {
            send(
                state,
                ctx,
                &format!("❌ Failed to set filter for @{}.", escape_html(&handle)),
            )
            .await
        }
    }
}

fn not_found(handle: &str) -> String {
    format!(
        "❌ Target @{} not found in your active targets.",
        escape_html(handle)
    )
}

async fn send(state: &AppState, ctx: &CommandContext, html: &str) -> Result<()> {
    state.messenger.send_html(ctx.chat_id, html).await?;
    Ok(())
}

async fn reply(state: &AppState, ctx: &CommandContext, html: &str) {
    if let Err(e) = send(state, ctx, html).await {
        warn!(chat_id = %ctx.chat_id, error = %e, "reply failed");
    }
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn first_handle(arg: &str) -> Option<String> {
    let handle = normalize_handle(arg.split_whitespace().next()?);
    (!handle.is_empty()).then_some(handle)
}

/// Numeric chat id, `@username`, or a `t.me/username` link. Invite links
/// (`t.me/+...`, `joinchat/...`) cannot be resolved by a bot.
pub fn parse_group_ref(raw: &str) -> Option<GroupRef> {
    let s = raw.trim();
    if let Ok(id) = s.parse::<i64>() {
        // Bare supergroup ids are given without the -100 prefix.
        return Some(GroupRef::Id(if id > 0 {
            -1_000_000_000_000 - id
        } else {
            id
        }));
    }

    let s = s
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    let s = s
        .strip_prefix("t.me/")
        .or_else(|| s.strip_prefix("telegram.me/"))
        .unwrap_or(s);
    let name = s.trim_start_matches('@').trim_end_matches('/');

    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| GroupRef::Username(name.to_string()))
}

/// Split HTML on line boundaries so each chunk stays under `limit` bytes.
/// Lines are assumed to carry balanced tags; a single oversized line is sent
/// on its own.
fn split_on_lines(html: &str, limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut chunk = String::new();
    for line in html.lines() {
        if !chunk.is_empty() && chunk.len() + line.len() + 1 > limit {
            out.push(std::mem::take(&mut chunk));
        }
        if !chunk.is_empty() {
            chunk.push('\n');
        }
        chunk.push_str(line);
    }
    if !chunk.is_empty() {
        out.push(chunk);
    }
    out
}
