//! Prompt assembly from a learner context.
//!
//! Message order: one system message, then the session history (oldest
//! first), then the new user message. Assembly is deterministic.

use daycoach_core::context::{AssistantContext, RequestType};
use daycoach_core::learning::COURSE_DAYS;
use daycoach_core::locale::Locale;
use daycoach_core::message::{Message, Role};
use daycoach_core::tier::Tier;
use std::fmt::Write;

/// Upper bound on theory text quoted into the system prompt, in characters.
pub const THEORY_EXCERPT_CHARS: usize = 1500;

pub fn system_prompt(ctx: &AssistantContext, request_type: RequestType, locale: Locale) -> String {
    let mut prompt = String::with_capacity(2048);

    let _ = writeln!(
        prompt,
        "You are DayCoach, a patient programming tutor in a {COURSE_DAYS}-day {} course.",
        ctx.language_id
    );
    let _ = writeln!(
        prompt,
        "The learner is on day {} of {COURSE_DAYS}. Stay within what the course has covered up to this day.",
        ctx.current_day
    );
    let _ = writeln!(prompt, "{}", reply_language(locale));

    prompt.push_str("\n## Today's theory\n");
    prompt.push_str(&excerpt(&ctx.day_theory, THEORY_EXCERPT_CHARS));
    prompt.push('\n');

    prompt.push_str("\n## Today's tasks\n");
    for task in &ctx.day_tasks {
        let mark = if ctx.day_state.is_task_done(&task.id) { 'x' } else { ' ' };
        let _ = write!(prompt, "- [{mark}] {}", task.title);
        if !task.description.is_empty() {
            let _ = write!(prompt, ": {}", task.description);
        }
        prompt.push('\n');
    }

    prompt.push_str("\n## Progress\n");
    let _ = writeln!(
        prompt,
        "Days completed: {}. Current streak: {} days. Tasks completed overall: {}. Tasks done today: {} of {}.",
        ctx.completed_days.len(),
        ctx.current_streak,
        ctx.total_tasks_completed,
        ctx.tasks_done_today(),
        ctx.day_tasks.len()
    );

    prompt.push_str("\n## How to answer\n");
    let _ = writeln!(prompt, "{}", depth_hint(ctx.tier));
    let _ = writeln!(prompt, "{}", request_instruction(request_type));
    prompt.push_str(
        "Put every code sample in a fenced block with a language tag. Never hand over a full task solution; guide the learner to it.\n",
    );

    prompt
}

/// The full message list for one model call.
pub fn build_messages(
    ctx: &AssistantContext,
    request_type: RequestType,
    locale: Locale,
    user_message: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(ctx.recent_messages.len() + 2);
    messages.push(Message::system(system_prompt(ctx, request_type, locale)));
    for past in &ctx.recent_messages {
        messages.push(match past.role {
            Role::User => Message::user(past.content.clone()),
            Role::Assistant => Message::assistant(past.content.clone()),
            Role::System => continue,
        });
    }
    messages.push(Message::user(user_message));
    messages
}

fn reply_language(locale: Locale) -> &'static str {
    match locale {
        Locale::Ru => "Always reply in Russian.",
        Locale::En => "Always reply in English.",
    }
}

fn depth_hint(tier: Tier) -> &'static str {
    match tier {
        Tier::Free => "Keep answers short: a few sentences and at most one small example.",
        Tier::Premium => "Give a clear explanation with one or two worked examples.",
        Tier::ProPlus => {
            "Give an in-depth explanation: cover edge cases, common mistakes, and how the idea is used in real code."
        }
    }
}

fn request_instruction(request_type: RequestType) -> &'static str {
    match request_type {
        RequestType::Chat => "Answer the learner's question conversationally.",
        RequestType::Explain => "Explain the concept step by step, starting from what the learner already knows.",
        RequestType::Hint => "Give a single hint that moves the learner forward without revealing the answer.",
        RequestType::CodeReview => {
            "Review the learner's code: point out bugs first, then style, and suggest concrete fixes."
        }
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}
