use poise::CreateReply;
use serenity::all::CreateEmbed;

use super::*;
use crate::{Data, Error};

const CATEGORY_ORDER: [&str; 3] = ["Music", "General", "Admin"];

/// `/name <required> [optional]`
fn usage(command: &poise::Command<Data, Error>) -> String {
    let mut usage = format!("/{}", command.name);
    for parameter in &command.parameters {
        if parameter.required {
            usage.push_str(&format!(" <{}>", parameter.name));
        } else {
            usage.push_str(&format!(" [{}]", parameter.name));
        }
    }
    usage
}

/// Visible commands grouped by category, as `(category, lines)` pairs.
pub fn help_sections(commands: &[poise::Command<Data, Error>]) -> Vec<(String, Vec<String>)> {
    let mut sections: Vec<(String, Vec<String>)> = Vec::new();

    for command in commands.iter().filter(|command| !command.hide_in_help) {
        let category = command.category.as_deref().unwrap_or("Other");
        let line = format!(
            "`{}` {}",
            usage(command),
            command.description.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string();

        match sections.iter_mut().find(|(name, _)| name == category) {
            Some((_, lines)) => lines.push(line),
            None => sections.push((category.to_string(), vec![line])),
        }
    }

    sections.sort_by_key(|(name, _)| {
        CATEGORY_ORDER
            .iter()
            .position(|known| *known == name.as_str())
            .unwrap_or(CATEGORY_ORDER.len())
    });
    sections
}

/// Show the available commands
#[poise::command(slash_command, category = "General")]
pub async fn help(ctx: Context<'_>) -> CommandResult {
    let mut embed = CreateEmbed::new()
        .title("📖 Commands")
        .description("`<argument>` is required, `[argument]` is optional.")
        .color(0x00ff00);

    for (category, lines) in help_sections(&ctx.framework().options().commands) {
        embed = embed.field(category, lines.join("\n"), false);
    }

    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}
