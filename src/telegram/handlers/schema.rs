//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{inbound_from, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Commands are matched first; any other private text goes to the
/// conversation. Teloxide's dispatcher handles updates of one chat in order,
/// which the conversation relies on.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(message_handler(deps))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .branch(dptree::entry().filter_command::<Command>().endpoint(
            move |msg: Message, cmd: Command| {
                let deps = deps.clone();
                async move {
                    log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);
                    let Some(inbound) = inbound_from(&msg) else {
                        return Ok(());
                    };

                    match cmd {
                        Command::Start => deps.flow.on_start(&inbound).await,
                        Command::Cancel => deps.flow.on_cancel(&inbound).await,
                        Command::Setlink(link) => deps.flow.on_set_link(&inbound, &link).await,
                        Command::Getlink => deps.flow.on_get_link(&inbound).await,
                    }
                    Ok(())
                }
            },
        ))
}

/// Plain text in private chats. Unknown commands are dropped.
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| {
            msg.chat.is_private() && msg.text().map(|text| !text.starts_with('/')).unwrap_or(false)
        })
        .endpoint(move |msg: Message| {
            let deps = deps.clone();
            async move {
                if let Some(inbound) = inbound_from(&msg) {
                    deps.flow.on_text(&inbound).await;
                }
                Ok(())
            }
        })
}
